//! Source generation for client and server page entries.
//!
//! Generated code is plain ES module source. Import specifiers are absolute
//! file paths with `/` separators, written as JSON string literals so any
//! path character is escaped correctly.

use std::fmt::Write;
use std::path::Path;

use vpage_config::FrameworkConfig;
use vpage_routes::ModuleId;

/// Quote a string as a JavaScript string literal.
fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_owned()).to_string()
}

/// Import specifier for a file on disk.
fn import_path(path: &Path) -> String {
    js_string(&path.to_string_lossy().replace('\\', "/"))
}

/// Generate the browser entry that hydrates a page.
///
/// ```text
/// import { createElement, hydrate } from "preact/compat";
/// import Page from "/project/src/pages/index.tsx";
///
/// hydrate(createElement(Page, null), document.getElementById("app"));
/// ```
#[must_use]
pub fn client_entry(framework: &FrameworkConfig, page_path: &Path) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "import {{ createElement, hydrate }} from {};",
        js_string(&framework.module)
    );
    let _ = writeln!(out, "import Page from {};", import_path(page_path));
    out.push('\n');
    let _ = writeln!(
        out,
        "hydrate(createElement(Page, null), document.getElementById({}));",
        js_string(&framework.root_element_id)
    );
    out
}

/// Generate the server entry exporting `render()` for a page.
///
/// The page is wrapped in the document template, which receives the client
/// entry id as `entryScriptUrl`.
#[must_use]
pub fn server_entry(
    framework: &FrameworkConfig,
    document_path: &Path,
    page_path: &Path,
    client_entry: &ModuleId,
) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "import {{ createElement }} from {};",
        js_string(&framework.module)
    );
    let _ = writeln!(
        out,
        "import {{ renderToString }} from {};",
        js_string(&framework.render_module)
    );
    let _ = writeln!(out, "import Document from {};", import_path(document_path));
    let _ = writeln!(out, "import Page from {};", import_path(page_path));
    out.push('\n');
    out.push_str("export function render() {\n");
    out.push_str("  return renderToString(\n");
    out.push_str("    createElement(\n");
    out.push_str("      Document,\n");
    let _ = writeln!(
        out,
        "      {{ entryScriptUrl: {} }},",
        js_string(&client_entry.to_string())
    );
    out.push_str("      createElement(Page, null)\n");
    out.push_str("    )\n");
    out.push_str("  );\n");
    out.push_str("}\n");
    out
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use pretty_assertions::assert_eq;
    use vpage_routes::PageId;

    use super::*;

    #[test]
    fn test_client_entry() {
        let source = client_entry(
            &FrameworkConfig::default(),
            Path::new("/site/src/pages/blog/[articleId].tsx"),
        );

        assert_eq!(
            source,
            "import { createElement, hydrate } from \"preact/compat\";\n\
             import Page from \"/site/src/pages/blog/[articleId].tsx\";\n\
             \n\
             hydrate(createElement(Page, null), document.getElementById(\"app\"));\n"
        );
    }

    #[test]
    fn test_client_entry_is_deterministic() {
        let framework = FrameworkConfig::default();
        let path = PathBuf::from("/site/src/pages/index.tsx");

        assert_eq!(client_entry(&framework, &path), client_entry(&framework, &path));
    }

    #[test]
    fn test_server_entry() {
        let page = PageId::new("index").unwrap();
        let source = server_entry(
            &FrameworkConfig::default(),
            Path::new("/site/src/pages/_document.tsx"),
            Path::new("/site/src/pages/index.tsx"),
            &ModuleId::client_entry(&page),
        );

        assert_eq!(
            source,
            r#"import { createElement } from "preact/compat";
import { renderToString } from "preact-render-to-string";
import Document from "/site/src/pages/_document.tsx";
import Page from "/site/src/pages/index.tsx";

export function render() {
  return renderToString(
    createElement(
      Document,
      { entryScriptUrl: "/virtual:page:entry-client:index" },
      createElement(Page, null)
    )
  );
}
"#
        );
    }

    #[test]
    fn test_custom_framework() {
        let framework = FrameworkConfig {
            module: "react".to_owned(),
            render_module: "react-dom/server".to_owned(),
            root_element_id: "root".to_owned(),
        };
        let source = client_entry(&framework, Path::new("/p.tsx"));

        assert!(source.contains("from \"react\";"));
        assert!(source.contains("getElementById(\"root\")"));
    }

    #[test]
    fn test_paths_are_escaped() {
        let source = client_entry(
            &FrameworkConfig::default(),
            Path::new("/site/it's \"quoted\".tsx"),
        );

        assert!(source.contains(r#"import Page from "/site/it's \"quoted\".tsx";"#));
    }
}
