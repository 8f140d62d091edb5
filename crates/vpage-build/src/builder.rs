//! Static site builder for vpage.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use futures::future::join_all;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use regex::Regex;
use vpage_plugin::{BuildEntry, HostBuildConfig, Plugin, PluginError};

/// Module script tags in a rendered document.
static MODULE_SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<script\b[^>]*\btype="module"[^>]*\bsrc="([^"]+)"|<script\b[^>]*\bsrc="([^"]+)"[^>]*\btype="module""#)
        .unwrap()
});

/// Characters escaped in emitted script URLs.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b']')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Subdirectory of the assets directory receiving hydration chunks.
const CHUNK_DIR: &str = "pages";

/// Configuration for static site building.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Directory receiving `<page>.html` artifacts.
    pub out_dir: PathBuf,
    /// Assets directory under `out_dir`, served at `/<assets_dir>`.
    pub assets_dir: String,
    /// Build options as the host bundler would pass them to plugins.
    pub host: HostBuildConfig,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("build"),
            assets_dir: "assets".to_owned(),
            host: HostBuildConfig::default(),
        }
    }
}

/// Error returned by the static site builder.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// Writing an artifact failed.
    #[error("failed to write {}: {source}", path.display())]
    Io {
        /// Artifact path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Plugin configuration or teardown failed.
    #[error(transparent)]
    Plugin(#[from] PluginError),
    /// Generating one entry failed.
    #[error("failed to build entry {name}: {source}")]
    Entry {
        /// Entry name.
        name: String,
        /// Plugin failure.
        #[source]
        source: PluginError,
    },
    /// No plugin claimed an entry.
    #[error("entry {0} was not resolved or loaded by any plugin")]
    Unhandled(String),
}

/// Result of a successful build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Written HTML artifacts, in entry order.
    pub artifacts: Vec<PathBuf>,
    /// Written script chunks, in entry order.
    pub chunks: Vec<PathBuf>,
}

/// One generated entry before anything is written.
struct GeneratedEntry<'a> {
    entry: &'a BuildEntry,
    html: String,
    /// `(path relative to out_dir, code)` per emitted chunk.
    chunks: Vec<(String, String)>,
}

/// Builds one static HTML file per page through the page plugin.
///
/// Drives the plugin the way a bundler drives HTML inputs: `config` first,
/// then `resolve_id` and `load` for every registered entry concurrently,
/// then `build_end`. Module scripts referenced by a document are loaded
/// through the plugin, passed to `render_chunk` and emitted under
/// `<assets_dir>/pages/`, with the document's `src` rewritten to match.
pub struct StaticSiteBuilder {
    plugin: Arc<dyn Plugin>,
    config: BuildConfig,
}

impl StaticSiteBuilder {
    /// Create a new builder.
    #[must_use]
    pub fn new(plugin: Arc<dyn Plugin>, config: BuildConfig) -> Self {
        Self { plugin, config }
    }

    /// Generate and write every page.
    ///
    /// A configuration error aborts before anything is generated. Otherwise
    /// `build_end` always runs. If any entry fails, nothing is written and
    /// the first failure in entry order is returned.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError`] if configuration, generation, teardown or
    /// writing fails.
    pub async fn build(&self) -> Result<BuildReport, BuildError> {
        let patch = self.plugin.config(&self.config.host)?;
        tracing::info!(
            plugin = self.plugin.name(),
            entries = patch.entries.len(),
            "Building pages"
        );

        let results = join_all(patch.entries.iter().map(|entry| self.generate(entry))).await;
        let end = self.plugin.build_end().await;

        let mut pages = Vec::with_capacity(results.len());
        for result in results {
            pages.push(result?);
        }
        end?;

        let mut report = BuildReport::default();
        for page in pages {
            let path = self.config.out_dir.join(&page.entry.target);
            write_artifact(&path, &page.html)?;
            tracing::debug!(entry = %page.entry.name, path = %path.display(), "Wrote page");
            report.artifacts.push(path);

            for (file, code) in page.chunks {
                let path = self.config.out_dir.join(&file);
                write_artifact(&path, &code)?;
                tracing::debug!(entry = %page.entry.name, path = %path.display(), "Wrote chunk");
                report.chunks.push(path);
            }
        }

        tracing::info!(
            out_dir = %self.config.out_dir.display(),
            pages = report.artifacts.len(),
            chunks = report.chunks.len(),
            "Build complete"
        );
        Ok(report)
    }

    async fn generate<'a>(&self, entry: &'a BuildEntry) -> Result<GeneratedEntry<'a>, BuildError> {
        let entry_err = |source| BuildError::Entry {
            name: entry.name.clone(),
            source,
        };

        let resolved = self
            .plugin
            .resolve_id(&entry.target)
            .ok_or_else(|| BuildError::Unhandled(entry.target.clone()))?;
        let mut html = self
            .plugin
            .load(&resolved)
            .await
            .map_err(entry_err)?
            .ok_or_else(|| BuildError::Unhandled(entry.target.clone()))?;

        let mut chunks = Vec::new();
        for src in module_script_sources(&html) {
            let Some(id) = self.plugin.resolve_id(&src) else {
                continue;
            };
            let Some(code) = self.plugin.load(&id).await.map_err(entry_err)? else {
                continue;
            };
            let code = self
                .plugin
                .render_chunk(&id, &code)
                .await
                .map_err(entry_err)?
                .unwrap_or(code);

            let file = chunk_file(&self.config.assets_dir, &entry.name, chunks.len());
            html = html.replace(
                &format!("src=\"{src}\""),
                &format!("src=\"{}\"", chunk_url(&file)),
            );
            chunks.push((file, code));
        }

        Ok(GeneratedEntry {
            entry,
            html,
            chunks,
        })
    }
}

/// Distinct `src` values of module scripts, in document order.
fn module_script_sources(html: &str) -> Vec<String> {
    let mut sources: Vec<String> = Vec::new();
    for caps in MODULE_SCRIPT_RE.captures_iter(html) {
        if let Some(src) = caps.get(1).or_else(|| caps.get(2))
            && !sources.iter().any(|seen| seen == src.as_str())
        {
            sources.push(src.as_str().to_owned());
        }
    }
    sources
}

/// Chunk path relative to the output directory, `/`-separated.
fn chunk_file(assets_dir: &str, entry: &str, index: usize) -> String {
    if index == 0 {
        format!("{assets_dir}/{CHUNK_DIR}/{entry}.js")
    } else {
        format!("{assets_dir}/{CHUNK_DIR}/{entry}-{index}.js")
    }
}

/// Absolute URL of a chunk file.
fn chunk_url(file: &str) -> String {
    let segments: Vec<String> = file
        .split('/')
        .map(|segment| utf8_percent_encode(segment, PATH_SEGMENT).to_string())
        .collect();
    format!("/{}", segments.join("/"))
}

fn write_artifact(path: &Path, contents: &str) -> Result<(), BuildError> {
    let io_err = |source| BuildError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    fs::write(path, contents).map_err(io_err)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use pretty_assertions::assert_eq;
    use vpage_config::{BuildInput, FrameworkConfig};
    use vpage_plugin::{MockFactory, PagePlugin, PageSession, PipelineFactory};
    use vpage_routes::{Page, PageId, PageSet};

    use super::*;

    fn plugin(ids: &[&str], factory: &Arc<MockFactory>) -> Arc<dyn Plugin> {
        let dir = PathBuf::from("/site/src/pages");
        let pages = PageSet::new(ids.iter().map(|id| Page {
            id: PageId::new(*id).unwrap(),
            source_path: dir.join(format!("{id}.tsx")),
        }))
        .unwrap();
        let session = PageSession::from_pages(
            dir.clone(),
            dir.join("_document.tsx"),
            FrameworkConfig::default(),
            pages,
        )
        .unwrap();
        Arc::new(PagePlugin::new(
            Arc::new(session),
            Arc::clone(factory) as Arc<dyn PipelineFactory>,
        ))
    }

    fn config(out_dir: &Path) -> BuildConfig {
        BuildConfig {
            out_dir: out_dir.to_path_buf(),
            ..BuildConfig::default()
        }
    }

    fn file_count(dir: &Path) -> usize {
        if !dir.exists() {
            return 0;
        }
        fs::read_dir(dir)
            .unwrap()
            .map(|e| {
                let path = e.unwrap().path();
                if path.is_dir() { file_count(&path) } else { 1 }
            })
            .sum()
    }

    #[tokio::test]
    async fn test_build_writes_one_artifact_per_page() {
        let temp = tempfile::tempdir().unwrap();
        let out = temp.path().join("build");
        let factory = Arc::new(MockFactory::new().with_html("index", "<html>Home</html>"));
        let builder = StaticSiteBuilder::new(plugin(&["index", "blog/[articleId]"], &factory), config(&out));

        let report = builder.build().await.unwrap();

        assert_eq!(
            report.artifacts,
            vec![out.join("blog/[articleId].html"), out.join("index.html")]
        );
        assert_eq!(
            fs::read_to_string(out.join("index.html")).unwrap(),
            "<!DOCTYPE html>\n<html>Home</html>"
        );
        let blog = fs::read_to_string(out.join("blog/[articleId].html")).unwrap();
        assert!(blog.starts_with("<!DOCTYPE html>\n"));
        assert!(blog.contains("data-page=\"blog/[articleId]\""));
        assert!(report.chunks.is_empty());
        assert_eq!(factory.created_count(), 1);
        assert_eq!(factory.closed_count(), 1);
    }

    fn document(page: &str) -> String {
        format!(
            r#"<html><body><div id="app"></div><script type="module" src="/virtual:page:entry-client:{page}"></script><script src="/analytics.js"></script></body></html>"#
        )
    }

    #[tokio::test]
    async fn test_build_emits_hydration_chunks() {
        let temp = tempfile::tempdir().unwrap();
        let out = temp.path().join("build");
        let factory = Arc::new(
            MockFactory::new()
                .with_html("index", document("index"))
                .with_html("blog/[articleId]", document("blog/[articleId]")),
        );
        let builder = StaticSiteBuilder::new(plugin(&["index", "blog/[articleId]"], &factory), config(&out));

        let report = builder.build().await.unwrap();

        assert_eq!(
            report.chunks,
            vec![
                out.join("assets/pages/blog/[articleId].js"),
                out.join("assets/pages/index.js"),
            ]
        );
        let index = fs::read_to_string(out.join("index.html")).unwrap();
        assert!(index.contains(r#"<script type="module" src="/assets/pages/index.js"></script>"#));
        assert!(index.contains(r#"<script src="/analytics.js"></script>"#));
        assert!(!index.contains("virtual:page"));
        let blog = fs::read_to_string(out.join("blog/[articleId].html")).unwrap();
        assert!(blog.contains(r#"src="/assets/pages/blog/%5BarticleId%5D.js""#));

        let chunk = fs::read_to_string(out.join("assets/pages/index.js")).unwrap();
        assert!(chunk.starts_with("// bundled /virtual:page:entry-client:index\n"));
        assert!(chunk.contains("hydrate(createElement(Page, null)"));
        assert!(chunk.contains("/site/src/pages/index.tsx"));
        assert_eq!(factory.created_count(), 1);
        assert_eq!(factory.closed_count(), 1);
    }

    #[test]
    fn test_module_script_sources() {
        let html = r#"<script type="module" src="/a.js"></script><script src="/b.js" type="module"></script><script src="/c.js"></script><script type="module" src="/a.js"></script>"#;

        assert_eq!(module_script_sources(html), vec!["/a.js", "/b.js"]);
    }

    #[test]
    fn test_chunk_paths() {
        assert_eq!(chunk_file("assets", "blog/[id]", 0), "assets/pages/blog/[id].js");
        assert_eq!(chunk_file("static", "index", 2), "static/pages/index-2.js");
        assert_eq!(chunk_url("assets/pages/blog/[id].js"), "/assets/pages/blog/%5Bid%5D.js");
        assert_eq!(chunk_url("assets/pages/blog/:id.js"), "/assets/pages/blog/:id.js");
    }

    #[tokio::test]
    async fn test_conflict_aborts_before_any_artifact() {
        let temp = tempfile::tempdir().unwrap();
        let out = temp.path().join("build");
        let factory = Arc::new(MockFactory::new());
        let mut config = config(&out);
        config.host.input = Some(BuildInput::Many(vec!["main.html".to_owned()]));
        let builder = StaticSiteBuilder::new(plugin(&["index"], &factory), config);

        let err = builder.build().await.unwrap_err();

        assert!(matches!(err, BuildError::Plugin(PluginError::EntrypointConflict)));
        assert_eq!(file_count(&out), 0);
        assert_eq!(factory.created_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_entry_writes_nothing_and_closes_instance() {
        let temp = tempfile::tempdir().unwrap();
        let out = temp.path().join("build");
        let factory = Arc::new(MockFactory::new().with_failure("index"));
        let builder = StaticSiteBuilder::new(plugin(&["about", "index"], &factory), config(&out));

        let err = builder.build().await.unwrap_err();

        assert!(matches!(err, BuildError::Entry { ref name, .. } if name == "index"));
        assert_eq!(file_count(&out), 0);
        assert_eq!(factory.closed_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_site() {
        let temp = tempfile::tempdir().unwrap();
        let factory = Arc::new(MockFactory::new());
        let builder = StaticSiteBuilder::new(plugin(&[], &factory), config(temp.path()));

        let report = builder.build().await.unwrap();

        assert_eq!(report, BuildReport::default());
        assert_eq!(factory.created_count(), 0);
    }
}
