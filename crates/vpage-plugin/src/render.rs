//! Shared page render path.
//!
//! The dev middleware and HTML artifact generation both render through
//! [`render_page`] and compile hydration scripts through [`client_script`],
//! so a page behaves identically in both modes.

use vpage_routes::{ModuleId, PageId};

use crate::error::RenderError;
use crate::host::ModulePipeline;

/// Doctype prepended to every rendered page.
pub const DOCTYPE: &str = "<!DOCTYPE html>\n";

/// Prefix rendered markup with the HTML5 doctype.
#[must_use]
pub fn with_doctype(html: &str) -> String {
    let mut out = String::with_capacity(DOCTYPE.len() + html.len());
    out.push_str(DOCTYPE);
    out.push_str(html);
    out
}

/// Render a page to a complete HTML document.
///
/// Loads the page's server entry through `pipeline`, calls `render()` and
/// prefixes the result with the doctype.
///
/// # Errors
///
/// Returns [`RenderError::Load`] if the server entry cannot be loaded and
/// [`RenderError::Render`] if `render()` fails.
pub async fn render_page(pipeline: &dyn ModulePipeline, page: &PageId) -> Result<String, RenderError> {
    let module = pipeline
        .load_module(&ModuleId::server_entry(page))
        .await
        .map_err(|source| RenderError::Load {
            page: page.to_string(),
            source,
        })?;

    let html = module.render().await.map_err(|source| RenderError::Render {
        page: page.to_string(),
        source,
    })?;

    tracing::debug!(page = %page, bytes = html.len(), "Rendered page");
    Ok(with_doctype(&html))
}

/// Compile a page's generated client entry into a browser script.
///
/// # Errors
///
/// Returns [`RenderError::Client`] if the pipeline cannot compile the entry.
pub async fn client_script(
    pipeline: &dyn ModulePipeline,
    page: &PageId,
    source: &str,
) -> Result<String, RenderError> {
    let script = pipeline
        .transform_client(&ModuleId::client_entry(page), source)
        .await
        .map_err(|source| RenderError::Client {
            page: page.to_string(),
            source,
        })?;

    tracing::debug!(page = %page, bytes = script.len(), "Compiled client entry");
    Ok(script)
}
