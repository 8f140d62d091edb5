//! The page plugin: build entry registration and virtual module loading.

use std::sync::Arc;

use async_trait::async_trait;
use vpage_routes::ModuleId;

use crate::bridge::HeadlessBridge;
use crate::error::PluginError;
use crate::host::{BuildEntry, ConfigPatch, HostBuildConfig, PipelineFactory, Plugin};
use crate::render::{client_script, render_page};
use crate::session::PageSession;

/// Register one `<page>.html` build entry per page, in discovery order.
///
/// # Errors
///
/// Returns [`PluginError::EntrypointConflict`] if the host already declares
/// build inputs.
pub fn register_entries(
    session: &PageSession,
    host: &HostBuildConfig,
) -> Result<ConfigPatch, PluginError> {
    if host.input.is_some() {
        return Err(PluginError::EntrypointConflict);
    }
    let entries = session
        .pages()
        .ids()
        .map(|id| BuildEntry {
            name: id.to_string(),
            target: ModuleId::html_artifact(id).to_string(),
        })
        .collect();
    Ok(ConfigPatch { entries })
}

/// Bundler plugin serving pages from a [`PageSession`].
///
/// Registers one `<page>.html` build entry per page and generates every
/// module those entries pull in. HTML artifacts and hydration chunks are
/// produced by a headless instance created on first use and closed in
/// `build_end`.
#[derive(Debug)]
pub struct PagePlugin {
    session: Arc<PageSession>,
    bridge: HeadlessBridge,
}

impl PagePlugin {
    /// Plugin name.
    pub const NAME: &'static str = "vpage:page";

    /// Create a plugin rendering artifacts with pipelines from `factory`.
    #[must_use]
    pub fn new(session: Arc<PageSession>, factory: Arc<dyn PipelineFactory>) -> Self {
        Self {
            session,
            bridge: HeadlessBridge::new(factory),
        }
    }

    /// Headless render bridge.
    #[must_use]
    pub fn bridge(&self) -> &HeadlessBridge {
        &self.bridge
    }
}

#[async_trait]
impl Plugin for PagePlugin {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn config(&self, host: &HostBuildConfig) -> Result<ConfigPatch, PluginError> {
        let patch = register_entries(&self.session, host)?;
        tracing::debug!(entries = patch.entries.len(), "Registered page entries");
        Ok(patch)
    }

    fn resolve_id(&self, source: &str) -> Option<String> {
        let id = ModuleId::classify(source)?;
        match id {
            ModuleId::Document => Some(self.session.document_path().to_string_lossy().into_owned()),
            ModuleId::PageSource(page) => self
                .session
                .pages()
                .get(&page)
                .map(|page| page.source_path.to_string_lossy().into_owned()),
            ModuleId::ClientEntry(_) | ModuleId::ServerEntry(_) | ModuleId::HtmlArtifact(_) => {
                Some(source.to_owned())
            }
        }
    }

    async fn load(&self, id: &str) -> Result<Option<String>, PluginError> {
        let Some(module) = ModuleId::classify(id) else {
            return Ok(None);
        };

        match &module {
            ModuleId::Document | ModuleId::PageSource(_) => Ok(None),
            ModuleId::ClientEntry(_) | ModuleId::ServerEntry(_) => {
                self.session.entry_source(&module)
            }
            ModuleId::HtmlArtifact(page) => {
                self.session.page(page)?;
                let pipeline = self.bridge.acquire().await?;
                let html = render_page(pipeline.as_ref(), page).await?;
                tracing::info!(page = %page, "Generated HTML entry");
                Ok(Some(html))
            }
        }
    }

    async fn render_chunk(&self, id: &str, code: &str) -> Result<Option<String>, PluginError> {
        let Some(ModuleId::ClientEntry(page)) = ModuleId::classify(id) else {
            return Ok(None);
        };
        self.session.page(&page)?;
        let pipeline = self.bridge.acquire().await?;
        let script = client_script(pipeline.as_ref(), &page, code).await?;
        tracing::info!(page = %page, "Generated hydration chunk");
        Ok(Some(script))
    }

    async fn build_end(&self) -> Result<(), PluginError> {
        self.bridge.close().await?;
        Ok(())
    }
}
