//! Capabilities provided by the host bundler and its module pipeline.
//!
//! The page plugin never renders UI itself. It hands generated module source
//! to a [`ModulePipeline`], which evaluates it and returns HTML, and it plugs
//! into the host build through the [`Plugin`] hooks.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use vpage_config::{BuildConfig, BuildInput};
use vpage_routes::ModuleId;

use crate::error::{PipelineError, PluginError};

/// A module loaded by a pipeline that exports `render()`.
#[async_trait]
pub trait ServerModule: Send + Sync {
    /// Call the module's zero-argument `render()` export.
    async fn render(&self) -> Result<String, PipelineError>;
}

/// Live module pipeline able to evaluate server modules.
#[async_trait]
pub trait ModulePipeline: Send + Sync {
    /// Load a module for server-side evaluation.
    async fn load_module(&self, id: &ModuleId) -> Result<Box<dyn ServerModule>, PipelineError>;

    /// Apply the pipeline's HTML transforms to a rendered page.
    async fn transform_html(
        &self,
        url: &str,
        html: &str,
        original_url: &str,
    ) -> Result<String, PipelineError>;

    /// Compile a generated client entry into a script the browser can load.
    ///
    /// The result has the entry's imports resolved, so the page module and
    /// the framework are reachable from the returned script alone.
    async fn transform_client(&self, id: &ModuleId, source: &str) -> Result<String, PipelineError>;

    /// Release the pipeline's resources.
    async fn close(&self) -> Result<(), PipelineError>;
}

/// Creates headless pipelines used only for rendering during a build.
#[async_trait]
pub trait PipelineFactory: Send + Sync {
    /// Create a fresh pipeline instance.
    async fn create(&self) -> Result<Arc<dyn ModulePipeline>, PipelineError>;
}

/// Build options the host passes to [`Plugin::config`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostBuildConfig {
    /// Entrypoints declared explicitly by the user.
    pub input: Option<BuildInput>,
}

impl From<&BuildConfig> for HostBuildConfig {
    fn from(build: &BuildConfig) -> Self {
        Self {
            input: build.input.clone(),
        }
    }
}

/// One build entrypoint registered by the plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildEntry {
    /// Entry name, equal to the page identifier.
    pub name: String,
    /// Module id the host resolves and loads (`<page>.html`).
    pub target: String,
}

/// Build options contributed by [`Plugin::config`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConfigPatch {
    /// Entrypoints in discovery order.
    pub entries: Vec<BuildEntry>,
}

impl ConfigPatch {
    /// Entries as a `name -> target` map, the shape bundlers accept as input.
    #[must_use]
    pub fn input(&self) -> BTreeMap<&str, &str> {
        self.entries
            .iter()
            .map(|entry| (entry.name.as_str(), entry.target.as_str()))
            .collect()
    }
}

/// Bundler plugin hooks.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Plugin name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Contribute build options.
    fn config(&self, host: &HostBuildConfig) -> Result<ConfigPatch, PluginError>;

    /// Claim a module id. `None` leaves resolution to the host.
    fn resolve_id(&self, source: &str) -> Option<String>;

    /// Produce the source of a claimed module. `None` leaves loading to the host.
    async fn load(&self, id: &str) -> Result<Option<String>, PluginError>;

    /// Turn a loaded script module into the chunk written to the build
    /// output. `None` emits `code` unchanged.
    async fn render_chunk(&self, id: &str, code: &str) -> Result<Option<String>, PluginError>;

    /// Called once when the build finishes, successfully or not.
    async fn build_end(&self) -> Result<(), PluginError>;
}
