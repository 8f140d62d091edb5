//! Error types for the page plugin.

use std::io;

use vpage_routes::{DiscoveryError, RouteError};

/// Error reported by a module pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Render worker process could not be started.
    #[error("failed to start render worker `{command}`: {source}")]
    Spawn {
        /// Shell command that failed.
        command: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Reading from or writing to the worker failed.
    #[error("render worker I/O error: {0}")]
    Io(#[from] io::Error),
    /// Worker sent something that is not a valid reply.
    #[error("render worker protocol error: {0}")]
    Protocol(String),
    /// Worker reported a failure.
    #[error("render worker error: {0}")]
    Worker(String),
    /// Pipeline cannot load this module.
    #[error("module not found: {0}")]
    ModuleNotFound(String),
    /// Module source could not be synthesized.
    #[error("failed to generate module {id}: {message}")]
    Source {
        /// Module id.
        id: String,
        /// Generation failure.
        message: String,
    },
    /// Pipeline was already closed.
    #[error("pipeline is closed")]
    Closed,
}

/// Error from the headless render bridge.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Headless instance requested after the build ended.
    #[error("headless render instance requested after close")]
    Closed,
    /// Headless instance creation failed.
    #[error("failed to create headless render instance: {0}")]
    Create(#[source] PipelineError),
    /// Headless instance teardown failed.
    #[error("failed to close headless render instance: {0}")]
    Close(#[source] PipelineError),
}

/// Error from the shared render path.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Server entry could not be loaded.
    #[error("failed to load server entry for page {page}: {source}")]
    Load {
        /// Page being rendered.
        page: String,
        /// Pipeline failure.
        #[source]
        source: PipelineError,
    },
    /// `render()` failed.
    #[error("failed to render page {page}: {source}")]
    Render {
        /// Page being rendered.
        page: String,
        /// Pipeline failure.
        #[source]
        source: PipelineError,
    },
    /// Client entry could not be compiled for the browser.
    #[error("failed to compile client entry for page {page}: {source}")]
    Client {
        /// Page whose entry was compiled.
        page: String,
        /// Pipeline failure.
        #[source]
        source: PipelineError,
    },
    /// HTML transform failed.
    #[error("failed to transform HTML for {url}: {source}")]
    Transform {
        /// Request URL.
        url: String,
        /// Pipeline failure.
        #[source]
        source: PipelineError,
    },
}

/// Error from the page plugin.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    /// Host configuration already declares build inputs.
    #[error(
        "build input must not be set in the host configuration because page entries are registered by the page plugin"
    )]
    EntrypointConflict,
    /// Module refers to a page that was not discovered.
    #[error("unknown page: {0}")]
    UnknownPage(String),
    /// Page discovery failed.
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    /// Route pattern compilation failed.
    #[error(transparent)]
    Route(#[from] RouteError),
    /// Headless bridge failed.
    #[error(transparent)]
    Bridge(#[from] BridgeError),
    /// Rendering failed.
    #[error(transparent)]
    Render(#[from] RenderError),
}
