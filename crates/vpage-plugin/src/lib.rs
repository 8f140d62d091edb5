//! Virtual page modules for vpage.
//!
//! This crate connects discovered pages to a host bundler and a module
//! pipeline:
//!
//! - [`PageSession`] holds the discovered pages and generates entry sources
//! - [`PagePlugin`] implements the bundler [`Plugin`] hooks: it registers
//!   one HTML entry per page and loads the virtual modules behind them
//! - [`render_page`] is the single render path shared by the dev server and
//!   the build
//! - [`HeadlessBridge`] owns the build-time render instance
//! - [`WorkerPipeline`] and [`WorkerFactory`] run pages through an external
//!   render worker
//! - [`MockPipeline`] and [`MockFactory`] for testing (behind `mock` feature flag)
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use vpage_plugin::{PagePlugin, PageSession, Plugin, WorkerFactory};
//!
//! let session = Arc::new(PageSession::discover(&config.pages_resolved, config.framework.clone())?);
//! let factory = Arc::new(WorkerFactory::new(command, &config.root_dir, Arc::clone(&session)));
//! let plugin = PagePlugin::new(session, factory);
//! let html = plugin.load("index.html").await?;
//! plugin.build_end().await?;
//! ```

mod bridge;
mod codegen;
mod error;
mod host;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod plugin;
mod render;
mod session;
mod worker;

pub use bridge::{BridgePhase, HeadlessBridge};
pub use codegen::{client_entry, server_entry};
pub use error::{BridgeError, PipelineError, PluginError, RenderError};
pub use host::{
    BuildEntry, ConfigPatch, HostBuildConfig, ModulePipeline, PipelineFactory, Plugin,
    ServerModule,
};
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockFactory, MockPipeline};
pub use plugin::{PagePlugin, register_entries};
pub use render::{DOCTYPE, client_script, render_page, with_doctype};
pub use session::PageSession;
pub use worker::{MODE_ENV, WorkerFactory, WorkerMode, WorkerPipeline};
