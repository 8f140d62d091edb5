//! HTTP servers for vpage.
//!
//! This crate provides two axum routers:
//!
//! - [`dev_router`]: renders pages on demand through a live module pipeline
//!   and falls back to the public directory
//! - [`production_router`]: serves built `<page>.html` artifacts at their
//!   page routes, plus the assets directory
//!
//! # Architecture
//!
//! ```text
//! dev:   Browser ──► render middleware ──match──► PageSession ──► ModulePipeline
//!                          │
//!                          └─no match──► ServeDir(public) ──► 404
//!
//! prod:  Browser ──► /blog/{articleId} ──► ServeFile(blog/[articleId].html)
//!                    /assets/*         ──► ServeDir(build/assets)
//!                    *                 ──► 404
//! ```

mod dev;
mod error;
mod middleware;
mod prod;
mod state;

pub use dev::{DevConfig, dev_router};
pub use error::ServerError;
pub use prod::{ArtifactRoute, artifact_route, artifact_routes, production_router};

use axum::Router;

/// Server bind configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 3000,
        }
    }
}

/// Serve a router until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or serving fails.
pub async fn run_server(router: Router, config: &ServerConfig) -> Result<(), ServerError> {
    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    let addr = listener.local_addr()?;
    tracing::info!(address = %addr, "Starting server");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Wait for shutdown signal (Ctrl-C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, stopping server...");
}
