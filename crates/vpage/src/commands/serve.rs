//! `vpage serve` command implementation.

use std::path::PathBuf;

use clap::Args;
use vpage_config::CliSettings;
use vpage_server::{ServerConfig, artifact_routes, production_router, run_server};

use super::ProjectArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the serve command.
#[derive(Args)]
pub(crate) struct ServeArgs {
    #[command(flatten)]
    project: ProjectArgs,

    /// Build output directory (overrides config).
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// Host to bind to (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to (overrides config).
    #[arg(short, long)]
    port: Option<u16>,
}

impl ServeArgs {
    /// Execute the serve command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails, the build output is missing
    /// or the server fails.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let config = self.project.load(CliSettings {
            host: self.host,
            port: self.port,
            out_dir: self.out_dir,
            ..CliSettings::default()
        })?;
        let out_dir = &config.build_resolved.out_dir;
        let assets_dir = &config.build_resolved.assets_dir;

        for entry in artifact_routes(out_dir, assets_dir)? {
            output.info(&format!("  {} -> {}", entry.route, entry.artifact));
        }
        let router = production_router(out_dir, assets_dir)?;

        output.highlight(&format!(
            "Serving {} on http://{}:{}",
            out_dir.display(),
            config.server.host,
            config.server.port
        ));

        let server = ServerConfig {
            host: config.server.host.clone(),
            port: config.server.port,
        };
        run_server(router, &server).await?;
        Ok(())
    }
}
