//! `vpage dev` command implementation.

use std::sync::Arc;

use clap::Args;
use vpage_config::CliSettings;
use vpage_plugin::{ModulePipeline, PageSession, WorkerMode, WorkerPipeline};
use vpage_server::{DevConfig, ServerConfig, dev_router, run_server};

use super::ProjectArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the dev command.
#[derive(Args)]
pub(crate) struct DevArgs {
    #[command(flatten)]
    project: ProjectArgs,

    /// Host to bind to (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to (overrides config).
    #[arg(short, long)]
    port: Option<u16>,

    /// Render worker command (overrides config).
    #[arg(long, env = "VPAGE_RENDER_COMMAND")]
    render_command: Option<String>,
}

impl DevArgs {
    /// Execute the dev command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails, the worker cannot be started
    /// or the server fails.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let config = self.project.load(CliSettings {
            host: self.host,
            port: self.port,
            render_command: self.render_command,
            ..CliSettings::default()
        })?;
        let command = config.require_render_command()?;

        let session = Arc::new(PageSession::discover(
            &config.pages_resolved,
            config.framework.clone(),
        )?);
        if session.pages().is_empty() {
            output.warning(&format!(
                "No pages found in {}",
                config.pages_resolved.dir.display()
            ));
        }

        let pipeline = Arc::new(WorkerPipeline::spawn(
            command,
            &config.root_dir,
            WorkerMode::Dev,
            Arc::clone(&session),
        )?);

        output.info(&format!(
            "Pages directory: {}",
            config.pages_resolved.dir.display()
        ));
        output.info(&format!("Pages: {}", session.pages().len()));
        output.highlight(&format!(
            "Dev server on http://{}:{}",
            config.server.host, config.server.port
        ));

        let router = dev_router(DevConfig {
            session,
            pipeline: Arc::clone(&pipeline) as Arc<dyn ModulePipeline>,
            public_dir: config.dev_resolved.public_dir.clone(),
        });
        let server = ServerConfig {
            host: config.server.host.clone(),
            port: config.server.port,
        };

        let served = run_server(router, &server).await;
        let closed = pipeline.close().await;
        served?;
        closed?;
        Ok(())
    }
}
