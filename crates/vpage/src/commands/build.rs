//! `vpage build` command implementation.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use vpage_build::{BuildConfig, StaticSiteBuilder};
use vpage_config::CliSettings;
use vpage_plugin::{HostBuildConfig, PagePlugin, PageSession, WorkerFactory};

use super::ProjectArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the build command.
#[derive(Args)]
pub(crate) struct BuildArgs {
    #[command(flatten)]
    project: ProjectArgs,

    /// Output directory (overrides config).
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// Render worker command (overrides config).
    #[arg(long, env = "VPAGE_RENDER_COMMAND")]
    render_command: Option<String>,
}

impl BuildArgs {
    /// Execute the build command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or any page fails to build.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let config = self.project.load(CliSettings {
            out_dir: self.out_dir,
            render_command: self.render_command,
            ..CliSettings::default()
        })?;
        let command = config.require_render_command()?;

        let session = Arc::new(PageSession::discover(
            &config.pages_resolved,
            config.framework.clone(),
        )?);
        let factory = Arc::new(WorkerFactory::new(
            command,
            &config.root_dir,
            Arc::clone(&session),
        ));
        let plugin = Arc::new(PagePlugin::new(session, factory));

        let builder = StaticSiteBuilder::new(
            plugin,
            BuildConfig {
                out_dir: config.build_resolved.out_dir.clone(),
                assets_dir: config.build_resolved.assets_dir.clone(),
                host: HostBuildConfig::from(&config.build_resolved),
            },
        );

        output.info(&format!(
            "Building pages from {}",
            config.pages_resolved.dir.display()
        ));
        let report = builder.build().await?;

        for path in report.artifacts.iter().chain(&report.chunks) {
            output.info(&format!("  {}", path.display()));
        }
        output.success(&format!(
            "Built {} page(s) and {} hydration script(s) into {}",
            report.artifacts.len(),
            report.chunks.len(),
            config.build_resolved.out_dir.display()
        ));
        Ok(())
    }
}
