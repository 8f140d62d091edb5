//! `vpage entries` command implementation.

use clap::Args;
use vpage_config::CliSettings;
use vpage_plugin::{HostBuildConfig, PageSession, register_entries};

use super::ProjectArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the entries command.
#[derive(Args)]
pub(crate) struct EntriesArgs {
    #[command(flatten)]
    project: ProjectArgs,
}

impl EntriesArgs {
    /// Execute the entries command.
    ///
    /// Prints the `name -> target` input map as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration or discovery fails, or the build
    /// input is already set in the configuration.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = self.project.load(CliSettings::default())?;

        let session = PageSession::discover(&config.pages_resolved, config.framework.clone())?;
        let patch = register_entries(&session, &HostBuildConfig::from(&config.build_resolved))?;

        output.print(&serde_json::to_string_pretty(&patch.input())?);
        Ok(())
    }
}
