//! CLI command implementations.

pub(crate) mod build;
pub(crate) mod dev;
pub(crate) mod entries;
pub(crate) mod routes;
pub(crate) mod serve;

use std::path::PathBuf;

use clap::Args;
use vpage_config::{CliSettings, Config};

use crate::error::CliError;

pub(crate) use build::BuildArgs;
pub(crate) use dev::DevArgs;
pub(crate) use entries::EntriesArgs;
pub(crate) use routes::RoutesArgs;
pub(crate) use serve::ServeArgs;

/// Options shared by every command that reads the project configuration.
#[derive(Args)]
pub(crate) struct ProjectArgs {
    /// Path to configuration file (default: auto-discover vpage.toml).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Pages directory (overrides config).
    #[arg(long)]
    pub pages_dir: Option<PathBuf>,
}

impl ProjectArgs {
    /// Load the configuration with these overrides on top of `settings`.
    pub(crate) fn load(&self, mut settings: CliSettings) -> Result<Config, CliError> {
        settings.pages_dir.clone_from(&self.pages_dir);
        Ok(Config::load(self.config.as_deref(), Some(&settings))?)
    }
}
