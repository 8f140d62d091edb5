//! `vpage routes` command implementation.

use clap::Args;
use vpage_config::CliSettings;
use vpage_plugin::PageSession;
use vpage_routes::{PageSet, pattern_source, to_route_template};

use super::ProjectArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the routes command.
#[derive(Args)]
pub(crate) struct RoutesArgs {
    #[command(flatten)]
    project: ProjectArgs,
}

impl RoutesArgs {
    /// Execute the routes command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration or page discovery fails.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = self.project.load(CliSettings::default())?;

        let session = PageSession::discover(&config.pages_resolved, config.framework.clone())?;
        let pages = session.pages();

        if pages.is_empty() {
            output.warning("No pages found");
            return Ok(());
        }
        for line in route_lines(pages) {
            output.print(&line);
        }
        Ok(())
    }
}

/// One `<page id>  <router path>  <match pattern>` line per page.
fn route_lines(pages: &PageSet) -> Vec<String> {
    let width = pages
        .iter()
        .map(|page| page.id.as_str().len())
        .max()
        .unwrap_or(0);
    pages
        .iter()
        .map(|page| {
            format!(
                "{:<width$}  {}  {}",
                page.id.as_str(),
                to_route_template(&page.id),
                pattern_source(&page.id)
            )
        })
        .collect()
}
