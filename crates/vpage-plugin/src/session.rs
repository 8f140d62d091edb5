//! Discovered pages shared by the plugin, dev server and build driver.

use std::path::{Path, PathBuf};

use vpage_config::{FrameworkConfig, PagesConfig};
use vpage_routes::{
    DiscoveryOptions, ModuleId, Page, PageId, PageSet, RouteMatch, RouteTable, discover_pages,
};

use crate::codegen;
use crate::error::PluginError;

/// Immutable page state for one process.
///
/// Built once at startup by [`PageSession::discover`] and shared behind an
/// `Arc`. Nothing in the session changes afterwards, so adding a page
/// requires a restart.
#[derive(Debug)]
pub struct PageSession {
    pages_dir: PathBuf,
    document_path: PathBuf,
    framework: FrameworkConfig,
    pages: PageSet,
    routes: RouteTable,
}

impl PageSession {
    /// Discover pages and compile their routes.
    ///
    /// A missing document template is only logged; rendering reports it.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Discovery`] if discovery fails and
    /// [`PluginError::Route`] if a route pattern does not compile.
    pub fn discover(pages: &PagesConfig, framework: FrameworkConfig) -> Result<Self, PluginError> {
        let options = DiscoveryOptions {
            exclude_prefix: pages.exclude_prefix.clone(),
            extensions: pages.extensions.clone(),
        };
        let set = discover_pages(&pages.dir, &options)?;

        let document_path = pages.document_path();
        if !document_path.exists() {
            tracing::warn!(path = %document_path.display(), "Document template not found");
        }

        tracing::info!(
            dir = %pages.dir.display(),
            pages = set.len(),
            "Pages discovered"
        );

        Self::from_pages(pages.dir.clone(), document_path, framework, set)
    }

    /// Build a session from an already discovered page set.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Route`] if a route pattern does not compile.
    pub fn from_pages(
        pages_dir: PathBuf,
        document_path: PathBuf,
        framework: FrameworkConfig,
        pages: PageSet,
    ) -> Result<Self, PluginError> {
        let routes = RouteTable::new(&pages)?;
        Ok(Self {
            pages_dir,
            document_path,
            framework,
            pages,
            routes,
        })
    }

    /// Pages directory.
    #[must_use]
    pub fn pages_dir(&self) -> &Path {
        &self.pages_dir
    }

    /// Document template path.
    #[must_use]
    pub fn document_path(&self) -> &Path {
        &self.document_path
    }

    /// Framework module names used in generated code.
    #[must_use]
    pub fn framework(&self) -> &FrameworkConfig {
        &self.framework
    }

    /// Discovered pages.
    #[must_use]
    pub fn pages(&self) -> &PageSet {
        &self.pages
    }

    /// Compiled routes in discovery order.
    #[must_use]
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Find the page serving a URL path.
    #[must_use]
    pub fn find_route(&self, path: &str) -> Option<RouteMatch> {
        self.routes.find(path)
    }

    /// Look up a discovered page.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::UnknownPage`] if the page was not discovered.
    pub fn page(&self, id: &PageId) -> Result<&Page, PluginError> {
        self.pages
            .get(id)
            .ok_or_else(|| PluginError::UnknownPage(id.to_string()))
    }

    /// Generated source for a client or server entry.
    ///
    /// Returns `Ok(None)` for modules backed by files on disk and for HTML
    /// artifacts, which are rendered rather than generated.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::UnknownPage`] if the entry refers to a page
    /// that was not discovered.
    pub fn entry_source(&self, id: &ModuleId) -> Result<Option<String>, PluginError> {
        match id {
            ModuleId::ClientEntry(page) => {
                let page = self.page(page)?;
                Ok(Some(codegen::client_entry(
                    &self.framework,
                    &page.source_path,
                )))
            }
            ModuleId::ServerEntry(page) => {
                let page = self.page(page)?;
                Ok(Some(codegen::server_entry(
                    &self.framework,
                    &self.document_path,
                    &page.source_path,
                    &ModuleId::client_entry(&page.id),
                )))
            }
            ModuleId::Document | ModuleId::PageSource(_) | ModuleId::HtmlArtifact(_) => Ok(None),
        }
    }
}
