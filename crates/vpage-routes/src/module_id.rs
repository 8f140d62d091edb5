//! Virtual module identifiers.
//!
//! Every module the page plugin owns has a reserved string form. The host
//! bundler hands us arbitrary module ids; [`ModuleId::classify`] decides which
//! of them are ours without touching the filesystem.

use std::fmt;

use crate::page_id::PageId;

/// Id of the shared document template module.
pub const DOCUMENT_ID: &str = "virtual:page:document";

/// Prefix of page source modules.
pub const PAGE_SOURCE_PREFIX: &str = "virtual:page:source:";

/// Prefix of client hydration entries.
///
/// The leading `/` makes the id usable as a script URL in rendered HTML.
pub const CLIENT_ENTRY_PREFIX: &str = "/virtual:page:entry-client:";

/// Prefix of server render entries.
pub const SERVER_ENTRY_PREFIX: &str = "virtual:page:entry-server:";

/// Suffix of HTML artifact entries.
pub const HTML_SUFFIX: &str = ".html";

/// A module id owned by the page plugin.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ModuleId {
    /// Shared document template.
    Document,
    /// Source module of a page.
    PageSource(PageId),
    /// Browser entry that hydrates a page.
    ClientEntry(PageId),
    /// Server entry exporting `render()` for a page.
    ServerEntry(PageId),
    /// Rendered HTML of a page, used as a build entrypoint.
    HtmlArtifact(PageId),
}

impl ModuleId {
    /// Classify an arbitrary module id.
    ///
    /// Returns `None` for ids the plugin does not own, including reserved
    /// prefixes followed by an invalid page identifier. Prefixes are checked
    /// before the `.html` suffix, so `virtual:page:entry-server:a.html` is a
    /// server entry for page `a.html`.
    #[must_use]
    pub fn classify(id: &str) -> Option<Self> {
        if id == DOCUMENT_ID {
            return Some(Self::Document);
        }
        if let Some(rest) = id.strip_prefix(PAGE_SOURCE_PREFIX) {
            return PageId::new(rest).ok().map(Self::PageSource);
        }
        if let Some(rest) = id.strip_prefix(CLIENT_ENTRY_PREFIX) {
            return PageId::new(rest).ok().map(Self::ClientEntry);
        }
        if let Some(rest) = id.strip_prefix(SERVER_ENTRY_PREFIX) {
            return PageId::new(rest).ok().map(Self::ServerEntry);
        }
        if let Some(stem) = id.strip_suffix(HTML_SUFFIX) {
            let stem = stem.strip_prefix('/').unwrap_or(stem);
            return PageId::new(stem).ok().map(Self::HtmlArtifact);
        }
        None
    }

    /// Client entry id for a page.
    #[must_use]
    pub fn client_entry(page: &PageId) -> Self {
        Self::ClientEntry(page.clone())
    }

    /// Server entry id for a page.
    #[must_use]
    pub fn server_entry(page: &PageId) -> Self {
        Self::ServerEntry(page.clone())
    }

    /// HTML artifact id for a page.
    #[must_use]
    pub fn html_artifact(page: &PageId) -> Self {
        Self::HtmlArtifact(page.clone())
    }

    /// Page this id refers to, if any.
    #[must_use]
    pub fn page(&self) -> Option<&PageId> {
        match self {
            Self::Document => None,
            Self::PageSource(page)
            | Self::ClientEntry(page)
            | Self::ServerEntry(page)
            | Self::HtmlArtifact(page) => Some(page),
        }
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Document => f.write_str(DOCUMENT_ID),
            Self::PageSource(page) => write!(f, "{PAGE_SOURCE_PREFIX}{page}"),
            Self::ClientEntry(page) => write!(f, "{CLIENT_ENTRY_PREFIX}{page}"),
            Self::ServerEntry(page) => write!(f, "{SERVER_ENTRY_PREFIX}{page}"),
            Self::HtmlArtifact(page) => write!(f, "{page}{HTML_SUFFIX}"),
        }
    }
}
