//! Page discovery by filesystem walking.
//!
//! Discovery runs once, before any router or plugin exists. The resulting
//! [`PageSet`] is immutable and ordered by identifier.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::page_id::{PageId, PageIdError};

/// Error returned by [`discover_pages`].
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// Pages directory does not exist or is not a directory.
    #[error("pages directory not found: {}", .0.display())]
    PagesDirMissing(PathBuf),
    /// Directory listing failed.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// Directory being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// A page file does not map to a valid identifier.
    #[error("invalid page file {}: {source}", path.display())]
    InvalidId {
        /// Offending file.
        path: PathBuf,
        /// Validation error.
        #[source]
        source: PageIdError,
    },
    /// Two page files map to the same identifier.
    #[error("page {id} is defined by both {} and {}", first.display(), second.display())]
    DuplicatePage {
        /// Shared identifier.
        id: String,
        /// File discovered first.
        first: PathBuf,
        /// Conflicting file.
        second: PathBuf,
    },
}

/// Which files count as pages.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// File name prefix that excludes a file from discovery.
    pub exclude_prefix: String,
    /// Page file extensions, without the dot.
    pub extensions: Vec<String>,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            exclude_prefix: "_".to_owned(),
            extensions: vec!["tsx".to_owned()],
        }
    }
}

impl DiscoveryOptions {
    fn is_page_file(&self, path: &Path, file_name: &str) -> bool {
        if !self.exclude_prefix.is_empty() && file_name.starts_with(&self.exclude_prefix) {
            return false;
        }
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|allowed| allowed == ext))
    }
}

/// A discovered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Page identifier.
    pub id: PageId,
    /// Absolute path of the page source file.
    pub source_path: PathBuf,
}

/// Immutable set of pages in discovery order.
#[derive(Debug, Clone, Default)]
pub struct PageSet {
    pages: Vec<Page>,
}

impl PageSet {
    /// Build a set from pages, sorting them by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::DuplicatePage`] if two pages share an id.
    pub fn new(pages: impl IntoIterator<Item = Page>) -> Result<Self, DiscoveryError> {
        let mut by_id: BTreeMap<PageId, Page> = BTreeMap::new();
        for page in pages {
            if let Some(existing) = by_id.get(&page.id) {
                let (first, second) = if existing.source_path <= page.source_path {
                    (existing.source_path.clone(), page.source_path)
                } else {
                    (page.source_path, existing.source_path.clone())
                };
                return Err(DiscoveryError::DuplicatePage {
                    id: page.id.to_string(),
                    first,
                    second,
                });
            }
            by_id.insert(page.id.clone(), page);
        }
        Ok(Self {
            pages: by_id.into_values().collect(),
        })
    }

    /// Look up a page by identifier.
    #[must_use]
    pub fn get(&self, id: &PageId) -> Option<&Page> {
        self.pages
            .binary_search_by(|page| page.id.cmp(id))
            .ok()
            .map(|idx| &self.pages[idx])
    }

    /// Iterate over pages in discovery order.
    pub fn iter(&self) -> std::slice::Iter<'_, Page> {
        self.pages.iter()
    }

    /// Iterate over page identifiers in discovery order.
    pub fn ids(&self) -> impl Iterator<Item = &PageId> {
        self.pages.iter().map(|page| &page.id)
    }

    /// Number of pages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Whether no pages were discovered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

impl<'a> IntoIterator for &'a PageSet {
    type Item = &'a Page;
    type IntoIter = std::slice::Iter<'a, Page>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Walk `pages_dir` recursively and collect page files.
///
/// Hidden entries (names starting with `.`) are skipped.
///
/// # Errors
///
/// Returns [`DiscoveryError`] if the directory is missing or unreadable, a
/// file name is not a valid identifier, or two files share an identifier.
pub fn discover_pages(pages_dir: &Path, options: &DiscoveryOptions) -> Result<PageSet, DiscoveryError> {
    if !pages_dir.is_dir() {
        return Err(DiscoveryError::PagesDirMissing(pages_dir.to_path_buf()));
    }

    let mut pages = Vec::new();
    scan_directory(pages_dir, pages_dir, options, &mut pages)?;
    let set = PageSet::new(pages)?;

    tracing::debug!(dir = %pages_dir.display(), count = set.len(), "Discovered pages");
    Ok(set)
}

fn scan_directory(
    root: &Path,
    dir_path: &Path,
    options: &DiscoveryOptions,
    pages: &mut Vec<Page>,
) -> Result<(), DiscoveryError> {
    let io_err = |source| DiscoveryError::Io {
        path: dir_path.to_path_buf(),
        source,
    };

    for entry in fs::read_dir(dir_path).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        let file_name = entry.file_name();
        let name = file_name.to_string_lossy();

        if name.starts_with('.') {
            continue;
        }

        let path = entry.path();
        let is_dir = entry.file_type().map_err(io_err)?.is_dir();

        if is_dir {
            scan_directory(root, &path, options, pages)?;
        } else if options.is_page_file(&path, &name) {
            let relative = path.strip_prefix(root).unwrap_or(&path);
            let id = PageId::from_relative_path(relative).map_err(|source| {
                DiscoveryError::InvalidId {
                    path: path.clone(),
                    source,
                }
            })?;
            pages.push(Page {
                id,
                source_path: path,
            });
        }
    }

    Ok(())
}
