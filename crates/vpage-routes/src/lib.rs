//! File-based page routing for vpage.
//!
//! This crate turns a directory of page source files into routes:
//!
//! - [`discover_pages`] walks the pages directory and returns a [`PageSet`]
//! - [`to_match_pattern`] and [`to_route_template`] translate a [`PageId`]
//!   into a URL regex and a router path
//! - [`RouteTable`] finds the page for a URL in discovery order
//! - [`ModuleId`] classifies the virtual module ids the page plugin owns
//!
//! Nothing here performs I/O except [`discover_pages`].
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use vpage_routes::{DiscoveryOptions, RouteTable, discover_pages};
//!
//! let pages = discover_pages(Path::new("src/pages"), &DiscoveryOptions::default())?;
//! let table = RouteTable::new(&pages)?;
//! if let Some(found) = table.find("/blog/42") {
//!     println!("{} {:?}", found.page, found.params);
//! }
//! ```

mod discovery;
mod module_id;
mod page_id;
mod table;
mod translate;

pub use discovery::{DiscoveryError, DiscoveryOptions, Page, PageSet, discover_pages};
pub use module_id::{
    CLIENT_ENTRY_PREFIX, DOCUMENT_ID, HTML_SUFFIX, ModuleId, PAGE_SOURCE_PREFIX,
    SERVER_ENTRY_PREFIX,
};
pub use page_id::{INDEX_SEGMENT, PageId, PageIdError, Segment};
pub use table::{RouteMatch, RouteTable};
pub use translate::{RouteError, RoutePattern, pattern_source, to_match_pattern, to_route_template};
