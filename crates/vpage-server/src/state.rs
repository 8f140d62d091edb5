//! Dev server state.
//!
//! Shared by every request handled by the render middleware.

use std::sync::Arc;

use vpage_plugin::{ModulePipeline, PageSession};

/// State shared across dev requests.
pub(crate) struct DevState {
    /// Discovered pages and their routes.
    pub(crate) session: Arc<PageSession>,
    /// Live pipeline rendering pages on demand.
    pub(crate) pipeline: Arc<dyn ModulePipeline>,
}
