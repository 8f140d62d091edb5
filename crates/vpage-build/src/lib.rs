//! Static HTML generation for vpage.
//!
//! [`StaticSiteBuilder`] requests every page entry registered by the page
//! plugin and writes the rendered documents to the output directory.

mod builder;

pub use builder::{BuildConfig, BuildError, BuildReport, StaticSiteBuilder};
