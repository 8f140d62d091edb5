//! Page identifier to URL translation.
//!
//! Both translations apply the same two rules:
//!
//! 1. A final `index` segment is dropped, keeping the separator before it:
//!    `index` -> `/`, `blog/index` -> `/blog/`.
//! 2. Each dynamic segment becomes a single-segment wildcard: `([^/]+)` in a
//!    match pattern, `{name}` in a route template.
//!
//! Pages may carry any number of dynamic segments.

use regex::Regex;

use crate::page_id::{PageId, Segment};

/// Wildcard group matching exactly one URL path segment.
const SEGMENT_WILDCARD: &str = "([^/]+)";

/// Error returned when a route pattern fails to compile.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    /// Regex compilation failed.
    #[error("invalid route pattern for page {page}: {source}")]
    Pattern {
        /// Page the pattern was derived from.
        page: String,
        /// Underlying regex error.
        #[source]
        source: regex::Error,
    },
}

/// Segments that make up the URL path, with the trailing `index` dropped.
///
/// The flag is true when an `index` segment was dropped.
fn url_segments(id: &PageId) -> (Vec<Segment<'_>>, bool) {
    let mut segments: Vec<Segment<'_>> = id.segments().collect();
    let is_index = id.is_index();
    if is_index {
        segments.pop();
    }
    (segments, is_index)
}

/// Join rendered segments into a URL path starting with `/`.
fn join_path(rendered: &[String], is_index: bool) -> String {
    let mut path = format!("/{}", rendered.join("/"));
    if is_index && !rendered.is_empty() {
        path.push('/');
    }
    path
}

/// Regex source for the URL match pattern of a page.
///
/// ```
/// use vpage_routes::{PageId, pattern_source};
///
/// let id = PageId::new("blog/[articleId]").unwrap();
/// assert_eq!(pattern_source(&id), "^/blog/([^/]+)$");
/// ```
#[must_use]
pub fn pattern_source(id: &PageId) -> String {
    let (segments, is_index) = url_segments(id);
    let rendered: Vec<String> = segments
        .iter()
        .map(|segment| match segment {
            Segment::Static(text) => regex::escape(text),
            Segment::Dynamic(_) => SEGMENT_WILDCARD.to_owned(),
        })
        .collect();
    format!("^{}$", join_path(&rendered, is_index))
}

/// Compile the URL match pattern of a page.
///
/// # Errors
///
/// Returns [`RouteError::Pattern`] if the pattern fails to compile.
pub fn to_match_pattern(id: &PageId) -> Result<Regex, RouteError> {
    Regex::new(&pattern_source(id)).map_err(|source| RouteError::Pattern {
        page: id.to_string(),
        source,
    })
}

/// Router path for a page, with dynamic segments as `{name}` parameters.
///
/// Literal braces in static segments are doubled.
///
/// ```
/// use vpage_routes::{PageId, to_route_template};
///
/// let id = PageId::new("blog/[articleId]").unwrap();
/// assert_eq!(to_route_template(&id), "/blog/{articleId}");
/// ```
#[must_use]
pub fn to_route_template(id: &PageId) -> String {
    let (segments, is_index) = url_segments(id);
    let rendered: Vec<String> = segments
        .iter()
        .map(|segment| match segment {
            Segment::Static(text) => text.replace('{', "{{").replace('}', "}}"),
            Segment::Dynamic(name) => format!("{{{name}}}"),
        })
        .collect();
    join_path(&rendered, is_index)
}

/// Compiled match pattern bound to its page.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    page: PageId,
    regex: Regex,
}

impl RoutePattern {
    /// Compile the pattern for a page.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::Pattern`] if the pattern fails to compile.
    pub fn new(page: PageId) -> Result<Self, RouteError> {
        let regex = to_match_pattern(&page)?;
        Ok(Self { page, regex })
    }

    /// Page this pattern routes to.
    #[must_use]
    pub fn page(&self) -> &PageId {
        &self.page
    }

    /// Match a URL path and return bound parameters in path order.
    #[must_use]
    pub fn captures(&self, path: &str) -> Option<Vec<(String, String)>> {
        let caps = self.regex.captures(path)?;
        let params = self
            .page
            .params()
            .into_iter()
            .zip(caps.iter().skip(1))
            .filter_map(|(name, value)| value.map(|v| (name.to_owned(), v.as_str().to_owned())))
            .collect();
        Some(params)
    }
}
