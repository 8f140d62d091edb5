//! Page identifiers and their path segments.
//!
//! A [`PageId`] is the slash-separated path of a page source file relative
//! to the pages directory, without extension:
//!
//! - `index.tsx` -> `index`
//! - `blog/index.tsx` -> `blog/index`
//! - `blog/[articleId].tsx` -> `blog/[articleId]`
//!
//! A whole segment written `[name]` or `:name` is a dynamic segment: a named
//! wildcard matching exactly one URL path segment. Both spellings mean the
//! same thing; `[name]` is the canonical one.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;

/// Final segment aliased to the empty URL segment.
pub const INDEX_SEGMENT: &str = "index";

/// Error returned when a string is not a valid page identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PageIdError {
    /// Identifier is empty.
    #[error("page identifier cannot be empty")]
    Empty,
    /// Identifier starts or ends with `/`.
    #[error("page identifier {0:?} cannot start or end with '/'")]
    SurroundingSlash(String),
    /// Identifier contains `//`.
    #[error("page identifier {0:?} contains an empty segment")]
    EmptySegment(String),
    /// Identifier contains a `.` or `..` segment.
    #[error("page identifier {0:?} contains a relative segment")]
    RelativeSegment(String),
    /// Dynamic segment without a name (`[]` or `:`).
    #[error("page identifier {0:?} has a dynamic segment without a name")]
    EmptyParam(String),
    /// The same parameter name is bound twice.
    #[error("page identifier {id:?} binds parameter {name:?} more than once")]
    DuplicateParam {
        /// Offending identifier.
        id: String,
        /// Repeated parameter name.
        name: String,
    },
    /// File path is not valid UTF-8.
    #[error("page path {} is not valid UTF-8", .0.display())]
    NonUtf8(PathBuf),
}

/// One `/`-separated segment of a page identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Literal segment matched verbatim.
    Static(&'a str),
    /// Named single-segment wildcard.
    Dynamic(&'a str),
}

impl<'a> Segment<'a> {
    /// Parse a raw segment.
    ///
    /// `[name]` and `:name` are dynamic; anything else is static. An empty
    /// name (`[]`, `:`) parses as `Dynamic("")` and is rejected by
    /// [`PageId::new`].
    #[must_use]
    pub fn parse(raw: &'a str) -> Self {
        if let Some(inner) = raw.strip_prefix('[').and_then(|s| s.strip_suffix(']'))
            && !inner.contains(['[', ']'])
        {
            return Self::Dynamic(inner);
        }
        if let Some(name) = raw.strip_prefix(':') {
            return Self::Dynamic(name);
        }
        Self::Static(raw)
    }

    /// Parameter name for dynamic segments.
    #[must_use]
    pub fn param(&self) -> Option<&'a str> {
        match self {
            Self::Dynamic(name) => Some(name),
            Self::Static(_) => None,
        }
    }
}

/// Canonical page identifier (e.g. `blog/[articleId]`).
///
/// Ordering is plain string ordering; discovery order is this order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PageId(String);

impl PageId {
    /// Create a validated page identifier.
    ///
    /// # Errors
    ///
    /// Returns [`PageIdError`] if the identifier is empty, has a leading or
    /// trailing slash, contains empty or relative segments, or binds a
    /// parameter name twice.
    pub fn new(id: impl Into<String>) -> Result<Self, PageIdError> {
        let id = id.into();
        if id.is_empty() {
            return Err(PageIdError::Empty);
        }
        if id.starts_with('/') || id.ends_with('/') {
            return Err(PageIdError::SurroundingSlash(id));
        }

        let mut params: Vec<&str> = Vec::new();
        for raw in id.split('/') {
            if raw.is_empty() {
                return Err(PageIdError::EmptySegment(id.clone()));
            }
            if raw == "." || raw == ".." {
                return Err(PageIdError::RelativeSegment(id.clone()));
            }
            if let Some(name) = Segment::parse(raw).param() {
                if name.is_empty() {
                    return Err(PageIdError::EmptyParam(id.clone()));
                }
                if params.contains(&name) {
                    return Err(PageIdError::DuplicateParam {
                        id: id.clone(),
                        name: name.to_owned(),
                    });
                }
                params.push(name);
            }
        }

        Ok(Self(id))
    }

    /// Build an identifier from a path relative to the pages directory.
    ///
    /// The extension is stripped and components are joined with `/`
    /// regardless of the platform separator.
    ///
    /// # Errors
    ///
    /// Returns [`PageIdError`] if the path is not UTF-8 or does not form a
    /// valid identifier.
    pub fn from_relative_path(path: &Path) -> Result<Self, PageIdError> {
        let without_ext = path.with_extension("");
        let mut segments = Vec::new();
        for component in without_ext.components() {
            match component {
                Component::Normal(part) => {
                    let part = part
                        .to_str()
                        .ok_or_else(|| PageIdError::NonUtf8(path.to_path_buf()))?;
                    segments.push(part);
                }
                Component::CurDir => {}
                _ => return Err(PageIdError::RelativeSegment(path.display().to_string())),
            }
        }
        Self::new(segments.join("/"))
    }

    /// Identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterate over the parsed segments.
    pub fn segments(&self) -> impl Iterator<Item = Segment<'_>> {
        self.0.split('/').map(Segment::parse)
    }

    /// Whether the final segment is `index`.
    #[must_use]
    pub fn is_index(&self) -> bool {
        self.0.rsplit('/').next() == Some(INDEX_SEGMENT)
    }

    /// Names of the dynamic parameters, in path order.
    #[must_use]
    pub fn params(&self) -> Vec<&str> {
        self.segments().filter_map(|s| s.param()).collect()
    }

    /// Whether the identifier has at least one dynamic segment.
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        self.segments().any(|s| s.param().is_some())
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PageId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_segment_parse() {
        assert_eq!(Segment::parse("blog"), Segment::Static("blog"));
        assert_eq!(Segment::parse("[articleId]"), Segment::Dynamic("articleId"));
        assert_eq!(Segment::parse(":articleId"), Segment::Dynamic("articleId"));
        // Brackets that do not wrap the whole segment are literal text
        assert_eq!(Segment::parse("post-[id]"), Segment::Static("post-[id]"));
        assert_eq!(Segment::parse("[a][b]"), Segment::Static("[a][b]"));
    }

    #[test]
    fn test_new_valid() {
        for id in ["index", "blog/index", "blog/[articleId]", "blog/:articleId", "a/[x]/b/[y]"] {
            assert_eq!(PageId::new(id).unwrap().as_str(), id);
        }
    }

    #[test]
    fn test_new_invalid() {
        assert_eq!(PageId::new(""), Err(PageIdError::Empty));
        assert!(matches!(
            PageId::new("/blog"),
            Err(PageIdError::SurroundingSlash(_))
        ));
        assert!(matches!(
            PageId::new("blog/"),
            Err(PageIdError::SurroundingSlash(_))
        ));
        assert!(matches!(
            PageId::new("blog//post"),
            Err(PageIdError::EmptySegment(_))
        ));
        assert!(matches!(
            PageId::new("../secret"),
            Err(PageIdError::RelativeSegment(_))
        ));
        assert!(matches!(PageId::new("blog/[]"), Err(PageIdError::EmptyParam(_))));
        assert!(matches!(PageId::new("blog/:"), Err(PageIdError::EmptyParam(_))));
        assert!(matches!(
            PageId::new("[id]/:id"),
            Err(PageIdError::DuplicateParam { .. })
        ));
    }

    #[test]
    fn test_from_relative_path() {
        let id = PageId::from_relative_path(Path::new("blog/[articleId].tsx")).unwrap();
        assert_eq!(id.as_str(), "blog/[articleId]");

        let id = PageId::from_relative_path(Path::new("index.tsx")).unwrap();
        assert_eq!(id.as_str(), "index");

        let id = PageId::from_relative_path(Path::new("./docs/getting.started.tsx")).unwrap();
        assert_eq!(id.as_str(), "docs/getting.started");
    }

    #[test]
    fn test_is_index() {
        assert!(PageId::new("index").unwrap().is_index());
        assert!(PageId::new("blog/index").unwrap().is_index());
        assert!(!PageId::new("blog/myindex").unwrap().is_index());
        assert!(!PageId::new("index/about").unwrap().is_index());
    }

    #[test]
    fn test_params() {
        let id = PageId::new("a/[x]/b/:y").unwrap();
        assert_eq!(id.params(), vec!["x", "y"]);
        assert!(id.is_dynamic());
        assert!(!PageId::new("about").unwrap().is_dynamic());
    }

    #[test]
    fn test_serializes_as_string() {
        let id = PageId::new("blog/[articleId]").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"blog/[articleId]\"");
    }
}
