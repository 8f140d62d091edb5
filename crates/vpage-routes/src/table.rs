//! Ordered URL to page lookup used by the dev server.

use crate::discovery::PageSet;
use crate::page_id::PageId;
use crate::translate::{RouteError, RoutePattern};

/// Result of a successful [`RouteTable::find`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    /// Matched page.
    pub page: PageId,
    /// Bound dynamic parameters, in path order.
    pub params: Vec<(String, String)>,
}

impl RouteMatch {
    /// Value bound to a parameter name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Compiled match patterns in discovery order.
///
/// Lookup tests patterns in order and the first match wins. There is no
/// specificity ranking: `blog/[a]` listed before `blog/archive` shadows it.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<RoutePattern>,
}

impl RouteTable {
    /// Compile one pattern per page.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError`] if a pattern fails to compile.
    pub fn new(pages: &PageSet) -> Result<Self, RouteError> {
        let routes = pages
            .ids()
            .map(|id| RoutePattern::new(id.clone()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { routes })
    }

    /// Find the first page matching a URL path.
    #[must_use]
    pub fn find(&self, path: &str) -> Option<RouteMatch> {
        self.routes.iter().find_map(|route| {
            route.captures(path).map(|params| RouteMatch {
                page: route.page().clone(),
                params,
            })
        })
    }

    /// Iterate over compiled patterns in order.
    pub fn iter(&self) -> std::slice::Iter<'_, RoutePattern> {
        self.routes.iter()
    }

    /// Number of routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether the table has no routes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::discovery::Page;

    fn table(ids: &[&str]) -> RouteTable {
        let pages = PageSet::new(ids.iter().map(|id| Page {
            id: PageId::new(*id).unwrap(),
            source_path: PathBuf::from(format!("/pages/{id}.tsx")),
        }))
        .unwrap();
        RouteTable::new(&pages).unwrap()
    }

    #[test]
    fn test_find_static_and_index() {
        let table = table(&["index", "about", "blog/index"]);

        assert_eq!(table.find("/").unwrap().page.as_str(), "index");
        assert_eq!(table.find("/about").unwrap().page.as_str(), "about");
        assert_eq!(table.find("/blog/").unwrap().page.as_str(), "blog/index");
        assert_eq!(table.find("/blog"), None);
        assert_eq!(table.find("/missing"), None);
    }

    #[test]
    fn test_find_binds_params() {
        let table = table(&["index", "blog/[articleId]"]);

        let found = table.find("/blog/42").unwrap();

        assert_eq!(found.page.as_str(), "blog/[articleId]");
        assert_eq!(found.param("articleId"), Some("42"));
        assert_eq!(found.param("other"), None);
    }

    #[test]
    fn test_first_match_wins_in_discovery_order() {
        // "blog/[a]" sorts before "blog/archive"
        let table = table(&["blog/archive", "blog/[a]"]);

        assert_eq!(table.find("/blog/archive").unwrap().page.as_str(), "blog/[a]");
    }

    #[test]
    fn test_len_and_iter() {
        let table = table(&["b", "a"]);

        assert_eq!(table.len(), 2);
        let pages: Vec<_> = table.iter().map(|r| r.page().as_str()).collect();
        assert_eq!(pages, vec!["a", "b"]);
    }
}
