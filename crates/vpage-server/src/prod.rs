//! Production serving of built HTML artifacts.
//!
//! Each `<page>.html` under the build output becomes one GET route derived
//! from its page identifier (`blog/[articleId].html` -> `/blog/{articleId}`).
//! Assets are served from `/<assets_dir>`.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get_service;
use tower::ServiceBuilder;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use vpage_routes::{HTML_SUFFIX, PageId, to_route_template};

use crate::error::ServerError;
use crate::middleware::security;

/// Built artifact and the route serving it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRoute {
    /// Router path.
    pub route: String,
    /// Artifact path relative to the output directory, `/`-separated.
    pub artifact: String,
}

/// Route for an artifact path relative to the output directory.
///
/// Returns `None` for files that are not `<page id>.html`.
#[must_use]
pub fn artifact_route(relative: &str) -> Option<String> {
    let stem = relative.strip_suffix(HTML_SUFFIX)?;
    let id = PageId::new(stem).ok()?;
    Some(to_route_template(&id))
}

/// Route with parameter names erased, so `/blog/{a}` and `/blog/{b}` collide.
fn route_shape(route: &str) -> String {
    route
        .split('/')
        .map(|segment| {
            if segment.starts_with('{') && !segment.starts_with("{{") {
                "{}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Enumerate `**/*.html` under `out_dir`, excluding the assets directory.
///
/// Paths are relative, `/`-separated and sorted.
fn collect_artifacts(out_dir: &Path, assets_dir: &str) -> Result<Vec<String>, ServerError> {
    let pattern = format!(
        "{}/**/*{HTML_SUFFIX}",
        glob::Pattern::escape(&out_dir.to_string_lossy())
    );

    let mut artifacts = Vec::new();
    for entry in glob::glob(&pattern)? {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping unreadable build output");
                continue;
            }
        };
        if !path.is_file() {
            continue;
        }
        let Ok(relative) = path.strip_prefix(out_dir) else {
            continue;
        };
        let parts: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        if parts.first().is_some_and(|first| first == assets_dir) {
            continue;
        }
        artifacts.push(parts.join("/"));
    }
    artifacts.sort();
    Ok(artifacts)
}

/// Plan the artifact routes for a build output directory.
///
/// Artifacts whose route collides with an earlier one (in sorted order) or
/// with the assets prefix are skipped with a warning.
///
/// # Errors
///
/// Returns [`ServerError::OutputNotFound`] if `out_dir` does not exist.
pub fn artifact_routes(out_dir: &Path, assets_dir: &str) -> Result<Vec<ArtifactRoute>, ServerError> {
    if !out_dir.is_dir() {
        return Err(ServerError::OutputNotFound(out_dir.to_path_buf()));
    }

    let assets_prefix = format!("/{assets_dir}");
    let mut shapes = HashSet::new();
    let mut routes = Vec::new();

    for artifact in collect_artifacts(out_dir, assets_dir)? {
        let Some(route) = artifact_route(&artifact) else {
            tracing::warn!(artifact = %artifact, "Skipping artifact without a valid page name");
            continue;
        };
        if route == assets_prefix || route.starts_with(&format!("{assets_prefix}/")) {
            tracing::warn!(artifact = %artifact, route = %route, "Skipping artifact shadowed by assets");
            continue;
        }
        if !shapes.insert(route_shape(&route)) {
            tracing::warn!(artifact = %artifact, route = %route, "Skipping artifact with duplicate route");
            continue;
        }
        routes.push(ArtifactRoute { route, artifact });
    }

    Ok(routes)
}

/// Create the production router.
///
/// # Errors
///
/// Returns [`ServerError`] if the build output cannot be enumerated.
pub fn production_router(out_dir: &Path, assets_dir: &str) -> Result<Router, ServerError> {
    let mut router = Router::new();

    for entry in artifact_routes(out_dir, assets_dir)? {
        let file: PathBuf = out_dir.join(&entry.artifact);
        tracing::debug!(route = %entry.route, artifact = %entry.artifact, "Registered page");
        router = router.route(&entry.route, get_service(ServeFile::new(file)));
    }

    router = router.nest_service(
        &format!("/{assets_dir}"),
        ServeDir::new(out_dir.join(assets_dir)),
    );

    Ok(router
        .fallback(|| async { StatusCode::NOT_FOUND })
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(security::headers_layer()),
        ))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use axum::body::{Body, to_bytes};
    use axum::extract::Request;
    use pretty_assertions::assert_eq;
    use tower::ServiceExt;

    use super::*;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn build_output() -> tempfile::TempDir {
        let temp = tempfile::tempdir().unwrap();
        write(temp.path(), "index.html", "<!DOCTYPE html>\nhome");
        write(temp.path(), "blog/[articleId].html", "<!DOCTYPE html>\narticle");
        write(temp.path(), "blog/index.html", "<!DOCTYPE html>\nblog");
        write(temp.path(), "assets/app.js", "console.log(1)");
        write(temp.path(), "assets/partial.html", "<p>partial</p>");
        temp
    }

    async fn get(router: Router, uri: &str) -> (StatusCode, String) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[test]
    fn test_artifact_route() {
        assert_eq!(artifact_route("index.html").as_deref(), Some("/"));
        assert_eq!(artifact_route("blog/index.html").as_deref(), Some("/blog/"));
        assert_eq!(
            artifact_route("blog/[articleId].html").as_deref(),
            Some("/blog/{articleId}")
        );
        assert_eq!(
            artifact_route("blog/:articleId.html").as_deref(),
            Some("/blog/{articleId}")
        );
        assert_eq!(artifact_route("app.js"), None);
    }

    #[test]
    fn test_route_shape() {
        assert_eq!(route_shape("/blog/{a}"), route_shape("/blog/{b}"));
        assert_ne!(route_shape("/blog/{a}"), route_shape("/blog/a"));
        assert_ne!(route_shape("/raw/{{a}}"), route_shape("/raw/{a}"));
    }

    #[test]
    fn test_artifact_routes_skip_assets() {
        let temp = build_output();

        let routes = artifact_routes(temp.path(), "assets").unwrap();

        let artifacts: Vec<_> = routes.iter().map(|r| r.artifact.as_str()).collect();
        assert_eq!(
            artifacts,
            vec!["blog/[articleId].html", "blog/index.html", "index.html"]
        );
    }

    #[test]
    fn test_artifact_routes_skip_collisions() {
        let temp = tempfile::tempdir().unwrap();
        write(temp.path(), "blog/[a].html", "bracket");
        write(temp.path(), "blog/:a.html", "colon");
        write(temp.path(), "assets.html", "shadowed");

        let routes = artifact_routes(temp.path(), "assets").unwrap();

        assert_eq!(
            routes,
            vec![ArtifactRoute {
                route: "/blog/{a}".to_owned(),
                artifact: "blog/:a.html".to_owned(),
            }]
        );
    }

    #[test]
    fn test_missing_output_dir() {
        let temp = tempfile::tempdir().unwrap();

        let err = artifact_routes(&temp.path().join("build"), "assets").unwrap_err();

        assert!(matches!(err, ServerError::OutputNotFound(_)));
    }

    #[tokio::test]
    async fn test_serves_dynamic_artifact() {
        let temp = build_output();
        let router = production_router(temp.path(), "assets").unwrap();

        let (status, body) = get(router, "/blog/42").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "<!DOCTYPE html>\narticle");
    }

    #[tokio::test]
    async fn test_serves_index_aliases() {
        let temp = build_output();

        let (status, body) = get(production_router(temp.path(), "assets").unwrap(), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "<!DOCTYPE html>\nhome");

        let (status, body) = get(production_router(temp.path(), "assets").unwrap(), "/blog/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "<!DOCTYPE html>\nblog");
    }

    #[tokio::test]
    async fn test_serves_assets() {
        let temp = build_output();

        let (status, body) =
            get(production_router(temp.path(), "assets").unwrap(), "/assets/app.js").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "console.log(1)");
    }

    #[tokio::test]
    async fn test_unknown_paths_are_404() {
        let temp = build_output();

        for uri in ["/missing", "/blog/42/extra", "/assets/missing.js", "/index"] {
            let (status, _) = get(production_router(temp.path(), "assets").unwrap(), uri).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_security_headers() {
        let temp = build_output();
        let router = production_router(temp.path(), "assets").unwrap();
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();

        let response = router.oneshot(request).await.unwrap();

        assert_eq!(response.headers()["x-content-type-options"], "nosniff");
        assert_eq!(response.headers()["x-frame-options"], "DENY");
    }
}
