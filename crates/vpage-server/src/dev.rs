//! On-demand page rendering for the dev server.
//!
//! The render middleware sits in front of static file serving. A GET or
//! HEAD request for a page's client entry
//! (`/virtual:page:entry-client:<page>`) gets the compiled hydration script.
//! A request whose path matches a page is rendered through the live
//! pipeline. Everything else continues to the next service.

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::extract::{OriginalUri, Request, State};
use axum::http::{HeaderValue, Method, header};
use axum::middleware::{self, Next};
use axum::response::{Html, IntoResponse, Response};
use percent_encoding::percent_decode_str;
use tower::ServiceBuilder;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use vpage_plugin::{ModulePipeline, PageSession, RenderError, client_script, render_page};
use vpage_routes::{ModuleId, PageId, RouteMatch};

use crate::error::ServerError;
use crate::middleware::security;
use crate::state::DevState;

/// Dev server setup.
pub struct DevConfig {
    /// Discovered pages.
    pub session: Arc<PageSession>,
    /// Live pipeline used for rendering.
    pub pipeline: Arc<dyn ModulePipeline>,
    /// Directory served behind the render middleware.
    pub public_dir: PathBuf,
}

/// Create the dev router.
///
/// Requests flow through the render middleware, then static files from
/// `public_dir`, then `404`.
pub fn dev_router(config: DevConfig) -> Router {
    let state = Arc::new(DevState {
        session: config.session,
        pipeline: config.pipeline,
    });

    Router::new()
        .fallback_service(ServeDir::new(config.public_dir))
        .layer(middleware::from_fn_with_state(state, render_pages))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(security::headers_layer()),
        )
}

/// Content type of compiled client entries.
const JAVASCRIPT: &str = "text/javascript; charset=utf-8";

/// Serve client entries and render the first page matching the request path.
async fn render_pages(State(state): State<Arc<DevState>>, request: Request, next: Next) -> Response {
    if !matches!(*request.method(), Method::GET | Method::HEAD) {
        return next.run(request).await;
    }
    let path = request.uri().path();
    if path.is_empty() {
        return next.run(request).await;
    }
    if let Some(ModuleId::ClientEntry(page)) = percent_decode_str(path)
        .decode_utf8()
        .ok()
        .and_then(|decoded| ModuleId::classify(&decoded))
    {
        return match serve_client_entry(&state, &page).await {
            Some(response) => response,
            None => next.run(request).await,
        };
    }
    let Some(found) = state.session.find_route(path) else {
        return next.run(request).await;
    };

    let url = request
        .uri()
        .path_and_query()
        .map_or_else(|| path.to_owned(), ToString::to_string);
    let original_url = request
        .extensions()
        .get::<OriginalUri>()
        .and_then(|uri| uri.0.path_and_query())
        .map_or_else(|| url.clone(), ToString::to_string);

    match render_match(&state, &found, &url, &original_url).await {
        Ok(html) => Html(html).into_response(),
        Err(e) => ServerError::from(e).into_response(),
    }
}

/// Compiled client entry of a page, or `None` if the page is unknown.
async fn serve_client_entry(state: &DevState, page: &PageId) -> Option<Response> {
    let id = ModuleId::client_entry(page);
    let source = state.session.entry_source(&id).ok().flatten()?;
    tracing::debug!(page = %page, "Serving client entry");

    let response = match client_script(state.pipeline.as_ref(), page, &source).await {
        Ok(script) => (
            [(header::CONTENT_TYPE, HeaderValue::from_static(JAVASCRIPT))],
            script,
        )
            .into_response(),
        Err(e) => ServerError::from(e).into_response(),
    };
    Some(response)
}

async fn render_match(
    state: &DevState,
    found: &RouteMatch,
    url: &str,
    original_url: &str,
) -> Result<String, RenderError> {
    tracing::debug!(page = %found.page, params = ?found.params, url, "Rendering page");

    let html = render_page(state.pipeline.as_ref(), &found.page).await?;
    state
        .pipeline
        .transform_html(url, &html, original_url)
        .await
        .map_err(|source| RenderError::Transform {
            url: url.to_owned(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use axum::body::{Body, to_bytes};
    use axum::http::StatusCode;
    use pretty_assertions::assert_eq;
    use tower::ServiceExt;
    use vpage_config::FrameworkConfig;
    use vpage_plugin::MockPipeline;
    use vpage_routes::{Page, PageId, PageSet};

    use super::*;

    fn session(ids: &[&str]) -> Arc<PageSession> {
        let dir = PathBuf::from("/site/src/pages");
        let pages = PageSet::new(ids.iter().map(|id| Page {
            id: PageId::new(*id).unwrap(),
            source_path: dir.join(format!("{id}.tsx")),
        }))
        .unwrap();
        Arc::new(
            PageSession::from_pages(
                dir.clone(),
                dir.join("_document.tsx"),
                FrameworkConfig::default(),
                pages,
            )
            .unwrap(),
        )
    }

    fn router(pipeline: &Arc<MockPipeline>, public_dir: &Path) -> Router {
        dev_router(DevConfig {
            session: session(&["index", "blog/[articleId]"]),
            pipeline: Arc::clone(pipeline) as Arc<dyn ModulePipeline>,
            public_dir: public_dir.to_path_buf(),
        })
    }

    async fn send(router: Router, method: Method, uri: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_renders_dynamic_page() {
        let temp = tempfile::tempdir().unwrap();
        let pipeline = Arc::new(MockPipeline::new());

        let (status, body) = send(router(&pipeline, temp.path()), Method::GET, "/blog/42").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.starts_with("<!DOCTYPE html>\n"));
        assert!(body.contains("data-page=\"blog/[articleId]\""));
        assert_eq!(
            pipeline.transform_calls(),
            vec![("/blog/42".to_owned(), "/blog/42".to_owned())]
        );
    }

    #[tokio::test]
    async fn test_renders_index_with_query() {
        let temp = tempfile::tempdir().unwrap();
        let pipeline = Arc::new(MockPipeline::new().with_html("index", "<html>Home</html>"));

        let (status, body) = send(router(&pipeline, temp.path()), Method::GET, "/?tab=1").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "<!DOCTYPE html>\n<html>Home</html>");
        assert_eq!(pipeline.transform_calls()[0].0, "/?tab=1");
    }

    #[tokio::test]
    async fn test_html_content_type_and_security_headers() {
        let temp = tempfile::tempdir().unwrap();
        let pipeline = Arc::new(MockPipeline::new());
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();

        let response = router(&pipeline, temp.path()).oneshot(request).await.unwrap();

        let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
        assert!(content_type.starts_with("text/html"));
        assert_eq!(response.headers()["x-content-type-options"], "nosniff");
        assert_eq!(response.headers()["x-frame-options"], "DENY");
    }

    #[tokio::test]
    async fn test_unmatched_path_falls_through_to_public_dir() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("robots.txt"), "User-agent: *").unwrap();
        let pipeline = Arc::new(MockPipeline::new());

        let (status, body) = send(router(&pipeline, temp.path()), Method::GET, "/robots.txt").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "User-agent: *");
        assert!(pipeline.transform_calls().is_empty());
    }

    #[tokio::test]
    async fn test_unmatched_path_is_404() {
        let temp = tempfile::tempdir().unwrap();
        let pipeline = Arc::new(MockPipeline::new());

        for uri in ["/missing", "/blog/", "/blog/42/extra"] {
            let (status, _) = send(router(&pipeline, temp.path()), Method::GET, uri).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        }
        assert!(pipeline.transform_calls().is_empty());
    }

    #[tokio::test]
    async fn test_render_failure_is_500() {
        let temp = tempfile::tempdir().unwrap();
        let pipeline = Arc::new(MockPipeline::new().with_failure("index"));

        let (status, body) = send(router(&pipeline, temp.path()), Method::GET, "/").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.contains("error"));
    }

    #[tokio::test]
    async fn test_serves_client_entry_as_javascript() {
        let temp = tempfile::tempdir().unwrap();
        let pipeline = Arc::new(MockPipeline::new());
        let request = Request::builder()
            .uri("/virtual:page:entry-client:index")
            .body(Body::empty())
            .unwrap();

        let response = router(&pipeline, temp.path()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], JAVASCRIPT);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.starts_with("// bundled /virtual:page:entry-client:index\n"));
        assert!(body.contains("hydrate(createElement(Page, null)"));
        assert!(body.contains("\"/site/src/pages/index.tsx\""));
        assert!(pipeline.transform_calls().is_empty());
    }

    #[tokio::test]
    async fn test_serves_encoded_dynamic_client_entry() {
        let temp = tempfile::tempdir().unwrap();
        let pipeline = Arc::new(MockPipeline::new());

        let (status, body) = send(
            router(&pipeline, temp.path()),
            Method::GET,
            "/virtual:page:entry-client:blog/%5BarticleId%5D",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("/site/src/pages/blog/[articleId].tsx"));
    }

    #[tokio::test]
    async fn test_unknown_client_entry_is_404() {
        let temp = tempfile::tempdir().unwrap();
        let pipeline = Arc::new(MockPipeline::new());

        let (status, _) = send(
            router(&pipeline, temp.path()),
            Method::GET,
            "/virtual:page:entry-client:missing",
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_client_entry_failure_is_500() {
        let temp = tempfile::tempdir().unwrap();
        let pipeline = Arc::new(MockPipeline::new().with_missing("index"));

        let (status, body) = send(
            router(&pipeline, temp.path()),
            Method::GET,
            "/virtual:page:entry-client:index",
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.contains("client entry"));
    }

    #[tokio::test]
    async fn test_non_get_requests_are_not_rendered() {
        let temp = tempfile::tempdir().unwrap();
        let pipeline = Arc::new(MockPipeline::new());

        let (status, _) = send(router(&pipeline, temp.path()), Method::POST, "/").await;

        assert_ne!(status, StatusCode::OK);
        assert!(pipeline.transform_calls().is_empty());
    }
}
