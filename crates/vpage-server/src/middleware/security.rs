//! Response headers shared by the dev and production routers.
//!
//! Rendered pages and built artifacts are never MIME-sniffed or framed.

use axum::http::HeaderValue;
use axum::http::header::{HeaderName, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS};
use tower::layer::util::Stack;
use tower_http::set_header::SetResponseHeaderLayer;

type HeaderLayer = SetResponseHeaderLayer<HeaderValue>;

/// Layer setting `X-Content-Type-Options: nosniff` and `X-Frame-Options: DENY`.
pub(crate) fn headers_layer() -> Stack<HeaderLayer, HeaderLayer> {
    Stack::new(
        overriding(X_CONTENT_TYPE_OPTIONS, "nosniff"),
        overriding(X_FRAME_OPTIONS, "DENY"),
    )
}

fn overriding(name: HeaderName, value: &'static str) -> HeaderLayer {
    SetResponseHeaderLayer::overriding(name, HeaderValue::from_static(value))
}
