//! Visitor tracking.
//!
//! Logs every page view (GET requests for HTML pages) as a structured
//! `tracing` event and leaves a Sentry breadcrumb. Nothing is persisted.

use axum::{extract::Request, http::Method, middleware::Next, response::Response};

use crate::error::add_breadcrumb;

/// Paths that are not page views.
const IGNORED_PREFIXES: &[&str] = &["/health"];

/// Whether a request counts as a page view.
fn is_page_view(method: &Method, path: &str) -> bool {
    method == Method::GET && !IGNORED_PREFIXES.iter().any(|p| path.starts_with(p))
}

/// Middleware that records page visits.
pub async fn track_visits(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let page_view = is_page_view(request.method(), &path);

    let response = next.run(request).await;

    if page_view {
        let status = response.status().as_u16();
        tracing::info!(path = %path, status, "Page visit");
        add_breadcrumb("navigation", "Page visit", Some(&[("path", path.as_str())]));
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_views() {
        assert!(is_page_view(&Method::GET, "/"));
        assert!(is_page_view(&Method::GET, "/history"));
        assert!(!is_page_view(&Method::POST, "/cart/add"));
        assert!(!is_page_view(&Method::GET, "/health/ready"));
    }
}
