//! Static pages served by the gateway itself.
//!
//! The pages are compiled into the binary so every response is byte-identical
//! and nothing depends on the working directory.

use axum::{
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
};

const LANDING_HTML: &str = include_str!("../pages/index.html");
const FORBIDDEN_HTML: &str = include_str!("../pages/403.html");
const INTERNAL_ERROR_HTML: &str = include_str!("../pages/500.html");
const BAD_GATEWAY_HTML: &str = include_str!("../pages/502.html");

/// Landing page shown to unauthenticated visitors.
pub fn landing() -> Response {
    (StatusCode::OK, Html(LANDING_HTML)).into_response()
}

/// Shown to authenticated visitors without an authorized role.
pub fn forbidden() -> Response {
    (StatusCode::FORBIDDEN, Html(FORBIDDEN_HTML)).into_response()
}

/// Shown when access cannot be decided.
pub fn internal_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, Html(INTERNAL_ERROR_HTML)).into_response()
}

/// Shown when the backend cannot be reached.
pub fn bad_gateway() -> Response {
    (StatusCode::BAD_GATEWAY, Html(BAD_GATEWAY_HTML)).into_response()
}

/// A `302 Found` redirect.
///
/// axum's `Redirect` helpers answer 303 or 307, and browsers treat the OAuth
/// hops as plain 302s.
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body(response: Response) -> Vec<u8> {
        to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body")
            .to_vec()
    }

    #[tokio::test]
    async fn pages_have_their_statuses() {
        assert_eq!(landing().status(), StatusCode::OK);
        assert_eq!(forbidden().status(), StatusCode::FORBIDDEN);
        assert_eq!(internal_error().status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(bad_gateway().status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn pages_are_identical_across_responses() {
        assert_eq!(body(forbidden()).await, body(forbidden()).await);
        assert_eq!(body(landing()).await, LANDING_HTML.as_bytes());
    }

    #[test]
    fn pages_are_html() {
        let response = landing();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok());
        assert_eq!(content_type, Some("text/html; charset=utf-8"));
    }

    #[test]
    fn found_redirects_with_302() {
        let response = found("/");
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers().get(header::LOCATION).and_then(|v| v.to_str().ok()),
            Some("/")
        );
    }

    #[test]
    fn landing_links_to_login() {
        assert!(LANDING_HTML.contains(crate::auth::LOGIN_PATH));
    }
}
