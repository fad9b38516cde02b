//! Access-control middleware for the gated routes.

use super::{AppState, session};
use crate::pages;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::PrivateCookieJar;
use guild_gate_access::Verdict;

/// Lets a request through only when its session belongs to an authorized
/// guild member.
///
/// - No logged-in user: the landing page at `/`, a redirect to `/` elsewhere.
/// - Verification error: the 500 page.
/// - Denied: the 403 page.
/// - Authorized: the inner service, normally the proxy.
pub async fn require_membership(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    request: Request,
    next: Next,
) -> Response {
    let gate_session = session::load(&jar);

    let Some(user_id) = gate_session.user_id() else {
        return if request.uri().path() == "/" {
            pages::landing()
        } else {
            pages::found("/")
        };
    };

    match state.verifier.is_authorized(user_id).await {
        Ok(Verdict::Authorized) => next.run(request).await,
        Ok(Verdict::Denied) => {
            tracing::warn!(%user_id, path = %request.uri().path(), "Denied request");
            pages::forbidden()
        }
        Err(e) => {
            tracing::error!(%user_id, error = %e, "Failed to verify guild membership");
            pages::internal_error()
        }
    }
}
