//! Router composition.

use crate::auth::{self, AppState, CALLBACK_PATH, LOGIN_PATH, STATIC_PATH, require_membership};
use crate::proxy;
use crate::telemetry::log_request;
use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::get,
};
use std::path::Path;
use tower_http::services::ServeDir;

/// Builds the gateway router.
///
/// The gateway's own routes are added after the membership layer, so only the
/// catch-all proxy fallback is gated.
pub fn router(state: AppState, static_dir: impl AsRef<Path>) -> Router {
    Router::new()
        .fallback(proxy::forward)
        .layer(from_fn_with_state(state.clone(), require_membership))
        .route(LOGIN_PATH, get(auth::login))
        .route(CALLBACK_PATH, get(auth::callback))
        .nest_service(STATIC_PATH, ServeDir::new(static_dir.as_ref()))
        .layer(from_fn(log_request))
        .with_state(state)
}
