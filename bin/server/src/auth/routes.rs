//! Authentication routes for login and callback.
//!
//! Each handler loads the session from its cookie once and writes it back
//! once, whatever the outcome.

use super::{AppState, session};
use crate::pages;
use axum::{
    extract::{Query, State, rejection::QueryRejection},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::PrivateCookieJar;
use serde::Deserialize;

/// Query parameters for the OAuth callback.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    state: Option<String>,
    code: Option<String>,
    /// Set by the provider when the visitor declined consent.
    error: Option<String>,
}

/// Starts the OAuth flow by redirecting to the identity provider.
pub async fn login(State(state): State<AppState>, jar: PrivateCookieJar) -> Response {
    let mut gate_session = session::load(&jar);
    let auth_url = state.oauth.initiate_login(&mut gate_session);
    let jar = session::store(jar, &gate_session, &state.cookies);

    (jar, pages::found(&auth_url)).into_response()
}

/// Handles the redirect back from the identity provider.
///
/// A query that does not parse is treated as carrying no state, so it still
/// burns the pending state and gets the invalid-state response.
pub async fn callback(
    State(state): State<AppState>,
    query: Result<Query<CallbackQuery>, QueryRejection>,
    jar: PrivateCookieJar,
) -> Response {
    let mut gate_session = session::load(&jar);

    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => {
            tracing::warn!(error = %rejection.body_text(), "Malformed callback query");
            CallbackQuery::default()
        }
    };

    if let Some(error) = &query.error {
        tracing::info!(error = %error, "Identity provider returned an error to the callback");
    }

    let result = state
        .oauth
        .handle_callback(
            &mut gate_session,
            query.state.as_deref(),
            query.code.as_deref(),
        )
        .await;
    let jar = session::store(jar, &gate_session, &state.cookies);

    match result {
        Ok(user_id) => {
            tracing::info!(%user_id, "Visitor logged in");
            (jar, pages::found("/")).into_response()
        }
        Err(e) => (jar, e).into_response(),
    }
}
