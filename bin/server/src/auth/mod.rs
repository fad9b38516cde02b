//! Authentication and access gating for the gateway.
//!
//! This module provides:
//! - The Discord OAuth2 authorization-code flow (`oauth`)
//! - The encrypted session cookie binding (`session`)
//! - The login and callback routes (`routes`)
//! - The middleware that decides, per request, whether to show the landing
//!   page, redirect, deny, or forward to the backend (`middleware`)
//!
//! # Gateway Paths
//!
//! The gateway's own routes live under a prefix that is unlikely to collide
//! with anything the backend serves. Every other path belongs to the backend
//! and is gated.

pub mod middleware;
pub mod oauth;
pub mod routes;
pub mod session;

use crate::proxy::ProxyForwarder;
use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use guild_gate_access::MembershipVerifier;
use std::sync::Arc;

pub use middleware::require_membership;
pub use oauth::{AuthError, OAuthClient};
pub use routes::{callback, login};

/// Builds a path under the gateway prefix at compile time.
macro_rules! gateway_path {
    ($suffix:literal) => {
        concat!("/$__hook_sess___", $suffix)
    };
}

/// Prefix of every path the gateway serves itself.
pub const GATEWAY_PREFIX: &str = gateway_path!("");

/// Starts the OAuth flow.
pub const LOGIN_PATH: &str = gateway_path!("/login");

/// OAuth redirect target.
pub const CALLBACK_PATH: &str = gateway_path!("/callback");

/// Gateway static assets, served without authentication.
pub const STATIC_PATH: &str = gateway_path!("/static");

/// Session cookie attributes.
#[derive(Clone)]
pub struct CookieSettings {
    /// Encryption key derived from the session secret.
    pub key: Key,
    /// Whether to set the `Secure` attribute.
    pub secure: bool,
    /// Cookie lifetime.
    pub max_age: time::Duration,
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// OAuth client for the identity provider.
    pub oauth: Arc<OAuthClient>,
    /// Guild membership verifier.
    pub verifier: Arc<MembershipVerifier>,
    /// Forwarder to the protected backend.
    pub proxy: Arc<ProxyForwarder>,
    /// Session cookie attributes.
    pub cookies: CookieSettings,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(
        oauth: OAuthClient,
        verifier: Arc<MembershipVerifier>,
        proxy: ProxyForwarder,
        cookies: CookieSettings,
    ) -> Self {
        Self {
            oauth: Arc::new(oauth),
            verifier,
            proxy: Arc::new(proxy),
            cookies,
        }
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookies.key.clone()
    }
}
