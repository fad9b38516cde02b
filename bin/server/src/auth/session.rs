//! Session cookie binding.
//!
//! The whole [`GateSession`] is serialized into a single private cookie, so
//! the gateway keeps no server-side session store.

use super::CookieSettings;
use axum_extra::extract::cookie::{Cookie, PrivateCookieJar, SameSite};
use guild_gate_access::GateSession;

/// Session cookie name.
pub const SESSION_COOKIE: &str = "hook_sess";

/// Loads the session from the jar.
///
/// A missing cookie, or one that fails to decrypt or decode, yields an empty
/// session.
pub fn load(jar: &PrivateCookieJar) -> GateSession {
    jar.get(SESSION_COOKIE)
        .and_then(|cookie| serde_json::from_str(cookie.value()).ok())
        .unwrap_or_default()
}

/// Writes the session back into the jar.
pub fn store(jar: PrivateCookieJar, session: &GateSession, settings: &CookieSettings) -> PrivateCookieJar {
    let value = match serde_json::to_string(session) {
        Ok(value) => value,
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize session, leaving cookie unchanged");
            return jar;
        }
    };

    let cookie = Cookie::build((SESSION_COOKIE, value))
        .path("/")
        .http_only(true)
        .secure(settings.secure)
        .same_site(SameSite::Lax)
        .max_age(settings.max_age);

    jar.add(cookie)
}
