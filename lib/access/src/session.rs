//! Per-visitor session state.
//!
//! A `GateSession` is the whole of what the gateway remembers about a browser.
//! It is stored client-side in an encrypted cookie, so it holds only the
//! pending OAuth state token and, once logged in, the user's identity.

use guild_gate_core::UserId;
use serde::{Deserialize, Serialize};

/// Session record carried between requests.
///
/// `pending_state` is present only while a login is in flight. `user_id` is
/// present once the user has completed the OAuth flow. The two are
/// independent: completing login clears the former and sets the latter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pending_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_id: Option<UserId>,
}

impl GateSession {
    /// Creates an empty session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the authenticated user's ID, if logged in.
    #[must_use]
    pub fn user_id(&self) -> Option<&UserId> {
        self.user_id.as_ref()
    }

    /// Returns true once the OAuth flow has bound an identity to this session.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    /// Returns the pending anti-forgery state token, if a login is in flight.
    #[must_use]
    pub fn pending_state(&self) -> Option<&str> {
        self.pending_state.as_deref()
    }

    /// Records the state token issued for a new login attempt.
    ///
    /// A previously pending token is replaced.
    pub fn begin_login(&mut self, state: String) {
        self.pending_state = Some(state);
    }

    /// Consumes the pending state token and checks it against `presented`.
    ///
    /// The token is cleared whatever the outcome, so a state value can be
    /// redeemed at most once. Returns false when either side is missing or
    /// the values differ.
    pub fn consume_state(&mut self, presented: Option<&str>) -> bool {
        let expected = self.pending_state.take();
        match (expected, presented) {
            (Some(expected), Some(presented)) => {
                constant_time_eq(expected.as_bytes(), presented.as_bytes())
            }
            _ => false,
        }
    }

    /// Binds the authenticated identity to the session.
    pub fn complete_login(&mut self, user_id: UserId) {
        self.pending_state = None;
        self.user_id = Some(user_id);
    }
}

/// Constant-time comparison of two byte slices.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
