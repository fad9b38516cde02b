//! Startup error types for the gateway server.
//!
//! Request-time errors live next to the handlers that produce them
//! (`auth::AuthError`, the proxy's bad-gateway path).

use std::fmt;

/// Configuration that loaded but cannot be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required value is empty.
    Missing { key: &'static str },
    /// A value could not be parsed.
    Invalid { key: &'static str, reason: String },
    /// The session secret is too short to derive a cookie key from.
    WeakSessionSecret { min_len: usize, actual: usize },
    /// No authorized role was configured, which would deny everyone.
    NoAuthorizedRoles,
    /// The outbound HTTP client could not be built.
    HttpClient { details: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing { key } => write!(f, "missing required configuration '{}'", key),
            Self::Invalid { key, reason } => {
                write!(f, "invalid configuration '{}': {}", key, reason)
            }
            Self::WeakSessionSecret { min_len, actual } => write!(
                f,
                "session secret must be at least {} bytes, got {}",
                min_len, actual
            ),
            Self::NoAuthorizedRoles => write!(f, "no authorized role ids configured"),
            Self::HttpClient { details } => {
                write!(f, "failed to build HTTP client: {}", details)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_display_names_key() {
        let err = ConfigError::Missing {
            key: "discord.client_id",
        };
        assert!(err.to_string().contains("discord.client_id"));
    }

    #[test]
    fn weak_secret_display() {
        let err = ConfigError::WeakSessionSecret {
            min_len: 32,
            actual: 8,
        };
        assert!(err.to_string().contains("32"));
        assert!(err.to_string().contains("8"));
    }
}
