//! Centralized server configuration.
//!
//! This module provides strongly-typed configuration for the gateway,
//! loaded via the `config` crate from `GUILD_GATE__*` environment variables.
//! Nested sections use `__`, e.g. `GUILD_GATE__DISCORD__CLIENT_ID`, and the
//! authorized role list is comma separated.

use crate::auth::CALLBACK_PATH;
use crate::error::ConfigError;
use axum_extra::extract::cookie::Key;
use guild_gate_access::AuthorizedRoles;
use guild_gate_core::{GuildId, RoleId};
use reqwest::Url;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Minimum session secret length accepted for cookie key derivation.
pub const MIN_SESSION_SECRET_LEN: usize = 32;

/// Server configuration.
#[derive(Clone, Deserialize)]
pub struct ServerConfig {
    /// Identity provider and guild settings.
    pub discord: DiscordConfig,

    /// Origin of the protected backend, e.g. `http://127.0.0.1:8080`.
    pub target_url: String,

    /// Session cookie configuration.
    pub session: SessionConfig,

    /// Permission cache configuration.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Roster snapshot configuration.
    #[serde(default)]
    pub roster: RosterConfig,

    /// Address to listen on.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Directory holding the gateway's own static assets.
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,

    /// Deployment environment.
    #[serde(default)]
    pub environment: Environment,
}

/// Deployment environment.
///
/// Development relaxes the cookie `Secure` flag and raises log verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl Environment {
    /// Returns true in development mode.
    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

/// Discord OAuth application, bot and guild settings.
#[derive(Clone, Deserialize)]
pub struct DiscordConfig {
    /// OAuth2 client ID.
    pub client_id: String,
    /// OAuth2 client secret.
    pub client_secret: String,
    /// Bot token used for guild member lookups.
    pub bot_token: String,
    /// Public base URL of the gateway. The callback path is appended to it.
    pub redirect_base_url: String,
    /// Guild whose roles gate access.
    pub guild_id: String,
    /// Roles that grant access; holding any one is enough.
    #[serde(default)]
    pub authorized_role_ids: Vec<String>,
    /// REST API base URL.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// OAuth2 authorization endpoint.
    #[serde(default = "default_authorize_url")]
    pub authorize_url: String,
    /// OAuth2 token endpoint.
    #[serde(default = "default_token_url")]
    pub token_url: String,
    /// Timeout for a whole identity-provider request, in seconds.
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

/// Session cookie configuration.
#[derive(Clone, Deserialize)]
pub struct SessionConfig {
    /// Secret the cookie encryption key is derived from.
    pub secret: String,

    /// Cookie lifetime in days.
    #[serde(default = "default_session_max_age_days")]
    pub max_age_days: i64,
}

/// Permission cache configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// How long a verdict stays valid, in seconds.
    #[serde(default = "default_cache_ttl_seconds")]
    pub ttl_seconds: u64,

    /// Interval between expired-verdict sweeps, in seconds.
    #[serde(default = "default_cache_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,

    /// Cache failed member lookups as denials instead of answering 500.
    #[serde(default = "default_fail_closed")]
    pub fail_closed: bool,
}

/// Roster snapshot configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RosterConfig {
    /// Interval between full roster refreshes, in seconds. 0 disables them.
    #[serde(default = "default_roster_refresh_interval_seconds")]
    pub refresh_interval_seconds: u64,
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}

fn default_api_base_url() -> String {
    "https://discord.com/api/v10".to_string()
}

fn default_authorize_url() -> String {
    "https://discord.com/oauth2/authorize".to_string()
}

fn default_token_url() -> String {
    "https://discord.com/api/oauth2/token".to_string()
}

fn default_request_timeout_seconds() -> u64 {
    30
}

fn default_session_max_age_days() -> i64 {
    7
}

fn default_cache_ttl_seconds() -> u64 {
    300
}

fn default_cache_sweep_interval_seconds() -> u64 {
    600
}

fn default_fail_closed() -> bool {
    true
}

fn default_roster_refresh_interval_seconds() -> u64 {
    300
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_cache_ttl_seconds(),
            sweep_interval_seconds: default_cache_sweep_interval_seconds(),
            fail_closed: default_fail_closed(),
        }
    }
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            refresh_interval_seconds: default_roster_refresh_interval_seconds(),
        }
    }
}

impl CacheConfig {
    /// Returns the verdict TTL.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    /// Returns the sweep interval.
    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds.max(1))
    }
}

impl RosterConfig {
    /// Returns the refresh interval, or `None` when refreshing is disabled.
    #[must_use]
    pub fn refresh_interval(&self) -> Option<Duration> {
        (self.refresh_interval_seconds > 0).then(|| Duration::from_secs(self.refresh_interval_seconds))
    }
}

impl SessionConfig {
    /// Derives the cookie encryption key from the session secret.
    ///
    /// # Errors
    ///
    /// Returns an error if the secret is shorter than [`MIN_SESSION_SECRET_LEN`].
    pub fn cookie_key(&self) -> Result<Key, ConfigError> {
        let secret = self.secret.as_bytes();
        if secret.len() < MIN_SESSION_SECRET_LEN {
            return Err(ConfigError::WeakSessionSecret {
                min_len: MIN_SESSION_SECRET_LEN,
                actual: secret.len(),
            });
        }
        Ok(Key::derive_from(secret))
    }

    /// Returns the cookie lifetime.
    #[must_use]
    pub fn max_age(&self) -> time::Duration {
        time::Duration::days(self.max_age_days)
    }
}

impl DiscordConfig {
    /// Parses the guild ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the guild ID is empty or not a snowflake.
    pub fn guild_id(&self) -> Result<GuildId, ConfigError> {
        if self.guild_id.trim().is_empty() {
            return Err(ConfigError::Missing {
                key: "discord.guild_id",
            });
        }
        self.guild_id.parse().map_err(|e: guild_gate_core::ParseIdError| ConfigError::Invalid {
            key: "discord.guild_id",
            reason: e.to_string(),
        })
    }

    /// Parses the authorized role set.
    ///
    /// # Errors
    ///
    /// Returns an error if a role ID is malformed or none is configured.
    pub fn authorized_roles(&self) -> Result<AuthorizedRoles, ConfigError> {
        let roles = self
            .authorized_role_ids
            .iter()
            .filter(|r| !r.trim().is_empty())
            .map(|r| {
                r.parse::<RoleId>().map_err(|e| ConfigError::Invalid {
                    key: "discord.authorized_role_ids",
                    reason: e.to_string(),
                })
            })
            .collect::<Result<AuthorizedRoles, _>>()?;

        if roles.is_empty() {
            return Err(ConfigError::NoAuthorizedRoles);
        }
        Ok(roles)
    }

    /// Builds the OAuth callback URL by appending the gateway's callback path
    /// to the configured base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is not an absolute http(s) URL.
    pub fn callback_url(&self) -> Result<Url, ConfigError> {
        let mut url = parse_http_url("discord.redirect_base_url", &self.redirect_base_url)?;
        let base = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{base}{CALLBACK_PATH}"));
        Ok(url)
    }

    /// Returns the user-info endpoint for the bearer of an access token.
    #[must_use]
    pub fn user_info_url(&self) -> String {
        format!("{}/users/@me", self.api_base_url.trim_end_matches('/'))
    }

    /// Returns the identity-provider request timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or malformed.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::with_prefix("GUILD_GATE")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("discord.authorized_role_ids")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Parses the backend origin.
    ///
    /// # Errors
    ///
    /// Returns an error if the target is not an absolute http(s) URL.
    pub fn target_url(&self) -> Result<Url, ConfigError> {
        parse_http_url("target_url", &self.target_url)
    }

    /// Checks every value that can be checked without network access.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("discord.client_id", &self.discord.client_id),
            ("discord.client_secret", &self.discord.client_secret),
            ("discord.bot_token", &self.discord.bot_token),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Missing { key });
            }
        }
        self.discord.guild_id()?;
        self.discord.authorized_roles()?;
        self.discord.callback_url()?;
        self.target_url()?;
        self.session.cookie_key()?;
        Ok(())
    }
}

fn parse_http_url(key: &'static str, value: &str) -> Result<Url, ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Missing { key });
    }
    let url = Url::parse(value.trim()).map_err(|e| ConfigError::Invalid {
        key,
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(url),
        scheme => Err(ConfigError::Invalid {
            key,
            reason: format!("expected an absolute http(s) URL, got scheme '{}'", scheme),
        }),
    }
}
