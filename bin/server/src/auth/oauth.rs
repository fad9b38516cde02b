//! Discord OAuth2 client using the oauth2 crate.
//!
//! Drives the authorization-code flow: building the authorization URL with a
//! one-shot state token, exchanging the returned code, and fetching the
//! caller's own profile with the access token.

use crate::config::DiscordConfig;
use crate::error::ConfigError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use guild_gate_access::GateSession;
use guild_gate_core::UserId;
use guild_gate_directory::UserPayload;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    RedirectUrl, Scope, TokenResponse, TokenUrl, basic::BasicClient,
};
use std::fmt;

/// Scopes requested from the identity provider.
const SCOPES: &[&str] = &["identify", "guilds"];

/// OAuth client with the authorization and token endpoints configured.
type DiscordClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// OAuth client for authenticating visitors against Discord.
pub struct OAuthClient {
    client: DiscordClient,
    http: reqwest::Client,
    user_info_url: String,
}

impl OAuthClient {
    /// Creates a new OAuth client from configuration.
    ///
    /// `http` must not follow redirects.
    ///
    /// # Errors
    ///
    /// Returns an error if an endpoint URL is invalid.
    pub fn new(config: &DiscordConfig, http: reqwest::Client) -> Result<Self, ConfigError> {
        let auth_url = AuthUrl::new(config.authorize_url.clone()).map_err(|e| ConfigError::Invalid {
            key: "discord.authorize_url",
            reason: e.to_string(),
        })?;
        let token_url = TokenUrl::new(config.token_url.clone()).map_err(|e| ConfigError::Invalid {
            key: "discord.token_url",
            reason: e.to_string(),
        })?;
        let redirect_url = RedirectUrl::from_url(config.callback_url()?);

        let client = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_client_secret(ClientSecret::new(config.client_secret.clone()))
            .set_auth_uri(auth_url)
            .set_token_uri(token_url)
            .set_redirect_uri(redirect_url);

        Ok(Self {
            client,
            http,
            user_info_url: config.user_info_url(),
        })
    }

    /// Starts a login: records a fresh state token in the session and returns
    /// the authorization URL to send the visitor to.
    pub fn initiate_login(&self, session: &mut GateSession) -> String {
        let mut request = self.client.authorize_url(CsrfToken::new_random);
        for scope in SCOPES {
            request = request.add_scope(Scope::new((*scope).to_string()));
        }
        let (auth_url, csrf_token) = request.url();

        session.begin_login(csrf_token.into_secret());
        auth_url.to_string()
    }

    /// Completes a login from the callback's `state` and `code` parameters.
    ///
    /// The session's pending state is consumed whatever the outcome. On
    /// success the session is bound to the returned user.
    ///
    /// # Errors
    ///
    /// Returns an error if the state does not match, the code cannot be
    /// exchanged, or the user profile cannot be fetched.
    pub async fn handle_callback(
        &self,
        session: &mut GateSession,
        state: Option<&str>,
        code: Option<&str>,
    ) -> Result<UserId, AuthError> {
        if !session.consume_state(state) {
            return Err(AuthError::InvalidState);
        }

        let code = code.ok_or_else(|| AuthError::TokenExchangeFailed {
            details: "callback carried no authorization code".to_string(),
        })?;

        let token = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(&self.http)
            .await
            .map_err(|e| AuthError::TokenExchangeFailed {
                details: e.to_string(),
            })?;

        let user_id = self.fetch_user_id(token.access_token().secret()).await?;
        session.complete_login(user_id.clone());
        Ok(user_id)
    }

    async fn fetch_user_id(&self, access_token: &str) -> Result<UserId, AuthError> {
        let response = self
            .http
            .get(&self.user_info_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AuthError::UserFetchFailed {
                details: e.to_string(),
            })?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(AuthError::UserFetchFailed {
                details: format!("user endpoint returned {}", status),
            });
        }

        let body = response.bytes().await.map_err(|e| AuthError::UserFetchFailed {
            details: e.to_string(),
        })?;
        let user: UserPayload =
            serde_json::from_slice(&body).map_err(|e| AuthError::DecodeFailed {
                details: e.to_string(),
            })?;

        user.user_id().ok_or_else(|| AuthError::DecodeFailed {
            details: format!("user id '{}' is not a snowflake", user.id),
        })
    }
}

/// OAuth callback errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The state parameter was missing or did not match the session.
    InvalidState,
    /// The authorization code could not be exchanged for a token.
    TokenExchangeFailed { details: String },
    /// The user profile could not be fetched.
    UserFetchFailed { details: String },
    /// The user profile could not be decoded.
    DecodeFailed { details: String },
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidState => write!(f, "invalid oauth state"),
            Self::TokenExchangeFailed { details } => {
                write!(f, "token exchange failed: {}", details)
            }
            Self::UserFetchFailed { details } => {
                write!(f, "failed to fetch user info: {}", details)
            }
            Self::DecodeFailed { details } => {
                write!(f, "failed to decode user info: {}", details)
            }
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::InvalidState => {
                tracing::warn!("Rejected OAuth callback with invalid state");
                (StatusCode::BAD_REQUEST, "invalid oauth state")
            }
            Self::TokenExchangeFailed { details } => {
                tracing::error!("Token exchange failed: {}", details);
                (StatusCode::INTERNAL_SERVER_ERROR, "token exchange failed")
            }
            Self::UserFetchFailed { details } => {
                tracing::error!("User info fetch failed: {}", details);
                (StatusCode::BAD_GATEWAY, "failed to fetch user info")
            }
            Self::DecodeFailed { details } => {
                tracing::error!("User info decode failed: {}", details);
                (StatusCode::INTERNAL_SERVER_ERROR, "failed to decode user info")
            }
        };

        (status, message).into_response()
    }
}
