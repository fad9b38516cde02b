//! In-process stand-ins for the identity provider and the backend.

use crate::config::DiscordConfig;
use axum::{
    Form, Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Serves `router` on an ephemeral local port and returns its base URL.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<std::net::SocketAddr>(),
        )
        .await
        .expect("serve");
    });
    format!("http://{addr}")
}

/// Outbound client configured like the production identity client.
pub fn http() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("client")
}

/// Discord settings pointing every endpoint at `base_url`.
pub fn discord_config(base_url: &str) -> DiscordConfig {
    DiscordConfig {
        client_id: "1200342075238006874".to_string(),
        client_secret: "client-secret".to_string(),
        bot_token: "bot-token".to_string(),
        redirect_base_url: "https://gate.example.com".to_string(),
        guild_id: "933290709589577728".to_string(),
        authorized_role_ids: vec!["933382711148695673".to_string()],
        api_base_url: base_url.to_string(),
        authorize_url: format!("{base_url}/authorize"),
        token_url: format!("{base_url}/token"),
        request_timeout_seconds: 5,
    }
}

/// Fake OAuth provider.
///
/// Codes map to outcomes: `good-code` logs in user 42, `user-500` yields a
/// token whose profile fetch fails, `bad-json` yields a token whose profile
/// is malformed, and any other code is rejected.
pub struct FakeProvider {
    pub base_url: String,
    token_requests: Arc<AtomicUsize>,
}

impl FakeProvider {
    pub async fn start() -> Self {
        let token_requests = Arc::new(AtomicUsize::new(0));
        let router = Router::new()
            .route("/token", post(token))
            .route("/users/@me", get(current_user))
            .with_state(Arc::clone(&token_requests));
        Self {
            base_url: serve(router).await,
            token_requests,
        }
    }

    /// Number of token exchanges attempted.
    pub fn token_requests(&self) -> usize {
        self.token_requests.load(Ordering::SeqCst)
    }
}

async fn token(
    State(requests): State<Arc<AtomicUsize>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    requests.fetch_add(1, Ordering::SeqCst);
    let access_token = match form.get("code").map(String::as_str) {
        Some("good-code") => "tok-42",
        Some("user-500") => "tok-500",
        Some("bad-json") => "tok-bad",
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "invalid_grant" })),
            )
                .into_response();
        }
    };
    Json(json!({
        "access_token": access_token,
        "token_type": "Bearer",
        "expires_in": 604800,
        "scope": "identify guilds",
    }))
    .into_response()
}

async fn current_user(headers: HeaderMap) -> Response {
    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    match bearer {
        Some("tok-42") => Json(json!({ "id": "42", "username": "alice" })).into_response(),
        Some("tok-500") => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        Some("tok-bad") => "not json".into_response(),
        _ => StatusCode::UNAUTHORIZED.into_response(),
    }
}
