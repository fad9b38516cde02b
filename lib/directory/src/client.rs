//! Discord REST client implementing [`GuildDirectory`].

use crate::roster::RosterSnapshot;
use crate::types::MemberPayload;
use async_trait::async_trait;
use guild_gate_access::{DirectoryError, GuildDirectory, GuildMember};
use guild_gate_core::{GuildId, Result, UserId};
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Page size for the member list endpoint (the API maximum).
const MEMBER_PAGE_SIZE: usize = 1000;

/// Guild directory backed by the Discord REST API.
///
/// Lookups are authenticated with a bot token. Cache misses resolve from the
/// roster snapshot when a fresh one is held; live lookups never write to it.
pub struct DiscordDirectory {
    http: reqwest::Client,
    api_base_url: String,
    bot_token: String,
    roster: RosterSnapshot,
}

impl DiscordDirectory {
    /// Creates a directory client.
    ///
    /// `http` should carry the outbound timeouts; requests are never retried.
    #[must_use]
    pub fn new(http: reqwest::Client, api_base_url: impl Into<String>, bot_token: impl Into<String>) -> Self {
        Self {
            http,
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            bot_token: bot_token.into(),
            roster: RosterSnapshot::new(),
        }
    }

    /// Ignores roster snapshots older than `max_age`.
    ///
    /// Keep this no longer than the permission cache TTL so a refresh that
    /// keeps failing falls back to live lookups.
    #[must_use]
    pub fn with_roster_max_age(mut self, max_age: Duration) -> Self {
        self.roster = RosterSnapshot::with_max_age(max_age);
        self
    }

    /// Returns the local roster snapshot.
    #[must_use]
    pub fn roster(&self) -> &RosterSnapshot {
        &self.roster
    }

    fn authorization(&self) -> String {
        format!("Bot {}", self.bot_token)
    }

    /// Fetches the full member list of a guild, following pagination.
    #[instrument(skip(self), fields(guild_id = %guild_id))]
    pub async fn list_members(
        &self,
        guild_id: &GuildId,
    ) -> Result<Vec<GuildMember>, DirectoryError> {
        let url = format!("{}/guilds/{}/members", self.api_base_url, guild_id);
        let mut members = Vec::new();
        let mut after = String::from("0");

        loop {
            let response = self
                .http
                .get(&url)
                .header(reqwest::header::AUTHORIZATION, self.authorization())
                .query(&[("limit", MEMBER_PAGE_SIZE.to_string()), ("after", after.clone())])
                .send()
                .await
                .map_err(|e| DirectoryError::Unreachable {
                    details: e.to_string(),
                })?;

            let status = response.status();
            if status != StatusCode::OK {
                return Err(DirectoryError::UnexpectedStatus {
                    status: status.as_u16(),
                }
                .into());
            }

            let page: Vec<MemberPayload> =
                response.json().await.map_err(|e| DirectoryError::Decode {
                    details: e.to_string(),
                })?;
            let page_len = page.len();

            let mut last_id = None;
            for payload in page {
                if let Some(member) = payload.into_member() {
                    last_id = Some(member.user_id.to_string());
                    members.push(member);
                }
            }

            match last_id {
                Some(id) if page_len == MEMBER_PAGE_SIZE => after = id,
                _ => break,
            }
        }

        debug!(count = members.len(), "Listed guild members");
        Ok(members)
    }

    /// Replaces the guild's roster snapshot with a fresh member list.
    ///
    /// On failure the previous snapshot is kept.
    pub async fn refresh_roster(&self, guild_id: &GuildId) -> Result<usize, DirectoryError> {
        let members = self.list_members(guild_id).await?;
        let count = members.len();
        self.roster.replace(guild_id, members);
        Ok(count)
    }

    /// Spawns a task that refreshes the guild roster every `interval`,
    /// starting immediately.
    pub fn spawn_roster_refresh(self: &Arc<Self>, guild_id: GuildId, interval: Duration) -> JoinHandle<()> {
        let directory = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match directory.refresh_roster(&guild_id).await {
                    Ok(count) => info!(%guild_id, members = count, "Refreshed guild roster"),
                    Err(e) => warn!(%guild_id, error = %e, "Failed to refresh guild roster, keeping previous snapshot"),
                }
            }
        })
    }
}

#[async_trait]
impl GuildDirectory for DiscordDirectory {
    fn cached_member(&self, guild_id: &GuildId, user_id: &UserId) -> Option<GuildMember> {
        self.roster.get(guild_id, user_id)
    }

    #[instrument(skip(self), fields(guild_id = %guild_id, user_id = %user_id))]
    async fn fetch_member(
        &self,
        guild_id: &GuildId,
        user_id: &UserId,
    ) -> Result<Option<GuildMember>, DirectoryError> {
        let url = format!(
            "{}/guilds/{}/members/{}",
            self.api_base_url, guild_id, user_id
        );

        let response = self
            .http
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, self.authorization())
            .send()
            .await
            .map_err(|e| DirectoryError::Unreachable {
                details: e.to_string(),
            })?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => {
                debug!("User is not a guild member");
                return Ok(None);
            }
            status => {
                return Err(DirectoryError::UnexpectedStatus {
                    status: status.as_u16(),
                }
                .into());
            }
        }

        let payload: MemberPayload = response.json().await.map_err(|e| DirectoryError::Decode {
            details: e.to_string(),
        })?;

        let member = payload.into_member().ok_or_else(|| DirectoryError::Decode {
            details: "member payload has no user id".to_string(),
        })?;

        Ok(Some(member))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Json, Router,
        extract::{Path, Query, State},
        http::{HeaderMap, StatusCode as AxumStatus},
        response::{IntoResponse, Response},
        routing::get,
    };
    use guild_gate_access::{AuthorizedRoles, MembershipVerifier, PermissionCache, Verdict};
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use std::sync::Mutex;

    const GUILD: &str = "933290709589577728";

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("serve");
        });
        format!("http://{addr}")
    }

    fn member_json(id: &str, roles: &[&str]) -> Value {
        json!({ "user": { "id": id, "username": format!("user{id}") }, "roles": roles })
    }

    async fn get_member(headers: HeaderMap, Path((_guild, user)): Path<(String, String)>) -> Response {
        if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some("Bot test-token") {
            return AxumStatus::UNAUTHORIZED.into_response();
        }
        match user.as_str() {
            "42" => Json(member_json("42", &["933382711148695673"])).into_response(),
            "500" => AxumStatus::INTERNAL_SERVER_ERROR.into_response(),
            "7" => "not json".into_response(),
            _ => (AxumStatus::NOT_FOUND, Json(json!({"code": 10007}))).into_response(),
        }
    }

    async fn list_members(Query(query): Query<HashMap<String, String>>) -> Json<Value> {
        let limit: usize = query.get("limit").and_then(|l| l.parse().ok()).unwrap_or(1);
        let after: u64 = query.get("after").and_then(|a| a.parse().ok()).unwrap_or(0);
        let total = 1500u64;
        let members: Vec<Value> = ((after + 1)..=total)
            .take(limit)
            .map(|id| member_json(&id.to_string(), &[]))
            .collect();
        Json(Value::Array(members))
    }

    async fn directory() -> DiscordDirectory {
        let router = Router::new()
            .route("/guilds/{guild}/members/{user}", get(get_member))
            .route("/guilds/{guild}/members", get(list_members));
        let base = serve(router).await;
        DiscordDirectory::new(reqwest::Client::new(), base, "test-token")
    }

    fn guild() -> GuildId {
        GUILD.parse().expect("guild id")
    }

    fn user(id: &str) -> UserId {
        id.parse().expect("user id")
    }

    #[tokio::test]
    async fn fetch_member_returns_roles_without_touching_snapshot() {
        let directory = directory().await;

        let member = directory
            .fetch_member(&guild(), &user("42"))
            .await
            .expect("lookup")
            .expect("member");

        assert_eq!(member.roles.len(), 1);
        assert!(directory.cached_member(&guild(), &user("42")).is_none());
    }

    /// Roles of member 42, editable while the server runs.
    type SharedRoles = Arc<Mutex<Vec<String>>>;

    async fn get_mutable_member(
        State(roles): State<SharedRoles>,
        Path((_guild, user)): Path<(String, String)>,
    ) -> Response {
        if user != "42" {
            return AxumStatus::NOT_FOUND.into_response();
        }
        let roles = roles.lock().expect("roles").clone();
        let roles: Vec<&str> = roles.iter().map(String::as_str).collect();
        Json(member_json("42", &roles)).into_response()
    }

    #[tokio::test]
    async fn revoked_role_is_denied_once_cache_entry_expires() {
        let roles: SharedRoles = Arc::new(Mutex::new(vec!["933382711148695673".to_string()]));
        let router = Router::new()
            .route("/guilds/{guild}/members/{user}", get(get_mutable_member))
            .with_state(Arc::clone(&roles));
        let base = serve(router).await;

        let directory = Arc::new(DiscordDirectory::new(reqwest::Client::new(), base, "test-token"));
        let verifier = MembershipVerifier::new(
            directory as Arc<dyn GuildDirectory>,
            Arc::new(PermissionCache::new(Duration::from_millis(20))),
            guild(),
            AuthorizedRoles::new(["933382711148695673".parse().expect("role id")]),
        );

        assert_eq!(
            verifier.is_authorized(&user("42")).await.expect("verdict"),
            Verdict::Authorized
        );

        roles.lock().expect("roles").clear();
        tokio::time::sleep(Duration::from_millis(40)).await;

        assert_eq!(
            verifier.is_authorized(&user("42")).await.expect("verdict"),
            Verdict::Denied
        );
    }

    #[tokio::test]
    async fn stale_roster_falls_back_to_live_lookup() {
        let directory = directory()
            .await
            .with_roster_max_age(Duration::from_millis(20));
        directory.refresh_roster(&guild()).await.expect("refresh");
        assert!(directory.cached_member(&guild(), &user("1")).is_some());

        tokio::time::sleep(Duration::from_millis(40)).await;

        assert!(directory.cached_member(&guild(), &user("1")).is_none());
    }

    #[tokio::test]
    async fn not_found_means_not_a_member() {
        let directory = directory().await;
        let result = directory.fetch_member(&guild(), &user("99")).await.expect("lookup");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn server_error_is_reported() {
        let directory = directory().await;
        assert!(directory.fetch_member(&guild(), &user("500")).await.is_err());
    }

    #[tokio::test]
    async fn malformed_body_is_reported() {
        let directory = directory().await;
        assert!(directory.fetch_member(&guild(), &user("7")).await.is_err());
    }

    #[tokio::test]
    async fn unreachable_directory_is_reported() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        let directory =
            DiscordDirectory::new(reqwest::Client::new(), format!("http://{addr}"), "test-token");
        assert!(directory.fetch_member(&guild(), &user("42")).await.is_err());
    }

    #[tokio::test]
    async fn refresh_roster_follows_pagination() {
        let directory = directory().await;

        let count = directory.refresh_roster(&guild()).await.expect("refresh");

        assert_eq!(count, 1500);
        assert_eq!(directory.roster().len(&guild()), 1500);
        assert!(directory.cached_member(&guild(), &user("1500")).is_some());
    }
}
