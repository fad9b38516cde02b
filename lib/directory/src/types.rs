//! Wire types for the Discord REST API.

use guild_gate_access::GuildMember;
use guild_gate_core::{RoleId, UserId};
use serde::Deserialize;

/// A Discord user object, as returned by `/users/@me` and nested in members.
#[derive(Debug, Clone, Deserialize)]
pub struct UserPayload {
    /// The user's snowflake.
    pub id: String,
    /// The user's handle.
    #[serde(default)]
    pub username: Option<String>,
    /// The user's display name.
    #[serde(default)]
    pub global_name: Option<String>,
}

impl UserPayload {
    /// Parses the user's snowflake.
    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.id.parse().ok()
    }
}

/// A Discord guild member object.
#[derive(Debug, Clone, Deserialize)]
pub struct MemberPayload {
    /// The underlying user. Always present on the member endpoints used here.
    #[serde(default)]
    pub user: Option<UserPayload>,
    /// Role snowflakes held by the member.
    #[serde(default)]
    pub roles: Vec<String>,
}

impl MemberPayload {
    /// Converts the payload into a member record.
    ///
    /// Returns `None` when the payload carries no usable user ID. Malformed
    /// role IDs are dropped since they can never match a configured role.
    #[must_use]
    pub fn into_member(self) -> Option<GuildMember> {
        let user_id = self.user.as_ref()?.user_id()?;
        let roles = self
            .roles
            .iter()
            .filter_map(|r| r.parse::<RoleId>().ok())
            .collect();
        Some(GuildMember::new(user_id, roles))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_member_payload() {
        let json = r#"{
            "user": {"id": "42", "username": "alice", "global_name": null},
            "roles": ["933382711148695673", "1"],
            "nick": null,
            "joined_at": "2022-01-20T00:00:00.000000+00:00"
        }"#;
        let payload: MemberPayload = serde_json::from_str(json).expect("decode");
        let member = payload.into_member().expect("member");

        assert_eq!(member.user_id.as_str(), "42");
        assert_eq!(member.roles.len(), 2);
    }

    #[test]
    fn member_without_user_is_rejected() {
        let payload: MemberPayload = serde_json::from_str(r#"{"roles": []}"#).expect("decode");
        assert!(payload.into_member().is_none());
    }

    #[test]
    fn malformed_roles_are_dropped() {
        let payload: MemberPayload =
            serde_json::from_str(r#"{"user": {"id": "42"}, "roles": ["x", "7"]}"#)
                .expect("decode");
        let member = payload.into_member().expect("member");
        assert_eq!(member.roles, vec!["7".parse::<RoleId>().expect("role")]);
    }
}
