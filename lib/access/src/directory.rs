//! Guild directory abstraction.
//!
//! The directory is the identity provider's view of guild membership. The
//! membership verifier only needs two things from it: a cheap look at the
//! locally held roster snapshot, and a live lookup when the snapshot has
//! nothing to say.

use crate::error::DirectoryError;
use async_trait::async_trait;
use guild_gate_core::{GuildId, Result, RoleId, UserId};
use serde::{Deserialize, Serialize};

/// A guild member and the roles they hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildMember {
    /// The member's user ID.
    pub user_id: UserId,
    /// Role identifiers assigned to the member.
    pub roles: Vec<RoleId>,
}

impl GuildMember {
    /// Creates a member record.
    #[must_use]
    pub fn new(user_id: UserId, roles: Vec<RoleId>) -> Self {
        Self { user_id, roles }
    }
}

/// Source of guild membership records.
#[async_trait]
pub trait GuildDirectory: Send + Sync {
    /// Looks the user up in the local roster snapshot.
    ///
    /// Returns `None` when the user is absent or no snapshot is loaded.
    fn cached_member(&self, guild_id: &GuildId, user_id: &UserId) -> Option<GuildMember>;

    /// Queries the directory service for the user's member record.
    ///
    /// Returns `Ok(None)` when the directory confirms the user is not a member.
    async fn fetch_member(
        &self,
        guild_id: &GuildId,
        user_id: &UserId,
    ) -> Result<Option<GuildMember>, DirectoryError>;
}
