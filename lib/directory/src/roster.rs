//! Local roster snapshot.
//!
//! The snapshot is written only by bulk refreshes and read on every cache
//! miss. Readers never wait on the network. A guild's roster stops answering
//! once it is older than the snapshot's maximum age, so a refresh that keeps
//! failing cannot pin stale roles in place.

use guild_gate_access::GuildMember;
use guild_gate_core::{GuildId, UserId};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

#[derive(Debug)]
struct GuildRoster {
    members: HashMap<UserId, GuildMember>,
    refreshed_at: Instant,
}

/// Members listed per guild by the last successful refresh.
#[derive(Debug, Default)]
pub struct RosterSnapshot {
    guilds: RwLock<HashMap<GuildId, GuildRoster>>,
    max_age: Option<Duration>,
}

impl RosterSnapshot {
    /// Creates an empty snapshot whose rosters never age out.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty snapshot that ignores rosters older than `max_age`.
    #[must_use]
    pub fn with_max_age(max_age: Duration) -> Self {
        Self {
            guilds: RwLock::default(),
            max_age: Some(max_age),
        }
    }

    fn is_fresh(&self, roster: &GuildRoster) -> bool {
        self.max_age
            .is_none_or(|max_age| roster.refreshed_at.elapsed() <= max_age)
    }

    /// Returns the member record if the last fresh roster lists the user.
    #[must_use]
    pub fn get(&self, guild_id: &GuildId, user_id: &UserId) -> Option<GuildMember> {
        let guilds = self.guilds.read().unwrap_or_else(PoisonError::into_inner);
        let roster = guilds.get(guild_id).filter(|r| self.is_fresh(r))?;
        roster.members.get(user_id).cloned()
    }

    /// Replaces the guild's roster wholesale.
    ///
    /// Members missing from `members` are dropped, so departed users stop
    /// resolving from the snapshot.
    pub fn replace(&self, guild_id: &GuildId, members: Vec<GuildMember>) {
        let members = members
            .into_iter()
            .map(|m| (m.user_id.clone(), m))
            .collect();
        let roster = GuildRoster {
            members,
            refreshed_at: Instant::now(),
        };
        let mut guilds = self.guilds.write().unwrap_or_else(PoisonError::into_inner);
        guilds.insert(guild_id.clone(), roster);
    }

    /// Returns the number of members in the guild's last roster.
    #[must_use]
    pub fn len(&self, guild_id: &GuildId) -> usize {
        let guilds = self.guilds.read().unwrap_or_else(PoisonError::into_inner);
        guilds.get(guild_id).map_or(0, |r| r.members.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guild() -> GuildId {
        "933290709589577728".parse().expect("guild id")
    }

    fn member(id: &str, roles: &[&str]) -> GuildMember {
        GuildMember::new(
            id.parse().expect("user id"),
            roles.iter().map(|r| r.parse().expect("role id")).collect(),
        )
    }

    #[test]
    fn unknown_guild_is_empty() {
        let roster = RosterSnapshot::new();
        assert_eq!(roster.len(&guild()), 0);
        assert!(roster.get(&guild(), &"1".parse().expect("id")).is_none());
    }

    #[test]
    fn replace_updates_roles() {
        let roster = RosterSnapshot::new();
        roster.replace(&guild(), vec![member("1", &["10"])]);
        roster.replace(&guild(), vec![member("1", &["20"])]);

        let found = roster.get(&guild(), &"1".parse().expect("id")).expect("member");
        assert_eq!(found, member("1", &["20"]));
        assert_eq!(roster.len(&guild()), 1);
    }

    #[test]
    fn replace_drops_departed_members() {
        let roster = RosterSnapshot::new();
        roster.replace(&guild(), vec![member("1", &[])]);
        roster.replace(&guild(), vec![member("2", &[]), member("3", &[])]);

        assert!(roster.get(&guild(), &"1".parse().expect("id")).is_none());
        assert_eq!(roster.len(&guild()), 2);
    }

    #[test]
    fn aged_roster_stops_answering() {
        let roster = RosterSnapshot::with_max_age(Duration::from_millis(20));
        roster.replace(&guild(), vec![member("1", &["10"])]);
        assert!(roster.get(&guild(), &"1".parse().expect("id")).is_some());

        std::thread::sleep(Duration::from_millis(40));

        assert!(roster.get(&guild(), &"1".parse().expect("id")).is_none());
        // Still counted until the next refresh replaces it.
        assert_eq!(roster.len(&guild()), 1);
    }
}
