//! Guild membership verification.
//!
//! The verifier answers one question: may this user through the gate? The
//! answer comes from the permission cache when it has one, otherwise from the
//! roster snapshot, otherwise from a live directory lookup. Whatever is
//! decided is cached.
//!
//! Callers only ever see `Authorized` or `Denied`. Why a user was denied is
//! reported out of band through `tracing` events and [`MembershipStats`].

use crate::cache::{CachedVerdict, PermissionCache};
use crate::directory::{GuildDirectory, GuildMember};
use crate::error::MembershipError;
use crate::role::AuthorizedRoles;
use guild_gate_core::{GuildId, Result, UserId};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, instrument, warn};

/// Outcome of a membership check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The user holds an authorized role.
    Authorized,
    /// The user may not pass.
    Denied,
}

impl Verdict {
    /// Returns true for [`Verdict::Authorized`].
    #[must_use]
    pub fn is_authorized(&self) -> bool {
        matches!(self, Self::Authorized)
    }
}

/// Why a fresh check ended in denial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialCause {
    /// The user is a member but holds none of the authorized roles.
    MissingRole,
    /// The directory confirmed the user is not a guild member.
    NotMember,
    /// The directory lookup failed.
    LookupFailed,
}

impl fmt::Display for DenialCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::MissingRole => "missing_role",
            Self::NotMember => "not_member",
            Self::LookupFailed => "lookup_failed",
        };
        f.write_str(s)
    }
}

/// Counters describing how verdicts were reached.
#[derive(Debug, Default)]
pub struct MembershipStats {
    cache_hits: AtomicU64,
    snapshot_hits: AtomicU64,
    live_lookups: AtomicU64,
    missing_role: AtomicU64,
    not_member: AtomicU64,
    lookup_failures: AtomicU64,
}

/// Point-in-time copy of [`MembershipStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub cache_hits: u64,
    pub snapshot_hits: u64,
    pub live_lookups: u64,
    pub missing_role: u64,
    pub not_member: u64,
    pub lookup_failures: u64,
}

impl MembershipStats {
    /// Reads all counters.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            snapshot_hits: self.snapshot_hits.load(Ordering::Relaxed),
            live_lookups: self.live_lookups.load(Ordering::Relaxed),
            missing_role: self.missing_role.load(Ordering::Relaxed),
            not_member: self.not_member.load(Ordering::Relaxed),
            lookup_failures: self.lookup_failures.load(Ordering::Relaxed),
        }
    }

    fn record_denial(&self, cause: DenialCause) {
        let counter = match cause {
            DenialCause::MissingRole => &self.missing_role,
            DenialCause::NotMember => &self.not_member,
            DenialCause::LookupFailed => &self.lookup_failures,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Resolves user identities to access verdicts for one guild.
pub struct MembershipVerifier {
    directory: Arc<dyn GuildDirectory>,
    cache: Arc<PermissionCache>,
    guild_id: GuildId,
    roles: AuthorizedRoles,
    fail_closed: bool,
    stats: MembershipStats,
}

impl MembershipVerifier {
    /// Creates a verifier that fails closed on lookup errors.
    #[must_use]
    pub fn new(
        directory: Arc<dyn GuildDirectory>,
        cache: Arc<PermissionCache>,
        guild_id: GuildId,
        roles: AuthorizedRoles,
    ) -> Self {
        Self {
            directory,
            cache,
            guild_id,
            roles,
            fail_closed: true,
            stats: MembershipStats::default(),
        }
    }

    /// Sets whether failed lookups are cached as denials (`true`) or surfaced
    /// as errors (`false`).
    #[must_use]
    pub fn with_fail_closed(mut self, fail_closed: bool) -> Self {
        self.fail_closed = fail_closed;
        self
    }

    /// Returns the guild this verifier checks.
    #[must_use]
    pub fn guild_id(&self) -> &GuildId {
        &self.guild_id
    }

    /// Returns the verdict counters.
    #[must_use]
    pub fn stats(&self) -> &MembershipStats {
        &self.stats
    }

    /// Decides whether `user_id` may pass the gate.
    ///
    /// # Errors
    ///
    /// Returns `MembershipError::LookupFailed` only when fail-closed is
    /// disabled and the directory lookup fails.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn is_authorized(&self, user_id: &UserId) -> Result<Verdict, MembershipError> {
        match self.cache.get(user_id) {
            CachedVerdict::Authorized => {
                self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
                return Ok(Verdict::Authorized);
            }
            CachedVerdict::Denied => {
                self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
                return Ok(Verdict::Denied);
            }
            CachedVerdict::NotCached => {}
        }

        let member = match self.directory.cached_member(&self.guild_id, user_id) {
            Some(member) => {
                self.stats.snapshot_hits.fetch_add(1, Ordering::Relaxed);
                member
            }
            None => match self.fetch_live(user_id).await? {
                Some(member) => member,
                None => return Ok(Verdict::Denied),
            },
        };

        let verdict = if self.roles.permits(&member.roles) {
            Verdict::Authorized
        } else {
            self.deny(user_id, DenialCause::MissingRole);
            Verdict::Denied
        };

        debug!(?verdict, "Resolved membership verdict");
        self.cache.set(user_id.clone(), verdict);
        Ok(verdict)
    }

    /// Runs the live lookup. `Ok(None)` means a denial was already recorded.
    async fn fetch_live(
        &self,
        user_id: &UserId,
    ) -> Result<Option<GuildMember>, MembershipError> {
        self.stats.live_lookups.fetch_add(1, Ordering::Relaxed);

        match self.directory.fetch_member(&self.guild_id, user_id).await {
            Ok(Some(member)) => Ok(Some(member)),
            Ok(None) => {
                self.deny(user_id, DenialCause::NotMember);
                self.cache.set(user_id.clone(), Verdict::Denied);
                Ok(None)
            }
            Err(report) => {
                warn!(error = %report, "Failed to fetch guild member");
                if !self.fail_closed {
                    self.stats.record_denial(DenialCause::LookupFailed);
                    return Err(MembershipError::LookupFailed {
                        user_id: user_id.clone(),
                        details: report.to_string(),
                    }
                    .into());
                }
                self.deny(user_id, DenialCause::LookupFailed);
                self.cache.set(user_id.clone(), Verdict::Denied);
                Ok(None)
            }
        }
    }

    fn deny(&self, user_id: &UserId, cause: DenialCause) {
        self.stats.record_denial(cause);
        warn!(%user_id, %cause, "User denied access");
    }
}
