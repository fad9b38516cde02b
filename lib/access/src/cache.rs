//! Time-bounded cache of authorization verdicts.
//!
//! Entries live for a fixed TTL counted from when they were last written;
//! reading an entry never extends it. Expired entries read as a miss and are
//! physically removed by a periodic sweep.

use crate::membership::Verdict;
use chrono::{DateTime, Duration, Utc};
use guild_gate_core::UserId;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::task::JoinHandle;

/// How long a verdict stays valid by default.
pub const DEFAULT_TTL: std::time::Duration = std::time::Duration::from_secs(5 * 60);

/// How often expired verdicts are swept by default.
pub const DEFAULT_SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(10 * 60);

/// Result of a cache lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachedVerdict {
    /// No live verdict for this user.
    NotCached,
    /// A cached grant.
    Authorized,
    /// A cached denial.
    Denied,
}

impl From<Verdict> for CachedVerdict {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Authorized => Self::Authorized,
            Verdict::Denied => Self::Denied,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    verdict: Verdict,
    expires_at: DateTime<Utc>,
}

impl CacheEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Process-wide verdict cache shared by concurrent requests.
///
/// All operations take `&self`; synchronization is internal.
#[derive(Debug)]
pub struct PermissionCache {
    ttl: Duration,
    entries: RwLock<HashMap<UserId, CacheEntry>>,
}

impl PermissionCache {
    /// Creates an empty cache whose entries expire after `ttl`.
    #[must_use]
    pub fn new(ttl: std::time::Duration) -> Self {
        Self {
            ttl: Duration::from_std(ttl).unwrap_or(Duration::MAX),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the configured time-to-live.
    #[must_use]
    pub fn ttl(&self) -> std::time::Duration {
        self.ttl.to_std().unwrap_or_default()
    }

    /// Looks up the verdict for a user.
    #[must_use]
    pub fn get(&self, user_id: &UserId) -> CachedVerdict {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        match entries.get(user_id) {
            Some(entry) if !entry.is_expired(Utc::now()) => entry.verdict.into(),
            _ => CachedVerdict::NotCached,
        }
    }

    /// Stores a verdict, restarting its TTL.
    pub fn set(&self, user_id: UserId, verdict: Verdict) {
        let expires_at = Utc::now()
            .checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(
            user_id,
            CacheEntry {
                verdict,
                expires_at,
            },
        );
    }

    /// Removes expired entries, returning how many were evicted.
    pub fn sweep(&self) -> usize {
        let now = Utc::now();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    /// Returns the number of stored entries, including expired ones not yet swept.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Spawns a task that sweeps the cache every `interval`.
    ///
    /// The task runs until the returned handle is aborted or the runtime stops.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: std::time::Duration) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            loop {
                ticker.tick().await;
                let evicted = cache.sweep();
                if evicted > 0 {
                    tracing::debug!(evicted, "Swept expired permission verdicts");
                }
            }
        })
    }
}

impl Default for PermissionCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}
