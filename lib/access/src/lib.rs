//! Access control for guild-gate.
//!
//! This crate provides:
//! - Per-visitor session state (`GateSession`) with the one-shot OAuth state token
//! - The authorized role policy (`AuthorizedRoles`)
//! - A TTL cache of authorization verdicts (`PermissionCache`)
//! - Guild membership verification (`MembershipVerifier`) over a `GuildDirectory`
//!
//! # Access Control Model
//!
//! A visitor is let through when their identity-provider account is a member
//! of the configured guild and holds at least one of the authorized roles.
//! Verdicts are cached for a fixed window, so role changes take effect once
//! the cached verdict expires.
//!
//! # Example
//!
//! ```
//! use guild_gate_access::{AuthorizedRoles, GateSession};
//! use guild_gate_core::{RoleId, UserId};
//!
//! let member: RoleId = "933382711148695673".parse().unwrap();
//! let roles = AuthorizedRoles::new([member.clone()]);
//! assert!(roles.permits(&[member]));
//!
//! let mut session = GateSession::new();
//! session.begin_login("state-token".to_string());
//! assert!(session.consume_state(Some("state-token")));
//! session.complete_login("42".parse::<UserId>().unwrap());
//! assert!(session.is_authenticated());
//! ```

pub mod cache;
pub mod directory;
pub mod error;
pub mod membership;
pub mod role;
pub mod session;

// Re-export main types at crate root
pub use cache::{CachedVerdict, PermissionCache};
pub use directory::{GuildDirectory, GuildMember};
pub use error::{DirectoryError, MembershipError};
pub use membership::{DenialCause, MembershipStats, MembershipVerifier, StatsSnapshot, Verdict};
pub use role::AuthorizedRoles;
pub use session::GateSession;
