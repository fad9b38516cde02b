//! Discord guild directory for guild-gate.
//!
//! This crate talks to the Discord REST API with a bot token to look up guild
//! members and their roles. A background task can page through the member list
//! into a local roster snapshot, which answers cache misses while it is fresh.

mod client;
mod roster;
mod types;

pub use client::DiscordDirectory;
pub use roster::RosterSnapshot;
pub use types::{MemberPayload, UserPayload};
