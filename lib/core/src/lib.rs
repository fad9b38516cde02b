//! Core domain types and utilities for guild-gate.
//!
//! This crate provides the identifier types and the shared `Result` alias used
//! by the gateway's library crates and server binary.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{GuildId, ParseIdError, RoleId, UserId};
