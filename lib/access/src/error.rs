//! Error types for the access crate.
//!
//! Errors are wrapped in rootcause `Report`s as they cross crate boundaries:
//! - `DirectoryError`: failures talking to the guild directory
//! - `MembershipError`: failures surfaced by the membership verifier

use guild_gate_core::UserId;
use std::fmt;

/// Errors from guild directory lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// The directory could not be reached (connect, TLS, timeout).
    Unreachable { details: String },
    /// The directory answered with an unexpected status code.
    UnexpectedStatus { status: u16 },
    /// The directory response body could not be decoded.
    Decode { details: String },
}

impl fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreachable { details } => {
                write!(f, "guild directory unreachable: {details}")
            }
            Self::UnexpectedStatus { status } => {
                write!(f, "guild directory returned status {status}")
            }
            Self::Decode { details } => {
                write!(f, "failed to decode guild directory response: {details}")
            }
        }
    }
}

impl std::error::Error for DirectoryError {}

/// Errors from membership verification.
///
/// With the default fail-closed policy a failed lookup becomes a denial and
/// never reaches the caller as an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipError {
    /// The member lookup failed and the verifier is not failing closed.
    LookupFailed { user_id: UserId, details: String },
}

impl fmt::Display for MembershipError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LookupFailed { user_id, details } => {
                write!(f, "membership lookup for user {user_id} failed: {details}")
            }
        }
    }
}

impl std::error::Error for MembershipError {}
