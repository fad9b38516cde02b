//! Shared result alias.
//!
//! Library crates return their domain error enums (`DirectoryError`,
//! `MembershipError`, ...) wrapped in a rootcause [`Report`], so the cause
//! chain survives when an error crosses a crate boundary.

use rootcause::Report;

/// `Result` whose error is a [`Report`] over the context `C`.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;
