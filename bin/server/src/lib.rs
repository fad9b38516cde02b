//! guild-gate web server.
//!
//! This crate provides the HTTP surface of the gateway: the Discord login
//! routes, the encrypted session cookie, the membership gate in front of
//! every other path, and the reverse proxy to the protected backend.

pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod outbound;
pub mod pages;
pub mod proxy;
pub mod telemetry;

#[cfg(test)]
mod testing;
