//! Shared domain types for habitlog.
//!
//! This crate contains the core domain types used across the workspace:
//! users, in-progress logging sessions, persisted records, statistics
//! summaries, configuration, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod error;
pub mod record;
pub mod session;
pub mod stats;
pub mod user;
