//! Business logic and repository trait definitions for habitlog.
//!
//! This crate defines the "ports" (repository traits) that the infrastructure
//! layer implements, plus the in-memory session machinery and the statistics
//! engine. It depends only on `habitlog-types` -- never on `habitlog-infra`
//! or any database/IO crate.

pub mod clock;
pub mod conversation;
pub mod repository;
pub mod session;
pub mod stats;
pub mod timezone;

#[cfg(test)]
pub(crate) mod testing;
