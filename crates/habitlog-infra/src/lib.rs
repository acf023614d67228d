//! Infrastructure layer for habitlog.
//!
//! SQLite implementations of the repository traits defined in `habitlog-core`,
//! plus configuration loading and data directory resolution.

pub mod config;
pub mod sqlite;
