//! Runtime configuration types for habitlog.
//!
//! `HabitlogConfig` represents the `config.toml` in the data directory. Every
//! field has a default, so an empty file (or no file) is a valid config.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// What `start` does when the user already has a live session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestartPolicy {
    /// Discard the running session and start fresh.
    #[default]
    Replace,
    /// Refuse with `SessionAlreadyActive`.
    Reject,
}

impl fmt::Display for RestartPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestartPolicy::Replace => write!(f, "replace"),
            RestartPolicy::Reject => write!(f, "reject"),
        }
    }
}

impl FromStr for RestartPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "replace" => Ok(RestartPolicy::Replace),
            "reject" => Ok(RestartPolicy::Reject),
            other => Err(format!("invalid restart policy: '{other}'")),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitlogConfig {
    /// Idle minutes before a session counts as expired.
    #[serde(default = "default_session_ttl_minutes")]
    pub session_ttl_minutes: u64,

    /// Minutes between reaper sweeps.
    #[serde(default = "default_session_cleanup_minutes")]
    pub session_cleanup_minutes: u64,

    /// Timezone used for users who never picked one.
    #[serde(default = "default_timezone")]
    pub default_timezone: String,

    #[serde(default)]
    pub restart_policy: RestartPolicy,
}

fn default_session_ttl_minutes() -> u64 {
    30
}

fn default_session_cleanup_minutes() -> u64 {
    5
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl HabitlogConfig {
    /// Session TTL, never shorter than one minute.
    pub fn session_ttl(&self) -> TimeDelta {
        TimeDelta::minutes(self.session_ttl_minutes.max(1) as i64)
    }

    /// Reaper interval, never shorter than one minute.
    pub fn cleanup_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.session_cleanup_minutes.max(1) * 60)
    }
}

impl Default for HabitlogConfig {
    fn default() -> Self {
        Self {
            session_ttl_minutes: default_session_ttl_minutes(),
            session_cleanup_minutes: default_session_cleanup_minutes(),
            default_timezone: default_timezone(),
            restart_policy: RestartPolicy::default(),
        }
    }
}
