//! Completed habit-log records.
//!
//! A record is built once, when a logging session completes, and is never
//! updated afterwards. `logged_at_local` in particular is stamped with the
//! user's timezone at creation time, so a later timezone change does not
//! rewrite history.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

use crate::user::UserId;

/// Lowest accepted rating.
pub const RATING_MIN: u8 = 1;
/// Highest accepted rating.
pub const RATING_MAX: u8 = 5;

/// Storage-assigned identifier of a persisted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub i64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fixed set of consistency labels a user can pick from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Consistency {
    Watery,
    Thin,
    Medium,
    Thick,
    Sticky,
}

impl Consistency {
    /// All labels, in display order.
    pub const ALL: [Consistency; 5] = [
        Consistency::Watery,
        Consistency::Thin,
        Consistency::Medium,
        Consistency::Thick,
        Consistency::Sticky,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Consistency::Watery => "watery",
            Consistency::Thin => "thin",
            Consistency::Medium => "medium",
            Consistency::Thick => "thick",
            Consistency::Sticky => "sticky",
        }
    }
}

impl fmt::Display for Consistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Consistency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "watery" => Ok(Consistency::Watery),
            "thin" => Ok(Consistency::Thin),
            "medium" => Ok(Consistency::Medium),
            "thick" => Ok(Consistency::Thick),
            "sticky" => Ok(Consistency::Sticky),
            other => Err(format!("invalid consistency: '{other}'")),
        }
    }
}

/// A record that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRecord {
    pub user_id: UserId,
    pub logged_at_utc: DateTime<Utc>,
    /// Timezone identifier used to derive `logged_at_local`.
    pub timezone: String,
    /// Wall-clock time in the user's timezone at the moment of logging.
    pub logged_at_local: DateTime<FixedOffset>,
    pub rating: u8,
    pub duration_minutes: f64,
    pub amount: f64,
    pub consistency: Consistency,
}

impl NewRecord {
    /// Attach the storage-assigned id.
    pub fn with_id(self, id: RecordId) -> Record {
        Record {
            id,
            user_id: self.user_id,
            logged_at_utc: self.logged_at_utc,
            timezone: self.timezone,
            logged_at_local: self.logged_at_local,
            rating: self.rating,
            duration_minutes: self.duration_minutes,
            amount: self.amount,
            consistency: self.consistency,
        }
    }
}

/// A persisted, append-only habit-log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub user_id: UserId,
    pub logged_at_utc: DateTime<Utc>,
    pub timezone: String,
    pub logged_at_local: DateTime<FixedOffset>,
    pub rating: u8,
    pub duration_minutes: f64,
    pub amount: f64,
    pub consistency: Consistency,
}
