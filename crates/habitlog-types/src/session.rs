//! In-progress logging session types.
//!
//! A `Session` lives only in memory. It collects one field per step and is
//! converted into a `NewRecord` once every step has been answered.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

use crate::error::Field;
use crate::record::Consistency;
use crate::user::UserId;

/// Unique identifier for a session, wrapping a UUID v7 (time-sortable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position in the input sequence.
///
/// Variants are declared in their strict forward order, so `Ord` follows
/// the conversation: `AwaitingRating < ... < Complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    AwaitingRating,
    AwaitingDuration,
    AwaitingAmount,
    AwaitingConsistency,
    Complete,
}

impl Step {
    /// The step that follows this one. `Complete` is terminal.
    pub fn next(self) -> Step {
        match self {
            Step::AwaitingRating => Step::AwaitingDuration,
            Step::AwaitingDuration => Step::AwaitingAmount,
            Step::AwaitingAmount => Step::AwaitingConsistency,
            Step::AwaitingConsistency | Step::Complete => Step::Complete,
        }
    }

    /// Field collected at this step, if any.
    pub fn field(self) -> Option<Field> {
        match self {
            Step::AwaitingRating => Some(Field::Rating),
            Step::AwaitingDuration => Some(Field::Duration),
            Step::AwaitingAmount => Some(Field::Amount),
            Step::AwaitingConsistency => Some(Field::Consistency),
            Step::Complete => None,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::AwaitingRating => write!(f, "awaiting_rating"),
            Step::AwaitingDuration => write!(f, "awaiting_duration"),
            Step::AwaitingAmount => write!(f, "awaiting_amount"),
            Step::AwaitingConsistency => write!(f, "awaiting_consistency"),
            Step::Complete => write!(f, "complete"),
        }
    }
}

impl FromStr for Step {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "awaiting_rating" => Ok(Step::AwaitingRating),
            "awaiting_duration" => Ok(Step::AwaitingDuration),
            "awaiting_amount" => Ok(Step::AwaitingAmount),
            "awaiting_consistency" => Ok(Step::AwaitingConsistency),
            "complete" => Ok(Step::Complete),
            other => Err(format!("invalid step: '{other}'")),
        }
    }
}

/// How a session left the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEnd {
    Completed,
    Cancelled,
    Expired,
    /// Replaced by a fresh `start` for the same user.
    Superseded,
}

/// Values collected so far. Only fields of already-completed steps are set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionFields {
    pub rating: Option<u8>,
    pub duration_minutes: Option<f64>,
    pub amount: Option<f64>,
    pub consistency: Option<Consistency>,
}

impl SessionFields {
    /// Whether every field has been collected.
    pub fn is_complete(&self) -> bool {
        self.rating.is_some()
            && self.duration_minutes.is_some()
            && self.amount.is_some()
            && self.consistency.is_some()
    }
}

/// A user's in-progress, multi-step logging input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub user_id: UserId,
    pub step: Step,
    pub fields: SessionFields,
    pub created_at: DateTime<Utc>,
    pub last_touched_at: DateTime<Utc>,
    /// Set while the finished record is being handed to the repository.
    pub finalizing: bool,
}

impl Session {
    /// A fresh session at the first step.
    pub fn new(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id: SessionId::new(),
            user_id,
            step: Step::AwaitingRating,
            fields: SessionFields::default(),
            created_at: now,
            last_touched_at: now,
            finalizing: false,
        }
    }

    /// `now - last_touched_at > ttl`.
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: TimeDelta) -> bool {
        now - self.last_touched_at > ttl
    }
}
