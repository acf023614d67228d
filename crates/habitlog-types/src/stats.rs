//! Statistics summary types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// Reporting period of a summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatsPeriod {
    Week,
    Month,
}

impl StatsPeriod {
    /// Length of the period in local calendar days.
    pub fn days(self) -> i64 {
        match self {
            StatsPeriod::Week => 7,
            StatsPeriod::Month => 30,
        }
    }
}

impl fmt::Display for StatsPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatsPeriod::Week => write!(f, "week"),
            StatsPeriod::Month => write!(f, "month"),
        }
    }
}

impl FromStr for StatsPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "week" | "weekly" => Ok(StatsPeriod::Week),
            "month" | "monthly" => Ok(StatsPeriod::Month),
            other => Err(format!("invalid stats period: '{other}'")),
        }
    }
}

/// Fixed six-hour subdivision of the local day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeBucket {
    /// 00:00 - 05:59
    Night,
    /// 06:00 - 11:59
    Morning,
    /// 12:00 - 17:59
    Afternoon,
    /// 18:00 - 23:59
    Evening,
}

impl TimeBucket {
    /// All buckets ordered by id.
    pub const ALL: [TimeBucket; 4] = [
        TimeBucket::Night,
        TimeBucket::Morning,
        TimeBucket::Afternoon,
        TimeBucket::Evening,
    ];

    /// Bucket containing a local hour (0-23). Hours past 23 fall into `Evening`.
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            0..=5 => TimeBucket::Night,
            6..=11 => TimeBucket::Morning,
            12..=17 => TimeBucket::Afternoon,
            _ => TimeBucket::Evening,
        }
    }

    /// Stable bucket id, 0-3.
    pub fn id(self) -> usize {
        self as usize
    }

    /// Hour range covered, as `"00-06"`.
    pub fn hours(self) -> &'static str {
        match self {
            TimeBucket::Night => "00-06",
            TimeBucket::Morning => "06-12",
            TimeBucket::Afternoon => "12-18",
            TimeBucket::Evening => "18-24",
        }
    }
}

impl fmt::Display for TimeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeBucket::Night => write!(f, "night"),
            TimeBucket::Morning => write!(f, "morning"),
            TimeBucket::Afternoon => write!(f, "afternoon"),
            TimeBucket::Evening => write!(f, "evening"),
        }
    }
}

/// Aggregated statistics for one user over one reporting window.
///
/// With zero records every `Option` field is `None`; nothing is divided by zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub period: StatsPeriod,
    /// Timezone the window was anchored to.
    pub timezone: String,
    pub window_start_utc: DateTime<Utc>,
    pub window_end_utc: DateTime<Utc>,
    pub count: u32,
    pub average_rating: Option<f64>,
    pub average_duration_minutes: Option<f64>,
    pub average_amount: Option<f64>,
    /// Most frequent time-of-day bucket; ties go to the lowest bucket id.
    pub top_bucket: Option<TimeBucket>,
    /// Record count per bucket, indexed by `TimeBucket::id`.
    pub bucket_counts: [u32; 4],
    /// Mean gap between consecutive records in the window, in seconds.
    pub average_interval_secs: Option<i64>,
    /// Seconds elapsed since the newest record in the window.
    pub last_logged_secs_ago: Option<i64>,
    /// Lifetime records per 7 days, once at least 7 days of history exist.
    pub records_per_week: Option<f64>,
    /// Lifetime records per 30 days, once at least 30 days of history exist.
    pub records_per_month: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_boundaries() {
        assert_eq!(TimeBucket::from_hour(0), TimeBucket::Night);
        assert_eq!(TimeBucket::from_hour(5), TimeBucket::Night);
        assert_eq!(TimeBucket::from_hour(6), TimeBucket::Morning);
        assert_eq!(TimeBucket::from_hour(11), TimeBucket::Morning);
        assert_eq!(TimeBucket::from_hour(12), TimeBucket::Afternoon);
        assert_eq!(TimeBucket::from_hour(17), TimeBucket::Afternoon);
        assert_eq!(TimeBucket::from_hour(18), TimeBucket::Evening);
        assert_eq!(TimeBucket::from_hour(23), TimeBucket::Evening);
    }

    #[test]
    fn test_bucket_ids_match_order() {
        for (i, bucket) in TimeBucket::ALL.iter().enumerate() {
            assert_eq!(bucket.id(), i);
        }
    }

    #[test]
    fn test_period_parse() {
        assert_eq!("weekly".parse::<StatsPeriod>(), Ok(StatsPeriod::Week));
        assert_eq!("Month".parse::<StatsPeriod>(), Ok(StatsPeriod::Month));
        assert!("year".parse::<StatsPeriod>().is_err());
        assert_eq!(StatsPeriod::Week.days(), 7);
        assert_eq!(StatsPeriod::Month.days(), 30);
    }
}
