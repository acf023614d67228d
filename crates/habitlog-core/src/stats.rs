//! Weekly and monthly summaries.
//!
//! The reporting window is anchored to the user's wall clock: "the last 7
//! days" means from the same local time 7 calendar days ago until now, which
//! across a DST change is not exactly 168 hours. The window is converted to
//! UTC once and the repository is queried on `logged_at_utc`. Time-of-day
//! buckets use each record's stored `logged_at_local`, never a recomputed
//! one, so later timezone changes do not move historical records.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Timelike, Utc};
use chrono_tz::Tz;
use habitlog_types::error::HabitError;
use habitlog_types::record::Record;
use habitlog_types::stats::{StatsPeriod, Summary, TimeBucket};
use habitlog_types::user::UserId;

use crate::repository::preference::TimezonePreferenceRepository;
use crate::repository::record::RecordRepository;
use crate::timezone::{TimezoneResolver, to_local, to_utc};

/// All-time figures used for the lifetime logging rates.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Lifetime {
    pub count: u64,
    pub first_logged_at: Option<DateTime<Utc>>,
}

pub struct StatsAggregator<R: RecordRepository, P: TimezonePreferenceRepository> {
    records: R,
    timezones: Arc<TimezoneResolver<P>>,
}

impl<R: RecordRepository, P: TimezonePreferenceRepository> StatsAggregator<R, P> {
    pub fn new(records: R, timezones: Arc<TimezoneResolver<P>>) -> Self {
        Self { records, timezones }
    }

    pub async fn weekly(&self, user_id: UserId, now: DateTime<Utc>) -> Result<Summary, HabitError> {
        self.summary(user_id, StatsPeriod::Week, now).await
    }

    pub async fn monthly(&self, user_id: UserId, now: DateTime<Utc>) -> Result<Summary, HabitError> {
        self.summary(user_id, StatsPeriod::Month, now).await
    }

    /// Fetch the user's records for `period` ending at `now` and summarize them.
    pub async fn summary(
        &self,
        user_id: UserId,
        period: StatsPeriod,
        now: DateTime<Utc>,
    ) -> Result<Summary, HabitError> {
        let tz = self.timezones.resolve(user_id).await?;
        let (start, end) = window(period, now, tz);

        let records = self.records.query_range(user_id, start, end).await?;
        let lifetime = Lifetime {
            count: self.records.count(user_id).await?,
            first_logged_at: self.records.first_logged_at(user_id).await?,
        };

        tracing::debug!(
            %user_id,
            %period,
            timezone = tz.name(),
            records = records.len(),
            "computed summary"
        );

        Ok(summarize(period, tz.name(), (start, end), &records, now, lifetime))
    }
}

/// UTC bounds of `[now_local - period, now_local]` in `tz`.
///
/// If the local start falls into a DST gap, the start is taken as exactly
/// `period` days of elapsed time before `now`.
pub fn window(period: StatsPeriod, now: DateTime<Utc>, tz: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    let span = TimeDelta::days(period.days());
    let local_start = to_local(now, tz).naive_local() - span;
    let start = to_utc(local_start, tz).unwrap_or(now - span);
    (start, now)
}

/// Pure summary of `records` over `window`.
///
/// Zero records yields `count == 0` with every average, the top bucket and
/// the interval fields set to `None`.
pub fn summarize(
    period: StatsPeriod,
    timezone: &str,
    window: (DateTime<Utc>, DateTime<Utc>),
    records: &[Record],
    now: DateTime<Utc>,
    lifetime: Lifetime,
) -> Summary {
    let mut bucket_counts = [0u32; 4];
    for record in records {
        let bucket = TimeBucket::from_hour(record.logged_at_local.hour());
        bucket_counts[bucket.id()] += 1;
    }

    let first = records.iter().map(|r| r.logged_at_utc).min();
    let last = records.iter().map(|r| r.logged_at_utc).max();

    let average_interval_secs = match (first, last) {
        (Some(first), Some(last)) if records.len() > 1 => {
            Some((last - first).num_seconds() / (records.len() as i64 - 1))
        }
        _ => None,
    };

    Summary {
        period,
        timezone: timezone.to_string(),
        window_start_utc: window.0,
        window_end_utc: window.1,
        count: records.len() as u32,
        average_rating: mean(records.iter().map(|r| f64::from(r.rating))),
        average_duration_minutes: mean(records.iter().map(|r| r.duration_minutes)),
        average_amount: mean(records.iter().map(|r| r.amount)),
        top_bucket: top_bucket(&bucket_counts),
        bucket_counts,
        average_interval_secs,
        last_logged_secs_ago: last.map(|last| (now - last).num_seconds()),
        records_per_week: lifetime_rate(lifetime, now, StatsPeriod::Week),
        records_per_month: lifetime_rate(lifetime, now, StatsPeriod::Month),
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0u32), |(sum, n), v| (sum + v, n + 1));
    (n > 0).then(|| sum / f64::from(n))
}

/// Most populated bucket; ties go to the lowest bucket id.
fn top_bucket(counts: &[u32; 4]) -> Option<TimeBucket> {
    let mut best: Option<TimeBucket> = None;
    for bucket in TimeBucket::ALL {
        let count = counts[bucket.id()];
        if count == 0 {
            continue;
        }
        match best {
            Some(current) if counts[current.id()] >= count => {}
            _ => best = Some(bucket),
        }
    }
    best
}

/// Records per `period` since the first ever record, once a full period
/// of history exists.
fn lifetime_rate(lifetime: Lifetime, now: DateTime<Utc>, period: StatsPeriod) -> Option<f64> {
    let first = lifetime.first_logged_at?;
    let elapsed = (now - first).num_seconds();
    let period_secs = TimeDelta::days(period.days()).num_seconds();
    if lifetime.count == 0 || elapsed < period_secs {
        return None;
    }
    Some(lifetime.count as f64 * period_secs as f64 / elapsed as f64)
}
