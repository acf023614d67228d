//! Multi-step logging conversation.
//!
//! `ConversationService` drives a user's session through
//! `AwaitingRating -> AwaitingDuration -> AwaitingAmount -> AwaitingConsistency -> Complete`.
//! Every mutation goes through `SessionStore::update`, so the store's per-key
//! atomicity is what serializes concurrent inputs for one user.
//!
//! Completion is two-phase. The step that reaches `Complete` marks the
//! session `finalizing` and returns a snapshot; the record is then appended
//! with no store lock held. Only after the repository acknowledges the
//! append is the session removed. On failure the session is released back
//! to `Complete` so the next `submit` retries the append without redoing
//! any step.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use habitlog_types::config::RestartPolicy;
use habitlog_types::error::{Field, HabitError};
use habitlog_types::record::{Consistency, NewRecord, RATING_MAX, RATING_MIN, Record};
use habitlog_types::session::{Session, SessionEnd, SessionId, Step};
use habitlog_types::user::UserId;

use crate::repository::preference::TimezonePreferenceRepository;
use crate::repository::record::RecordRepository;
use crate::session::SessionStore;
use crate::timezone::{TimezoneResolver, to_local};

/// Result of a successful `submit`.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// The input was stored; the session now waits at `step`.
    Advanced { step: Step },
    /// The last input was stored and the record persisted.
    Completed { record: Record },
}

/// What `submit` decided to do while holding the session entry.
enum Transition {
    Advanced(Step),
    Commit(Session),
}

/// The logging state machine.
pub struct ConversationService<R: RecordRepository, P: TimezonePreferenceRepository> {
    store: SessionStore,
    records: R,
    timezones: Arc<TimezoneResolver<P>>,
    restart_policy: RestartPolicy,
}

impl<R: RecordRepository, P: TimezonePreferenceRepository> ConversationService<R, P> {
    pub fn new(
        store: SessionStore,
        records: R,
        timezones: Arc<TimezoneResolver<P>>,
        restart_policy: RestartPolicy,
    ) -> Self {
        Self {
            store,
            records,
            timezones,
            restart_policy,
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn restart_policy(&self) -> RestartPolicy {
        self.restart_policy
    }

    /// Begin a new session at `AwaitingRating`.
    ///
    /// Under `RestartPolicy::Replace` a live session is discarded; under
    /// `Reject` it causes `SessionAlreadyActive`. A session whose record is
    /// being persisted is never discarded (`CommitInProgress`).
    pub fn start(&self, user_id: UserId) -> Result<Session, HabitError> {
        let session = match self.restart_policy {
            RestartPolicy::Replace => {
                let (session, previous) = self.store.replace(user_id)?;
                if let Some(previous) = previous {
                    tracing::info!(
                        %user_id,
                        session_id = %previous.id,
                        step = %previous.step,
                        end = ?SessionEnd::Superseded,
                        "session ended"
                    );
                }
                session
            }
            RestartPolicy::Reject => self.store.create_if_absent(user_id)?,
        };

        tracing::info!(%user_id, session_id = %session.id, "session started");
        Ok(session)
    }

    /// Feed one raw input to the user's session.
    ///
    /// Validation failures leave the session untouched at the same step.
    /// When the session is already at `Complete` (a previous append failed),
    /// `raw` is ignored and the append is retried.
    pub async fn submit(&self, user_id: UserId, raw: &str) -> Result<StepOutcome, HabitError> {
        let now = self.store.now();

        let transition = self.store.update(user_id, |session| {
            if session.finalizing {
                return Err(HabitError::CommitInProgress);
            }
            if session.step != Step::Complete {
                apply_input(session, raw)?;
            }
            if session.step == Step::Complete {
                session.finalizing = true;
                Ok(Transition::Commit(session.clone()))
            } else {
                Ok(Transition::Advanced(session.step))
            }
        });

        match transition {
            Ok(Transition::Advanced(step)) => {
                tracing::debug!(%user_id, %step, "session advanced");
                Ok(StepOutcome::Advanced { step })
            }
            Ok(Transition::Commit(session)) => self.commit(session, now).await,
            Err(err) => {
                if let HabitError::ValidationFailed { field, reason } = &err {
                    tracing::debug!(%user_id, %field, %reason, "input rejected");
                }
                Err(err)
            }
        }
    }

    /// Drop the user's session.
    ///
    /// Fails with `NoActiveSession` when there is nothing live to cancel and
    /// with `CommitInProgress` while its record is being persisted.
    pub fn cancel(&self, user_id: UserId) -> Result<Session, HabitError> {
        let now = self.store.now();
        let ttl = self.store.ttl();
        let mut committing = false;

        let removed = self.store.remove_if(user_id, |session| {
            if session.finalizing && !session.is_expired(now, ttl) {
                committing = true;
                return false;
            }
            true
        });

        match removed {
            Some(session) if !session.is_expired(now, ttl) => {
                tracing::info!(
                    %user_id,
                    session_id = %session.id,
                    step = %session.step,
                    end = ?SessionEnd::Cancelled,
                    "session ended"
                );
                Ok(session)
            }
            Some(_) => Err(HabitError::NoActiveSession),
            None if committing => Err(HabitError::CommitInProgress),
            None => Err(HabitError::NoActiveSession),
        }
    }

    /// Snapshot of the user's live session.
    pub fn current(&self, user_id: UserId) -> Option<Session> {
        self.store.get(user_id)
    }

    async fn commit(&self, session: Session, now: DateTime<Utc>) -> Result<StepOutcome, HabitError> {
        let user_id = session.user_id;
        let mut guard = FinalizeGuard::new(&self.store, user_id, session.id);

        match self.persist(&session, now).await {
            Ok(record) => {
                guard.disarm();
                self.store.remove_if_current(user_id, session.id);
                tracing::info!(
                    %user_id,
                    session_id = %session.id,
                    record_id = %record.id,
                    end = ?SessionEnd::Completed,
                    "session ended"
                );
                Ok(StepOutcome::Completed { record })
            }
            Err(err) => {
                tracing::warn!(
                    %user_id,
                    session_id = %session.id,
                    error = %err,
                    "record commit failed, session kept for retry"
                );
                Err(err)
            }
        }
    }

    async fn persist(&self, session: &Session, now: DateTime<Utc>) -> Result<Record, HabitError> {
        let tz = self.timezones.resolve(session.user_id).await?;
        let record = build_record(session, now, tz)?;
        let id = self.records.append(&record).await?;
        Ok(record.with_id(id))
    }
}

/// Clears `finalizing` on drop unless disarmed.
///
/// Covers both a failed append and a commit future that is dropped
/// mid-flight (e.g. a disconnected HTTP client).
struct FinalizeGuard<'a> {
    store: &'a SessionStore,
    user_id: UserId,
    session_id: SessionId,
    armed: bool,
}

impl<'a> FinalizeGuard<'a> {
    fn new(store: &'a SessionStore, user_id: UserId, session_id: SessionId) -> Self {
        Self {
            store,
            user_id,
            session_id,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for FinalizeGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let session_id = self.session_id;
        // A replaced or expired session has nothing to release.
        let _ = self.store.update(self.user_id, |session| {
            if session.id == session_id {
                session.finalizing = false;
            }
            Ok(())
        });
    }
}

/// Validate `raw` for the session's current step, store it and advance.
fn apply_input(session: &mut Session, raw: &str) -> Result<(), HabitError> {
    let input = raw.trim();
    match session.step {
        Step::AwaitingRating => session.fields.rating = Some(parse_rating(input)?),
        Step::AwaitingDuration => {
            session.fields.duration_minutes = Some(parse_positive(Field::Duration, input)?)
        }
        Step::AwaitingAmount => session.fields.amount = Some(parse_positive(Field::Amount, input)?),
        Step::AwaitingConsistency => session.fields.consistency = Some(parse_consistency(input)?),
        Step::Complete => return Ok(()),
    }
    session.step = session.step.next();
    Ok(())
}

fn invalid(field: Field, reason: impl Into<String>) -> HabitError {
    HabitError::ValidationFailed {
        field,
        reason: reason.into(),
    }
}

fn parse_rating(input: &str) -> Result<u8, HabitError> {
    let value: i64 = input
        .parse()
        .map_err(|_| invalid(Field::Rating, "must be a whole number"))?;
    if !(i64::from(RATING_MIN)..=i64::from(RATING_MAX)).contains(&value) {
        return Err(invalid(
            Field::Rating,
            format!("must be between {RATING_MIN} and {RATING_MAX}"),
        ));
    }
    Ok(value as u8)
}

fn parse_positive(field: Field, input: &str) -> Result<f64, HabitError> {
    let value: f64 = input
        .parse()
        .map_err(|_| invalid(field, "must be a number"))?;
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid(field, "must be a positive number"));
    }
    Ok(value)
}

fn parse_consistency(input: &str) -> Result<Consistency, HabitError> {
    input.parse().map_err(|_| {
        let labels: Vec<&str> = Consistency::ALL.iter().map(|c| c.as_str()).collect();
        invalid(
            Field::Consistency,
            format!("must be one of: {}", labels.join(", ")),
        )
    })
}

/// Stamp a complete session as a record at `now` in `tz`.
fn build_record(session: &Session, now: DateTime<Utc>, tz: Tz) -> Result<NewRecord, HabitError> {
    let missing = |field: Field| invalid(field, "not collected");
    let fields = &session.fields;

    Ok(NewRecord {
        user_id: session.user_id,
        logged_at_utc: now,
        timezone: tz.name().to_string(),
        logged_at_local: to_local(now, tz).fixed_offset(),
        rating: fields.rating.ok_or_else(|| missing(Field::Rating))?,
        duration_minutes: fields
            .duration_minutes
            .ok_or_else(|| missing(Field::Duration))?,
        amount: fields.amount.ok_or_else(|| missing(Field::Amount))?,
        consistency: fields
            .consistency
            .ok_or_else(|| missing(Field::Consistency))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::testing::{InMemoryPreferences, InMemoryRecords};
    use chrono::{NaiveDate, TimeDelta, TimeZone};
    use std::time::Duration;

    struct Harness {
        service: ConversationService<InMemoryRecords, InMemoryPreferences>,
        records: InMemoryRecords,
        preferences: InMemoryPreferences,
        clock: Arc<ManualClock>,
    }

    fn harness(policy: RestartPolicy) -> Harness {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 1, 10, 15, 0, 0).unwrap(),
        ));
        let store = SessionStore::new(clock.clone(), TimeDelta::minutes(30));
        let records = InMemoryRecords::default();
        let preferences = InMemoryPreferences::default();
        let resolver = Arc::new(TimezoneResolver::new(preferences.clone(), Tz::UTC));
        let service = ConversationService::new(store, records.clone(), resolver, policy);
        Harness {
            service,
            records,
            preferences,
            clock,
        }
    }

    async fn submit_all(h: &Harness, user: UserId, inputs: &[&str]) -> Vec<StepOutcome> {
        let mut outcomes = Vec::new();
        for input in inputs {
            outcomes.push(h.service.submit(user, input).await.unwrap());
        }
        outcomes
    }

    fn step_of(outcome: &StepOutcome) -> Step {
        match outcome {
            StepOutcome::Advanced { step } => *step,
            StepOutcome::Completed { .. } => Step::Complete,
        }
    }

    #[tokio::test]
    async fn full_sequence_produces_one_record() {
        let h = harness(RestartPolicy::Replace);
        let user = UserId(1);
        let session = h.service.start(user).unwrap();
        assert_eq!(session.step, Step::AwaitingRating);

        let outcomes = submit_all(&h, user, &["3", "12.5", "1.5", "medium"]).await;
        let steps: Vec<Step> = outcomes.iter().map(step_of).collect();
        assert_eq!(
            steps,
            vec![
                Step::AwaitingDuration,
                Step::AwaitingAmount,
                Step::AwaitingConsistency,
                Step::Complete,
            ]
        );

        let StepOutcome::Completed { record } = outcomes.last().unwrap() else {
            panic!("expected completion");
        };
        assert_eq!(record.rating, 3);
        assert_eq!(record.duration_minutes, 12.5);
        assert_eq!(record.amount, 1.5);
        assert_eq!(record.consistency, Consistency::Medium);
        assert_eq!(h.records.all(), vec![record.clone()]);
        assert!(h.service.current(user).is_none(), "session removed after commit");
    }

    #[tokio::test]
    async fn out_of_range_rating_keeps_step() {
        let h = harness(RestartPolicy::Replace);
        let user = UserId(1);
        h.service.start(user).unwrap();

        for bad in ["0", "6", "-1", "four", "3.5", ""] {
            let err = h.service.submit(user, bad).await.unwrap_err();
            assert!(
                matches!(err, HabitError::ValidationFailed { field: Field::Rating, .. }),
                "input {bad:?} gave {err:?}"
            );
        }
        let session = h.service.current(user).unwrap();
        assert_eq!(session.step, Step::AwaitingRating);
        assert_eq!(session.fields.rating, None);
    }

    #[tokio::test]
    async fn non_positive_duration_and_amount_are_rejected() {
        let h = harness(RestartPolicy::Replace);
        let user = UserId(1);
        h.service.start(user).unwrap();
        submit_all(&h, user, &["5"]).await;

        for bad in ["0", "-3", "abc", "inf", "NaN"] {
            let err = h.service.submit(user, bad).await.unwrap_err();
            assert!(matches!(
                err,
                HabitError::ValidationFailed { field: Field::Duration, .. }
            ));
        }
        submit_all(&h, user, &["10"]).await;

        let err = h.service.submit(user, "0").await.unwrap_err();
        assert!(matches!(
            err,
            HabitError::ValidationFailed { field: Field::Amount, .. }
        ));

        let session = h.service.current(user).unwrap();
        assert_eq!(session.step, Step::AwaitingAmount);
        assert_eq!(session.fields.duration_minutes, Some(10.0));
    }

    #[tokio::test]
    async fn unknown_consistency_label_is_rejected() {
        let h = harness(RestartPolicy::Replace);
        let user = UserId(1);
        h.service.start(user).unwrap();
        submit_all(&h, user, &["2", "5", "1"]).await;

        let err = h.service.submit(user, "chunky").await.unwrap_err();
        let HabitError::ValidationFailed { field, reason } = err else {
            panic!("expected validation failure");
        };
        assert_eq!(field, Field::Consistency);
        assert!(reason.contains("thick"));
        assert!(h.records.all().is_empty());
    }

    #[tokio::test]
    async fn submit_without_session_fails() {
        let h = harness(RestartPolicy::Replace);
        let err = h.service.submit(UserId(5), "3").await.unwrap_err();
        assert!(matches!(err, HabitError::NoActiveSession));
    }

    #[tokio::test]
    async fn expired_session_is_absent_without_reaper() {
        let h = harness(RestartPolicy::Replace);
        let user = UserId(1);
        h.service.start(user).unwrap();
        submit_all(&h, user, &["4"]).await;

        h.clock.advance(TimeDelta::minutes(31));
        let err = h.service.submit(user, "10").await.unwrap_err();
        assert!(matches!(err, HabitError::NoActiveSession));
        assert!(h.service.current(user).is_none());
    }

    #[tokio::test]
    async fn second_start_discards_first_session() {
        let h = harness(RestartPolicy::Replace);
        let user = UserId(1);
        let first = h.service.start(user).unwrap();
        submit_all(&h, user, &["1", "99"]).await;

        let second = h.service.start(user).unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(h.service.current(user).unwrap().step, Step::AwaitingRating);

        submit_all(&h, user, &["5", "7", "3", "thin"]).await;
        let records = h.records.all();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].rating, 5);
        assert_eq!(records[0].duration_minutes, 7.0);
    }

    #[tokio::test]
    async fn reject_policy_refuses_second_start() {
        let h = harness(RestartPolicy::Reject);
        let user = UserId(1);
        h.service.start(user).unwrap();
        assert!(matches!(
            h.service.start(user),
            Err(HabitError::SessionAlreadyActive)
        ));

        h.clock.advance(TimeDelta::minutes(31));
        assert!(h.service.start(user).is_ok(), "expired session does not block");
    }

    #[tokio::test]
    async fn storage_failure_keeps_session_for_retry() {
        let h = harness(RestartPolicy::Replace);
        let user = UserId(1);
        h.service.start(user).unwrap();
        submit_all(&h, user, &["4", "20", "2"]).await;

        h.records.set_failing(true);
        let err = h.service.submit(user, "sticky").await.unwrap_err();
        assert!(matches!(err, HabitError::StorageUnavailable(_)));

        let session = h.service.current(user).unwrap();
        assert_eq!(session.step, Step::Complete);
        assert!(!session.finalizing);
        assert_eq!(session.fields.consistency, Some(Consistency::Sticky));

        h.records.set_failing(false);
        let outcome = h.service.submit(user, "ignored").await.unwrap();
        let StepOutcome::Completed { record } = outcome else {
            panic!("expected completion on retry");
        };
        assert_eq!(record.consistency, Consistency::Sticky);
        assert_eq!(h.records.all().len(), 1);
        assert_eq!(h.records.append_calls(), 2);
        assert!(h.service.current(user).is_none());
    }

    #[tokio::test]
    async fn timezone_lookup_failure_keeps_session() {
        let h = harness(RestartPolicy::Replace);
        let user = UserId(1);
        h.service.start(user).unwrap();
        submit_all(&h, user, &["4", "20", "2"]).await;

        h.preferences.fail_next(true);
        let err = h.service.submit(user, "thin").await.unwrap_err();
        assert!(matches!(err, HabitError::StorageUnavailable(_)));
        assert_eq!(h.records.append_calls(), 0);
        assert!(!h.service.current(user).unwrap().finalizing);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_final_submits_commit_once() {
        let h = harness(RestartPolicy::Replace);
        let user = UserId(1);
        h.service.start(user).unwrap();
        submit_all(&h, user, &["4", "20", "2"]).await;
        h.records.set_append_delay(Duration::from_millis(500));

        let (a, b) = tokio::join!(
            h.service.submit(user, "thick"),
            h.service.submit(user, "thick"),
        );

        assert!(matches!(a, Ok(StepOutcome::Completed { .. })));
        assert!(matches!(b, Err(HabitError::CommitInProgress)));
        assert_eq!(h.records.all().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_commit_is_refused() {
        let h = harness(RestartPolicy::Replace);
        let user = UserId(1);
        h.service.start(user).unwrap();
        submit_all(&h, user, &["4", "20", "2"]).await;
        h.records.set_append_delay(Duration::from_millis(500));

        let (committed, cancelled) = tokio::join!(h.service.submit(user, "thick"), async {
            tokio::task::yield_now().await;
            h.service.cancel(user)
        });

        assert!(matches!(committed, Ok(StepOutcome::Completed { .. })));
        assert!(matches!(cancelled, Err(HabitError::CommitInProgress)));
    }

    #[tokio::test(start_paused = true)]
    async fn start_during_failing_commit_keeps_session_for_retry() {
        let h = harness(RestartPolicy::Replace);
        let user = UserId(1);
        h.service.start(user).unwrap();
        submit_all(&h, user, &["4", "20", "2"]).await;
        h.records.set_append_delay(Duration::from_millis(500));
        h.records.set_failing(true);

        let (committed, restarted) = tokio::join!(h.service.submit(user, "thick"), async {
            tokio::task::yield_now().await;
            h.service.start(user)
        });

        assert!(matches!(committed, Err(HabitError::StorageUnavailable(_))));
        assert!(matches!(restarted, Err(HabitError::CommitInProgress)));

        let session = h.service.current(user).unwrap();
        assert_eq!(session.step, Step::Complete);
        assert_eq!(session.fields.consistency, Some(Consistency::Thick));

        h.records.set_failing(false);
        h.records.set_append_delay(Duration::ZERO);
        let outcome = h.service.submit(user, "ignored").await.unwrap();
        assert!(matches!(outcome, StepOutcome::Completed { .. }));
        assert_eq!(h.records.all().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_commit_releases_session() {
        let h = harness(RestartPolicy::Replace);
        let user = UserId(1);
        h.service.start(user).unwrap();
        submit_all(&h, user, &["4", "20", "2"]).await;
        h.records.set_append_delay(Duration::from_secs(60));

        let timed_out =
            tokio::time::timeout(Duration::from_secs(1), h.service.submit(user, "thick")).await;
        assert!(timed_out.is_err());

        let session = h.service.current(user).unwrap();
        assert_eq!(session.step, Step::Complete);
        assert!(!session.finalizing);
    }

    #[tokio::test]
    async fn record_is_stamped_in_user_timezone() {
        let h = harness(RestartPolicy::Replace);
        let user = UserId(42);
        h.preferences.insert_raw(user, "Etc/GMT-9");

        h.service.start(user).unwrap();
        let outcomes = submit_all(&h, user, &["4", "15", "2", "thick"]).await;
        let StepOutcome::Completed { record } = outcomes.last().unwrap() else {
            panic!("expected completion");
        };

        assert_eq!(
            record.logged_at_utc,
            Utc.with_ymd_and_hms(2024, 1, 10, 15, 0, 0).unwrap()
        );
        assert_eq!(
            record.logged_at_local.naive_local(),
            NaiveDate::from_ymd_opt(2024, 1, 11)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );
        assert_eq!(record.logged_at_local.offset().local_minus_utc(), 9 * 3600);
        assert_eq!(record.timezone, "Etc/GMT-9");
    }

    #[tokio::test]
    async fn cancel_removes_session_once() {
        let h = harness(RestartPolicy::Replace);
        let user = UserId(1);
        h.service.start(user).unwrap();
        submit_all(&h, user, &["2"]).await;

        let cancelled = h.service.cancel(user).unwrap();
        assert_eq!(cancelled.fields.rating, Some(2));
        assert!(matches!(
            h.service.cancel(user),
            Err(HabitError::NoActiveSession)
        ));
        assert!(matches!(
            h.service.submit(user, "10").await,
            Err(HabitError::NoActiveSession)
        ));
    }

    #[tokio::test]
    async fn cancel_of_expired_session_reports_absent() {
        let h = harness(RestartPolicy::Replace);
        let user = UserId(1);
        h.service.start(user).unwrap();
        h.clock.advance(TimeDelta::hours(2));
        assert!(matches!(
            h.service.cancel(user),
            Err(HabitError::NoActiveSession)
        ));
        assert!(h.service.store().is_empty());
    }

    #[tokio::test]
    async fn submit_after_completion_needs_new_start() {
        let h = harness(RestartPolicy::Replace);
        let user = UserId(1);
        h.service.start(user).unwrap();
        submit_all(&h, user, &["4", "15", "2", "watery"]).await;

        assert!(matches!(
            h.service.submit(user, "3").await,
            Err(HabitError::NoActiveSession)
        ));
        assert_eq!(h.records.all().len(), 1);
    }

    #[tokio::test]
    async fn users_do_not_interfere() {
        let h = harness(RestartPolicy::Replace);
        h.service.start(UserId(1)).unwrap();
        h.service.start(UserId(2)).unwrap();

        submit_all(&h, UserId(1), &["1", "2"]).await;
        submit_all(&h, UserId(2), &["5"]).await;

        assert_eq!(h.service.current(UserId(1)).unwrap().step, Step::AwaitingAmount);
        assert_eq!(h.service.current(UserId(2)).unwrap().step, Step::AwaitingDuration);
    }
}
