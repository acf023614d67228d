//! In-memory repository doubles shared by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use habitlog_types::error::RepositoryError;
use habitlog_types::record::{NewRecord, Record, RecordId};
use habitlog_types::user::UserId;

use crate::repository::preference::TimezonePreferenceRepository;
use crate::repository::record::RecordRepository;

#[derive(Clone, Default)]
pub struct InMemoryPreferences {
    values: Arc<Mutex<HashMap<UserId, String>>>,
    fail: Arc<AtomicBool>,
}

impl InMemoryPreferences {
    pub fn stored(&self, user_id: UserId) -> Option<String> {
        self.values.lock().unwrap().get(&user_id).cloned()
    }

    pub fn insert_raw(&self, user_id: UserId, value: &str) {
        self.values
            .lock()
            .unwrap()
            .insert(user_id, value.to_string());
    }

    pub fn fail_next(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

impl TimezonePreferenceRepository for InMemoryPreferences {
    async fn get(&self, user_id: UserId) -> Result<Option<String>, RepositoryError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(RepositoryError::Connection);
        }
        Ok(self.stored(user_id))
    }

    async fn set(&self, user_id: UserId, timezone: &str) -> Result<(), RepositoryError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(RepositoryError::Connection);
        }
        self.insert_raw(user_id, timezone);
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryRecords {
    records: Arc<Mutex<Vec<Record>>>,
    next_id: Arc<AtomicI64>,
    fail: Arc<AtomicBool>,
    append_calls: Arc<AtomicU64>,
    append_delay_ms: Arc<AtomicU64>,
}

impl InMemoryRecords {
    pub fn all(&self) -> Vec<Record> {
        self.records.lock().unwrap().clone()
    }

    pub fn push(&self, record: NewRecord) -> RecordId {
        let id = RecordId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.records.lock().unwrap().push(record.with_id(id));
        id
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn set_append_delay(&self, delay: Duration) {
        self.append_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn append_calls(&self) -> u64 {
        self.append_calls.load(Ordering::SeqCst)
    }
}

impl RecordRepository for InMemoryRecords {
    async fn append(&self, record: &NewRecord) -> Result<RecordId, RepositoryError> {
        self.append_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.append_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(RepositoryError::Connection);
        }
        Ok(self.push(record.clone()))
    }

    async fn query_range(
        &self,
        user_id: UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Record>, RepositoryError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(RepositoryError::Connection);
        }
        let mut found: Vec<Record> = self
            .all()
            .into_iter()
            .filter(|r| r.user_id == user_id && r.logged_at_utc >= start && r.logged_at_utc <= end)
            .collect();
        found.sort_by_key(|r| r.logged_at_utc);
        Ok(found)
    }

    async fn count(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        Ok(self.all().iter().filter(|r| r.user_id == user_id).count() as u64)
    }

    async fn first_logged_at(
        &self,
        user_id: UserId,
    ) -> Result<Option<DateTime<Utc>>, RepositoryError> {
        Ok(self
            .all()
            .iter()
            .filter(|r| r.user_id == user_id)
            .map(|r| r.logged_at_utc)
            .min())
    }
}
