//! Record repository trait definition.

use chrono::{DateTime, Utc};
use habitlog_types::error::RepositoryError;
use habitlog_types::record::{NewRecord, Record, RecordId};
use habitlog_types::user::UserId;

/// Durable, append-only store of completed records.
///
/// Implementations live in habitlog-infra (e.g., `SqliteRecordRepository`).
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait RecordRepository: Send + Sync {
    /// Persist a finished record and return its storage id.
    fn append(
        &self,
        record: &NewRecord,
    ) -> impl std::future::Future<Output = Result<RecordId, RepositoryError>> + Send;

    /// Records of `user_id` with `start <= logged_at_utc <= end`,
    /// ordered by `logged_at_utc` ascending.
    fn query_range(
        &self,
        user_id: UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<Vec<Record>, RepositoryError>> + Send;

    /// Total number of records ever logged by `user_id`.
    fn count(
        &self,
        user_id: UserId,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;

    /// UTC instant of the user's oldest record.
    fn first_logged_at(
        &self,
        user_id: UserId,
    ) -> impl std::future::Future<Output = Result<Option<DateTime<Utc>>, RepositoryError>> + Send;
}
