//! SQLite record repository implementation.
//!
//! Implements `RecordRepository` from `habitlog-core`. Rows are only ever
//! inserted; there is no update or delete path.

use chrono::Utc;
use habitlog_core::repository::record::RecordRepository;
use habitlog_types::error::RepositoryError;
use habitlog_types::record::{NewRecord, Record, RecordId};
use habitlog_types::user::UserId;
use sqlx::Row;

use super::pool::DatabasePool;
use super::{format_utc, map_sqlx, parse_local, parse_utc};

/// SQLite-backed implementation of `RecordRepository`.
#[derive(Clone)]
pub struct SqliteRecordRepository {
    pool: DatabasePool,
}

impl SqliteRecordRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Private Row type for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct RecordRow {
    id: i64,
    user_id: i64,
    timestamp_utc: String,
    timezone: String,
    timestamp_local: String,
    rating: i64,
    duration_minutes: f64,
    amount: f64,
    consistency: String,
}

impl RecordRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            timestamp_utc: row.try_get("timestamp_utc")?,
            timezone: row.try_get("timezone")?,
            timestamp_local: row.try_get("timestamp_local")?,
            rating: row.try_get("rating")?,
            duration_minutes: row.try_get("duration_minutes")?,
            amount: row.try_get("amount")?,
            consistency: row.try_get("consistency")?,
        })
    }

    fn into_record(self) -> Result<Record, RepositoryError> {
        let rating = u8::try_from(self.rating)
            .map_err(|_| RepositoryError::Query(format!("invalid rating: {}", self.rating)))?;
        let consistency = self.consistency.parse().map_err(RepositoryError::Query)?;

        Ok(Record {
            id: RecordId(self.id),
            user_id: UserId(self.user_id),
            logged_at_utc: parse_utc(&self.timestamp_utc)?,
            timezone: self.timezone,
            logged_at_local: parse_local(&self.timestamp_local)?,
            rating,
            duration_minutes: self.duration_minutes,
            amount: self.amount,
            consistency,
        })
    }
}

// ---------------------------------------------------------------------------
// RecordRepository implementation
// ---------------------------------------------------------------------------

impl RecordRepository for SqliteRecordRepository {
    async fn append(&self, record: &NewRecord) -> Result<RecordId, RepositoryError> {
        let result = sqlx::query(
            r#"INSERT INTO records (user_id, timestamp_utc, timezone, timestamp_local,
                                   rating, duration_minutes, amount, consistency, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(record.user_id.0)
        .bind(format_utc(&record.logged_at_utc))
        .bind(&record.timezone)
        .bind(record.logged_at_local.to_rfc3339())
        .bind(i64::from(record.rating))
        .bind(record.duration_minutes)
        .bind(record.amount)
        .bind(record.consistency.as_str())
        .bind(format_utc(&Utc::now()))
        .execute(&self.pool.writer)
        .await
        .map_err(map_sqlx)?;

        Ok(RecordId(result.last_insert_rowid()))
    }

    async fn query_range(
        &self,
        user_id: UserId,
        start: chrono::DateTime<Utc>,
        end: chrono::DateTime<Utc>,
    ) -> Result<Vec<Record>, RepositoryError> {
        let rows = sqlx::query(
            r#"SELECT * FROM records
               WHERE user_id = ? AND timestamp_utc >= ? AND timestamp_utc <= ?
               ORDER BY timestamp_utc ASC, id ASC"#,
        )
        .bind(user_id.0)
        .bind(format_utc(&start))
        .bind(format_utc(&end))
        .fetch_all(&self.pool.reader)
        .await
        .map_err(map_sqlx)?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            let record_row = RecordRow::from_row(row).map_err(map_sqlx)?;
            records.push(record_row.into_record()?);
        }
        Ok(records)
    }

    async fn count(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM records WHERE user_id = ?")
            .bind(user_id.0)
            .fetch_one(&self.pool.reader)
            .await
            .map_err(map_sqlx)?;

        let n: i64 = row.try_get("n").map_err(map_sqlx)?;
        Ok(n.max(0) as u64)
    }

    async fn first_logged_at(
        &self,
        user_id: UserId,
    ) -> Result<Option<chrono::DateTime<Utc>>, RepositoryError> {
        let row = sqlx::query("SELECT MIN(timestamp_utc) AS first FROM records WHERE user_id = ?")
            .bind(user_id.0)
            .fetch_one(&self.pool.reader)
            .await
            .map_err(map_sqlx)?;

        let first: Option<String> = row.try_get("first").map_err(map_sqlx)?;
        first.as_deref().map(parse_utc).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, FixedOffset, TimeZone};
    use habitlog_types::record::Consistency;

    async fn test_pool() -> DatabasePool {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        std::mem::forget(dir);
        DatabasePool::new(&url).await.unwrap()
    }

    fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn new_record(user: i64, at: DateTime<Utc>, rating: u8) -> NewRecord {
        let offset = FixedOffset::east_opt(9 * 3600).unwrap();
        NewRecord {
            user_id: UserId(user),
            logged_at_utc: at,
            timezone: "Asia/Tokyo".to_string(),
            logged_at_local: at.with_timezone(&offset),
            rating,
            duration_minutes: 12.5,
            amount: 1.5,
            consistency: Consistency::Thick,
        }
    }

    #[tokio::test]
    async fn test_append_and_query_preserves_fields() {
        let repo = SqliteRecordRepository::new(test_pool().await);
        let input = new_record(1, utc(2024, 1, 10, 15), 4);

        let id = repo.append(&input).await.unwrap();
        let found = repo
            .query_range(UserId(1), utc(2024, 1, 1, 0), utc(2024, 2, 1, 0))
            .await
            .unwrap();

        assert_eq!(found, vec![input.clone().with_id(id)]);
        assert_eq!(found[0].logged_at_local.to_rfc3339(), "2024-01-11T00:00:00+09:00");
    }

    #[tokio::test]
    async fn test_query_range_is_inclusive_and_ordered() {
        let repo = SqliteRecordRepository::new(test_pool().await);
        repo.append(&new_record(1, utc(2024, 3, 5, 0), 3)).await.unwrap();
        repo.append(&new_record(1, utc(2024, 3, 1, 0), 1)).await.unwrap();
        repo.append(&new_record(1, utc(2024, 3, 3, 0), 2)).await.unwrap();
        repo.append(&new_record(1, utc(2024, 3, 6, 0), 5)).await.unwrap();
        repo.append(&new_record(2, utc(2024, 3, 3, 0), 5)).await.unwrap();

        let found = repo
            .query_range(UserId(1), utc(2024, 3, 1, 0), utc(2024, 3, 5, 0))
            .await
            .unwrap();
        let ratings: Vec<u8> = found.iter().map(|r| r.rating).collect();
        assert_eq!(ratings, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_sub_second_timestamps_sort_correctly() {
        let repo = SqliteRecordRepository::new(test_pool().await);
        let base = utc(2024, 3, 1, 12);
        repo.append(&new_record(1, base + chrono::TimeDelta::milliseconds(500), 2))
            .await
            .unwrap();
        repo.append(&new_record(1, base, 1)).await.unwrap();

        let found = repo
            .query_range(UserId(1), base, base + chrono::TimeDelta::seconds(1))
            .await
            .unwrap();
        let ratings: Vec<u8> = found.iter().map(|r| r.rating).collect();
        assert_eq!(ratings, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_count_and_first_logged_at() {
        let repo = SqliteRecordRepository::new(test_pool().await);
        assert_eq!(repo.count(UserId(1)).await.unwrap(), 0);
        assert_eq!(repo.first_logged_at(UserId(1)).await.unwrap(), None);

        repo.append(&new_record(1, utc(2024, 4, 2, 0), 3)).await.unwrap();
        repo.append(&new_record(1, utc(2024, 4, 1, 0), 3)).await.unwrap();
        repo.append(&new_record(2, utc(2023, 1, 1, 0), 3)).await.unwrap();

        assert_eq!(repo.count(UserId(1)).await.unwrap(), 2);
        assert_eq!(
            repo.first_logged_at(UserId(1)).await.unwrap(),
            Some(utc(2024, 4, 1, 0))
        );
    }

    #[tokio::test]
    async fn test_out_of_range_rating_is_rejected_by_schema() {
        let repo = SqliteRecordRepository::new(test_pool().await);
        let result = repo.append(&new_record(1, utc(2024, 4, 1, 0), 9)).await;
        assert!(matches!(result, Err(RepositoryError::Query(_))));
    }
}
