//! SQLite user timezone preference storage.

use chrono::Utc;
use habitlog_core::repository::preference::TimezonePreferenceRepository;
use habitlog_types::error::RepositoryError;
use habitlog_types::user::UserId;
use sqlx::Row;

use super::pool::DatabasePool;
use super::{format_utc, map_sqlx};

/// SQLite-backed implementation of `TimezonePreferenceRepository`.
#[derive(Clone)]
pub struct SqliteUserRepository {
    pool: DatabasePool,
}

impl SqliteUserRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

impl TimezonePreferenceRepository for SqliteUserRepository {
    async fn get(&self, user_id: UserId) -> Result<Option<String>, RepositoryError> {
        let row = sqlx::query("SELECT timezone FROM users WHERE user_id = ?")
            .bind(user_id.0)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(map_sqlx)?;

        match row {
            Some(row) => Ok(Some(row.try_get("timezone").map_err(map_sqlx)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, user_id: UserId, timezone: &str) -> Result<(), RepositoryError> {
        let now = format_utc(&Utc::now());

        sqlx::query(
            r#"INSERT INTO users (user_id, timezone, created_at, updated_at)
               VALUES (?, ?, ?, ?)
               ON CONFLICT (user_id) DO UPDATE SET timezone = excluded.timezone, updated_at = excluded.updated_at"#,
        )
        .bind(user_id.0)
        .bind(timezone)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool.writer)
        .await
        .map_err(map_sqlx)?;

        Ok(())
    }
}
