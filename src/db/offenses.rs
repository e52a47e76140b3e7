//! Repository for no-LOL-zone offenses.

use crate::db::DbError;
use sqlx::SqlitePool;

/// Offenses within this many seconds count towards the returned total.
const RECENT_WINDOW_SECS: i64 = 120;

/// Repository for offense records.
pub struct OffenseRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> OffenseRepository<'a> {
    /// Create a new offense repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Record an offense by `nick`, returning how many it has committed in
    /// the last two minutes (including this one).
    pub async fn add_lol(&self, nick: &str) -> Result<i64, DbError> {
        let now = chrono::Utc::now().timestamp();

        sqlx::query("INSERT INTO lol_offenses (username, time_of) VALUES (?, ?)")
            .bind(nick)
            .bind(now)
            .execute(self.pool)
            .await?;

        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM lol_offenses WHERE username = ? AND time_of >= ?",
        )
        .bind(nick)
        .bind(now - RECENT_WINDOW_SECS)
        .fetch_one(self.pool)
        .await?;

        Ok(count)
    }
}
