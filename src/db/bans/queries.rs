//! Ban ledger queries.
//!
//! At most one row per `(channel, mask, mode)` may have `unset_at IS NULL`.
//! Nothing in the schema enforces that; every writer here keeps it.

use std::collections::HashSet;

use super::models::{BanMode, BanRecord, BanRow, ExpiredBan, ListedBan, PriorBan};
use crate::db::DbError;
use sqlx::SqlitePool;

const BAN_COLUMNS: &str =
    "id, channel, mask, mode, set_at, set_by, expire_at, reason, unset_at, unset_by";

/// Repository for ledger operations.
pub struct BanRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> BanRepository<'a> {
    /// Create a new ban repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Record a newly observed ban. `duration` of `None` never expires.
    pub async fn add_ban(
        &self,
        channel: &str,
        set_by: &str,
        mask: &str,
        mode: BanMode,
        duration: Option<i64>,
    ) -> Result<i64, DbError> {
        let now = chrono::Utc::now().timestamp();
        let expire_at = duration.map(|d| now + d);

        let result = sqlx::query(
            r#"
            INSERT INTO bans (channel, mask, mode, set_at, set_by, expire_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(channel)
        .bind(mask)
        .bind(mode.as_str())
        .bind(now)
        .bind(set_by)
        .bind(expire_at)
        .execute(self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Mint an edit authorization token for a row.
    pub async fn add_ban_auth(&self, ban_id: i64) -> Result<String, DbError> {
        let code = uuid::Uuid::new_v4().simple().to_string();

        sqlx::query("INSERT INTO ban_authorizations (ban, code) VALUES (?, ?)")
            .bind(ban_id)
            .bind(&code)
            .execute(self.pool)
            .await?;

        Ok(code)
    }

    /// Mark the active row for a mask unset, returning the closed rows that
    /// had not yet expired.
    pub async fn remove_ban(
        &self,
        channel: &str,
        unset_by: &str,
        mask: &str,
        mode: BanMode,
    ) -> Result<Vec<PriorBan>, DbError> {
        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        let rows = sqlx::query_as::<_, (String, i64, Option<i64>)>(
            r#"
            SELECT set_by, set_at, expire_at
            FROM bans
            WHERE channel = ? AND mask = ? AND mode = ?
              AND unset_at IS NULL
              AND (expire_at IS NULL OR expire_at >= ?)
            ORDER BY set_at
            "#,
        )
        .bind(channel)
        .bind(mask)
        .bind(mode.as_str())
        .bind(now)
        .fetch_all(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE bans
            SET unset_at = ?, unset_by = ?
            WHERE channel = ? AND mask = ? AND mode = ? AND unset_at IS NULL
            "#,
        )
        .bind(now)
        .bind(unset_by)
        .bind(channel)
        .bind(mask)
        .bind(mode.as_str())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(rows
            .into_iter()
            .map(|(set_by, set_at, expire_at)| PriorBan {
                set_by,
                set_at,
                expire_at,
            })
            .collect())
    }

    /// Active rows whose expiry has passed, ordered by channel.
    pub async fn get_expired_bans(&self) -> Result<Vec<ExpiredBan>, DbError> {
        let now = chrono::Utc::now().timestamp();

        let rows = sqlx::query_as::<_, (String, String, String)>(
            r#"
            SELECT channel, mask, mode
            FROM bans
            WHERE expire_at <= ? AND unset_at IS NULL
            ORDER BY channel, id
            "#,
        )
        .bind(now)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(channel, mask, mode)| {
                let mode = mode.chars().next().and_then(BanMode::from_letter)?;
                Some(ExpiredBan {
                    channel,
                    mask,
                    mode,
                })
            })
            .collect())
    }

    /// Insert rows for listed masks that have no active row yet.
    ///
    /// Returns how many rows were inserted; running it twice with the same
    /// list inserts nothing the second time.
    pub async fn ensure_active_bans(
        &self,
        channel: &str,
        mode: BanMode,
        listed: &[ListedBan],
        duration: Option<i64>,
    ) -> Result<u64, DbError> {
        let now = chrono::Utc::now();
        let expire_at = duration.map(|d| now.timestamp() + d);
        let reason = format!("ban pulled from banlist on {}", now.format("%Y-%m-%d"));

        let mut tx = self.pool.begin().await?;

        let active: Vec<String> = sqlx::query_scalar(
            "SELECT mask FROM bans WHERE channel = ? AND mode = ? AND unset_at IS NULL",
        )
        .bind(channel)
        .bind(mode.as_str())
        .fetch_all(&mut *tx)
        .await?;
        let mut known: HashSet<String> = active.into_iter().collect();

        let mut inserted = 0;
        for ban in listed {
            if !known.insert(ban.mask.clone()) {
                continue;
            }
            sqlx::query(
                r#"
                INSERT INTO bans (channel, mask, mode, set_at, set_by, expire_at, reason)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(channel)
            .bind(&ban.mask)
            .bind(mode.as_str())
            .bind(ban.set_at)
            .bind(&ban.set_by)
            .bind(expire_at)
            .bind(&reason)
            .execute(&mut *tx)
            .await?;
            inserted += 1;
        }

        tx.commit().await?;
        Ok(inserted)
    }

    /// Every row that is still set, newest first within each channel.
    pub async fn get_active_bans(&self) -> Result<Vec<BanRecord>, DbError> {
        self.fetch(&format!(
            "SELECT {BAN_COLUMNS} FROM bans WHERE unset_at IS NULL ORDER BY channel, set_at DESC"
        ))
        .await
    }

    /// Every row ever recorded.
    pub async fn get_all_bans(&self) -> Result<Vec<BanRecord>, DbError> {
        self.fetch(&format!(
            "SELECT {BAN_COLUMNS} FROM bans ORDER BY channel, set_at DESC"
        ))
        .await
    }

    /// The `count` most recently unset rows that had an expiry and a reason.
    pub async fn get_recently_expired_bans(&self, count: u32) -> Result<Vec<BanRecord>, DbError> {
        let rows = sqlx::query_as::<_, BanRow>(&format!(
            r#"
            SELECT {BAN_COLUMNS}
            FROM bans
            WHERE expire_at IS NOT NULL
              AND unset_at IS NOT NULL
              AND reason != ''
            ORDER BY unset_at DESC
            LIMIT ?
            "#
        ))
        .bind(i64::from(count))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(BanRecord::from_row).collect())
    }

    /// Look up a row by id, accepting it only with a matching token.
    pub async fn get_ban_with_auth(&self, id: i64, code: &str) -> Result<BanRecord, DbError> {
        let row = sqlx::query_as::<_, BanRow>(
            r#"
            SELECT b.id, b.channel, b.mask, b.mode, b.set_at, b.set_by,
                   b.expire_at, b.reason, b.unset_at, b.unset_by
            FROM bans b
            JOIN ban_authorizations authz ON b.id = authz.ban
            WHERE authz.ban = ? AND authz.code = ?
            LIMIT 1
            "#,
        )
        .bind(id)
        .bind(code)
        .fetch_optional(self.pool)
        .await?;

        row.map(BanRecord::from_row)
            .ok_or(DbError::BanNotFound(id))
    }

    /// Overwrite expiry and reason of one row.
    pub async fn update_ban(
        &self,
        id: i64,
        expire_at: Option<i64>,
        reason: &str,
    ) -> Result<(), DbError> {
        let result = sqlx::query("UPDATE bans SET expire_at = ?, reason = ? WHERE id = ?")
            .bind(expire_at)
            .bind(reason)
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::BanNotFound(id));
        }
        Ok(())
    }

    async fn fetch(&self, query: &str) -> Result<Vec<BanRecord>, DbError> {
        let rows = sqlx::query_as::<_, BanRow>(query)
            .fetch_all(self.pool)
            .await?;
        Ok(rows.into_iter().map(BanRecord::from_row).collect())
    }
}
