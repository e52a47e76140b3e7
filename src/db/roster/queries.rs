//! Roster queries.

use crate::db::DbError;
use sqlx::SqlitePool;
use warden_proto::matches_hostmask;

/// Repository for roster operations.
pub struct RosterRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> RosterRepository<'a> {
    /// Create a new roster repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Replace a channel's membership with a full snapshot of
    /// `(nick, user@host)` pairs.
    pub async fn set_users_in_channel(
        &self,
        channel: &str,
        users: &[(String, String)],
    ) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM channel_users WHERE channel = ?")
            .bind(channel)
            .execute(&mut *tx)
            .await?;

        for (nick, host) in users {
            sqlx::query("REPLACE INTO user_hosts (nick, host) VALUES (?, ?)")
                .bind(nick)
                .bind(host)
                .execute(&mut *tx)
                .await?;
            sqlx::query("REPLACE INTO channel_users (nick, channel) VALUES (?, ?)")
                .bind(nick)
                .bind(channel)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Add one member.
    pub async fn add_user_to_channel(
        &self,
        nick: &str,
        host: &str,
        channel: &str,
    ) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("REPLACE INTO user_hosts (nick, host) VALUES (?, ?)")
            .bind(nick)
            .bind(host)
            .execute(&mut *tx)
            .await?;
        sqlx::query("REPLACE INTO channel_users (nick, channel) VALUES (?, ?)")
            .bind(nick)
            .bind(channel)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Remove a nick from one channel.
    pub async fn remove_nick_from_channel(&self, nick: &str, channel: &str) -> Result<(), DbError> {
        sqlx::query("DELETE FROM channel_users WHERE nick = ? AND channel = ?")
            .bind(nick)
            .bind(channel)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Remove a nick from every channel.
    pub async fn remove_nick_from_channels(&self, nick: &str) -> Result<(), DbError> {
        sqlx::query("DELETE FROM channel_users WHERE nick = ?")
            .bind(nick)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Carry a nick's host and memberships over to its new name.
    pub async fn rename_nick(&self, old: &str, new: &str) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM user_hosts WHERE nick = ?")
            .bind(new)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE user_hosts SET nick = ? WHERE nick = ?")
            .bind(new)
            .bind(old)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE OR REPLACE channel_users SET nick = ? WHERE nick = ?")
            .bind(new)
            .bind(old)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Nicks on `channel` whose `nick!user@host` matches `mask`.
    ///
    /// Matching uses IRC casemapping, so it happens here rather than with
    /// SQLite's case-sensitive `GLOB`.
    pub async fn check_mask(&self, channel: &str, mask: &str) -> Result<Vec<String>, DbError> {
        let members = sqlx::query_as::<_, (String, String)>(
            r#"
            SELECT cu.nick, uh.host
            FROM channel_users cu
            JOIN user_hosts uh ON uh.nick = cu.nick
            WHERE cu.channel = ?
            ORDER BY cu.nick
            "#,
        )
        .bind(channel)
        .fetch_all(self.pool)
        .await?;

        Ok(members
            .into_iter()
            .filter(|(nick, host)| matches_hostmask(mask, &format!("{nick}!{host}")))
            .map(|(nick, _)| nick)
            .collect())
    }
}
