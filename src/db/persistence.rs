//! The storage interface the bot and web UI program against.

use async_trait::async_trait;

use super::{BanMode, BanRecord, Database, DbError, ExpiredBan, ListedBan, PriorBan};

/// Ledger, roster and offense storage.
///
/// [`Database`] is the SQLite implementation; sessions and the web router
/// hold an `Arc<dyn Persistence>` so tests can swap in their own.
#[async_trait]
pub trait Persistence: Send + Sync {
    async fn add_ban(
        &self,
        channel: &str,
        set_by: &str,
        mask: &str,
        mode: BanMode,
        duration: Option<i64>,
    ) -> Result<i64, DbError>;
    async fn add_ban_auth(&self, ban_id: i64) -> Result<String, DbError>;
    async fn remove_ban(
        &self,
        channel: &str,
        unset_by: &str,
        mask: &str,
        mode: BanMode,
    ) -> Result<Vec<PriorBan>, DbError>;
    async fn get_expired_bans(&self) -> Result<Vec<ExpiredBan>, DbError>;
    async fn check_mask(&self, channel: &str, mask: &str) -> Result<Vec<String>, DbError>;
    async fn ensure_active_bans(
        &self,
        channel: &str,
        mode: BanMode,
        listed: &[ListedBan],
        duration: Option<i64>,
    ) -> Result<u64, DbError>;

    async fn set_users_in_channel(
        &self,
        channel: &str,
        users: &[(String, String)],
    ) -> Result<(), DbError>;
    async fn add_user_to_channel(&self, nick: &str, host: &str, channel: &str)
    -> Result<(), DbError>;
    async fn remove_nick_from_channel(&self, nick: &str, channel: &str) -> Result<(), DbError>;
    async fn remove_nick_from_channels(&self, nick: &str) -> Result<(), DbError>;
    async fn rename_nick(&self, old: &str, new: &str) -> Result<(), DbError>;

    async fn add_lol(&self, nick: &str) -> Result<i64, DbError>;

    async fn get_active_bans(&self) -> Result<Vec<BanRecord>, DbError>;
    async fn get_all_bans(&self) -> Result<Vec<BanRecord>, DbError>;
    async fn get_recently_expired_bans(&self, count: u32) -> Result<Vec<BanRecord>, DbError>;
    async fn get_ban_with_auth(&self, id: i64, code: &str) -> Result<BanRecord, DbError>;
    async fn update_ban(&self, id: i64, expire_at: Option<i64>, reason: &str)
    -> Result<(), DbError>;
}

#[async_trait]
impl Persistence for Database {
    async fn add_ban(
        &self,
        channel: &str,
        set_by: &str,
        mask: &str,
        mode: BanMode,
        duration: Option<i64>,
    ) -> Result<i64, DbError> {
        self.bans()
            .add_ban(channel, set_by, mask, mode, duration)
            .await
    }

    async fn add_ban_auth(&self, ban_id: i64) -> Result<String, DbError> {
        self.bans().add_ban_auth(ban_id).await
    }

    async fn remove_ban(
        &self,
        channel: &str,
        unset_by: &str,
        mask: &str,
        mode: BanMode,
    ) -> Result<Vec<PriorBan>, DbError> {
        self.bans().remove_ban(channel, unset_by, mask, mode).await
    }

    async fn get_expired_bans(&self) -> Result<Vec<ExpiredBan>, DbError> {
        self.bans().get_expired_bans().await
    }

    async fn check_mask(&self, channel: &str, mask: &str) -> Result<Vec<String>, DbError> {
        self.roster().check_mask(channel, mask).await
    }

    async fn ensure_active_bans(
        &self,
        channel: &str,
        mode: BanMode,
        listed: &[ListedBan],
        duration: Option<i64>,
    ) -> Result<u64, DbError> {
        self.bans()
            .ensure_active_bans(channel, mode, listed, duration)
            .await
    }

    async fn set_users_in_channel(
        &self,
        channel: &str,
        users: &[(String, String)],
    ) -> Result<(), DbError> {
        self.roster().set_users_in_channel(channel, users).await
    }

    async fn add_user_to_channel(
        &self,
        nick: &str,
        host: &str,
        channel: &str,
    ) -> Result<(), DbError> {
        self.roster().add_user_to_channel(nick, host, channel).await
    }

    async fn remove_nick_from_channel(&self, nick: &str, channel: &str) -> Result<(), DbError> {
        self.roster().remove_nick_from_channel(nick, channel).await
    }

    async fn remove_nick_from_channels(&self, nick: &str) -> Result<(), DbError> {
        self.roster().remove_nick_from_channels(nick).await
    }

    async fn rename_nick(&self, old: &str, new: &str) -> Result<(), DbError> {
        self.roster().rename_nick(old, new).await
    }

    async fn add_lol(&self, nick: &str) -> Result<i64, DbError> {
        self.offenses().add_lol(nick).await
    }

    async fn get_active_bans(&self) -> Result<Vec<BanRecord>, DbError> {
        self.bans().get_active_bans().await
    }

    async fn get_all_bans(&self) -> Result<Vec<BanRecord>, DbError> {
        self.bans().get_all_bans().await
    }

    async fn get_recently_expired_bans(&self, count: u32) -> Result<Vec<BanRecord>, DbError> {
        self.bans().get_recently_expired_bans(count).await
    }

    async fn get_ban_with_auth(&self, id: i64, code: &str) -> Result<BanRecord, DbError> {
        self.bans().get_ban_with_auth(id, code).await
    }

    async fn update_ban(
        &self,
        id: i64,
        expire_at: Option<i64>,
        reason: &str,
    ) -> Result<(), DbError> {
        self.bans().update_ban(id, expire_at, reason).await
    }
}
