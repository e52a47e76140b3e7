//! Ban and quiet list replies, collated per channel until the end marker.

use async_trait::async_trait;
use warden_proto::{Message, irc_to_lower};

use crate::db::{BanMode, ListedBan};
use crate::irc::bans::reconcile_list;
use crate::irc::dispatch::{Context, Handler, HandlerResult, params};

/// `RPL_BANLIST` / `RPL_QUIETLIST`
pub struct BanListHandler {
    mode: BanMode,
}

impl BanListHandler {
    pub fn new(mode: BanMode) -> Self {
        Self { mode }
    }
}

#[async_trait]
impl Handler for BanListHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        // 367: <me> <channel> <mask> <setter> <when>
        // 728: <me> <channel> q <mask> <setter> <when>
        let params = params(msg);
        let fields = match self.mode {
            BanMode::Ban => params.get(1..5),
            BanMode::Quiet => params.get(1..6),
        };
        let Some(fields) = fields else {
            return Ok(());
        };
        let [mask, set_by, when] = &fields[fields.len() - 3..] else {
            return Ok(());
        };
        let channel = &fields[0];
        let listed = ListedBan {
            mask: mask.clone(),
            set_by: set_by.clone(),
            set_at: when
                .parse()
                .unwrap_or_else(|_| chrono::Utc::now().timestamp()),
        };
        ctx.state
            .ban_lists
            .entry((irc_to_lower(channel), self.mode))
            .or_default()
            .push(listed);
        Ok(())
    }
}

/// `RPL_ENDOFBANLIST` / `RPL_ENDOFQUIETLIST`
pub struct EndOfBanListHandler {
    mode: BanMode,
}

impl EndOfBanListHandler {
    pub fn new(mode: BanMode) -> Self {
        Self { mode }
    }
}

#[async_trait]
impl Handler for EndOfBanListHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        let Some(channel) = params(msg).get(1) else {
            return Ok(());
        };
        let listed = ctx
            .state
            .ban_lists
            .remove(&(irc_to_lower(channel), self.mode))
            .unwrap_or_default();
        reconcile_list(ctx.bot, channel, self.mode, listed).await;
        Ok(())
    }
}
