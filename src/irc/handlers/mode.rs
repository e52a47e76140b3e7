//! Channel `MODE` changes: our own op status, and ban/quiet list edits.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};
use warden_proto::{Command, Message, Prefix};

use crate::db::BanMode;
use crate::irc::bans::{Actor, BanChange, sync_change};
use crate::irc::dispatch::{Context, Handler, HandlerResult};

pub struct ModeHandler;

#[async_trait]
impl Handler for ModeHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        let Command::MODE(channel, args) = &msg.command else {
            return Ok(());
        };
        if !channel.starts_with(['#', '&']) {
            return Ok(());
        }
        let modes = match ctx.bot.mode_spec().parse(args) {
            Ok(modes) => modes,
            Err(e) => {
                debug!(channel = %channel, error = %e, "unparseable mode change");
                return Ok(());
            }
        };
        let Some(actor) = msg.prefix.as_ref().map(actor) else {
            return Ok(());
        };

        for mode in modes {
            let Some(arg) = mode.arg() else {
                continue;
            };
            if mode.letter() == 'o' {
                if ctx.bot.is_me(arg) && ctx.bot.ops.on_self_op(channel, mode.is_set()) {
                    arm_deop_timer(ctx);
                }
                continue;
            }
            if let Some(ban_mode) = BanMode::from_letter(mode.letter()) {
                let change = BanChange {
                    channel: channel.clone(),
                    mode: ban_mode,
                    set: mode.is_set(),
                    mask: arg.to_owned(),
                };
                sync_change(ctx.bot, ctx.tasks, &actor, change).await;
            }
        }
        Ok(())
    }
}

fn actor(prefix: &Prefix) -> Actor {
    let nick = match prefix {
        Prefix::Nickname(nick, _, _) => nick.clone(),
        Prefix::ServerName(name) => name.clone(),
    };
    Actor {
        nick,
        hostmask: prefix.to_string(),
    }
}

/// Give ops back a while after gaining them. Every gain arms its own timer.
fn arm_deop_timer(ctx: &mut Context<'_>) {
    let bot = Arc::clone(ctx.bot);
    ctx.tasks.spawn(async move {
        tokio::time::sleep(bot.timings.deop_delay).await;
        let nick = bot.nick();
        for channel in bot.ops.opped_channels() {
            info!(channel = %channel, "dropping ops");
            bot.outbox.mode(&channel, "-o", &nick);
        }
    });
}
