//! Membership events: who is where, and where the bot goes.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;
use warden_proto::{Command, Message};

use super::source_user;
use crate::irc::dispatch::{Context, Handler, HandlerResult};

pub struct JoinHandler;

#[async_trait]
impl Handler for JoinHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        let Command::JOIN(channel, _) = &msg.command else {
            return Ok(());
        };
        let Some((nick, host)) = source_user(msg) else {
            return Ok(());
        };

        if ctx.bot.is_me(nick) {
            joined(ctx, channel);
        } else {
            ctx.bot.roster.join(nick, &host, channel);
        }
        Ok(())
    }
}

/// The bot itself landed in `channel`.
fn joined(ctx: &mut Context<'_>, channel: &str) {
    let policy = ctx.bot.policy(channel);
    info!(channel = %channel, have_ops = policy.have_ops, "joined");

    if let Some(target) = policy.anti_redirect {
        info!(channel = %channel, target = %target, "redirected here, moving on");
        ctx.bot.outbox.send(Message::part(channel));
        let bot = Arc::clone(ctx.bot);
        ctx.tasks.spawn(async move {
            tokio::time::sleep(bot.timings.redirect_delay).await;
            bot.join(&target);
        });
        return;
    }

    ctx.bot.outbox.send(Message::who(channel));
    if policy.have_ops {
        ctx.bot.outbox.send(Message::mode(channel, &["+b"]));
        ctx.bot.outbox.send(Message::mode(channel, &["+q"]));
    }
}

pub struct PartHandler;

#[async_trait]
impl Handler for PartHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        if let Command::PART(channel, _) = &msg.command
            && let Some(nick) = msg.source_nickname()
            && !ctx.bot.is_me(nick)
        {
            ctx.bot.roster.part(nick, channel);
        }
        Ok(())
    }
}

/// `KICK`: drop the victim from the roster, or rejoin if it was us.
pub struct KickHandler;

#[async_trait]
impl Handler for KickHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        let Command::KICK(channel, victim, _) = &msg.command else {
            return Ok(());
        };
        if ctx.bot.is_me(victim) {
            info!(channel = %channel, by = msg.source_nickname(), "kicked, rejoining");
            ctx.bot.join(channel);
        } else {
            ctx.bot.roster.part(victim, channel);
        }
        Ok(())
    }
}

pub struct QuitHandler;

#[async_trait]
impl Handler for QuitHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        if let Some(nick) = msg.source_nickname() {
            ctx.bot.roster.quit(nick);
        }
        Ok(())
    }
}

pub struct NickHandler;

#[async_trait]
impl Handler for NickHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        let (Command::NICK(new), Some(old)) = (&msg.command, msg.source_nickname()) else {
            return Ok(());
        };
        if ctx.bot.is_me(old) {
            ctx.bot.set_nick(new);
        }
        ctx.bot.roster.rename(old, new);
        Ok(())
    }
}

/// `INVITE`: go where we are invited.
pub struct InviteHandler;

#[async_trait]
impl Handler for InviteHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        if let Command::INVITE(nick, channel) = &msg.command
            && ctx.bot.is_me(nick)
        {
            info!(channel = %channel, by = msg.source_nickname(), "invited");
            ctx.bot.join(channel);
        }
        Ok(())
    }
}
