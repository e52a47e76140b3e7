//! `PRIVMSG` and `NOTICE`: prompt replies, chat commands, chat filters and
//! the NickServ handshake.

use async_trait::async_trait;
use tracing::{debug, info, warn};
use warden_proto::{Command, Message, irc_eq};

use crate::config::PRIVMSG_POLICY;
use crate::irc::commands::{
    BotCommands, CommandOutcome, Invocation, LOL_FEATURE, extract_command, is_lol,
};
use crate::irc::correlator::NickKey;
use crate::irc::dispatch::{Context, Handler, HandlerResult};

/// Services whose messages are never commands or prompt replies.
const SERVICES: &[&str] = &["NickServ", "ChanServ", "MemoServ"];

pub struct PrivmsgHandler {
    commands: BotCommands,
}

impl PrivmsgHandler {
    pub fn new(commands: BotCommands) -> Self {
        Self { commands }
    }
}

#[async_trait]
impl Handler for PrivmsgHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        let Command::PRIVMSG(target, text) = &msg.command else {
            return Ok(());
        };
        let Some(nick) = msg.source_nickname() else {
            return Ok(());
        };
        autojoin_if_identified(ctx, nick, text);
        if ctx.bot.is_me(nick) || SERVICES.iter().any(|service| irc_eq(service, nick)) {
            return Ok(());
        }

        let private = ctx.bot.is_me(target);
        if private {
            if ctx.bot.prompts.deliver(&NickKey::new(nick), text.clone()) {
                return Ok(());
            }
            info!(from = %nick, text = %text, "private message");
        }

        let (reply_to, policy) = if private {
            (nick, ctx.bot.policy(PRIVMSG_POLICY))
        } else {
            (target.as_str(), ctx.bot.policy(target))
        };

        if !private && policy.is_command_usable(LOL_FEATURE) && is_lol(text) {
            match ctx.bot.db.add_lol(nick).await {
                Ok(recent) => {
                    info!(nick = %nick, channel = %target, recent, "lol offense");
                    ctx.bot
                        .outbox
                        .msg(nick, &format!("{target} is a no-LOL zone."));
                }
                Err(e) => warn!(nick = %nick, error = %e, "failed to record lol offense"),
            }
        }

        let Some(line) = extract_command(&ctx.bot.nick(), text, private) else {
            return Ok(());
        };
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Ok(());
        };
        let Some(command) = self.commands.lookup(name) else {
            debug!(command = %name, "unknown command");
            return Ok(());
        };
        if !policy.is_command_usable(name) {
            debug!(command = %name, policy = %policy.name, "command not usable here");
            return Ok(());
        }

        let call = Invocation {
            reply_to,
            sender: nick,
            args: words.collect(),
        };
        if command(ctx.bot, &call) == CommandOutcome::Shutdown {
            ctx.state.shutdown = true;
        }
        Ok(())
    }
}

pub struct NoticeHandler;

#[async_trait]
impl Handler for NoticeHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        if let (Command::NOTICE(_, text), Some(nick)) = (&msg.command, msg.source_nickname()) {
            autojoin_if_identified(ctx, nick, text);
        }
        Ok(())
    }
}

/// Join the autojoin channels once NickServ confirms we are identified.
fn autojoin_if_identified(ctx: &mut Context<'_>, nick: &str, text: &str) {
    if !ctx.state.identified
        && irc_eq(nick, "NickServ")
        && (text.contains("identified") || text.contains("recognized"))
    {
        info!("identified with services");
        ctx.state.identified = true;
        ctx.bot.autojoin();
    }
}
