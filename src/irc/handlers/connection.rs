//! Registration, liveness and server-level replies.

use async_trait::async_trait;
use tracing::{info, warn};
use warden_proto::{Command, Message};

use crate::error::SessionError;
use crate::irc::dispatch::{Context, Handler, HandlerResult, params};

/// `RPL_WELCOME`: we are signed on under `params[0]`.
pub struct WelcomeHandler;

#[async_trait]
impl Handler for WelcomeHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        if let Some(nick) = params(msg).first() {
            ctx.bot.set_nick(nick);
        }
        ctx.state.signed_on = true;
        info!(nick = %ctx.bot.nick(), "signed on");

        match &ctx.bot.config.irc.nickserv_password {
            Some(password) => ctx
                .bot
                .outbox
                .msg("NickServ", &format!("identify {password}")),
            None => ctx.bot.autojoin(),
        }
        Ok(())
    }
}

/// `RPL_ISUPPORT`: learn the server's channel mode layout.
pub struct IsupportHandler;

#[async_trait]
impl Handler for IsupportHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        let params = params(msg);
        // First is our nick, last is the "are supported" trailer.
        if params.len() > 2 {
            for token in &params[1..params.len() - 1] {
                ctx.bot.apply_isupport(token);
            }
        }
        Ok(())
    }
}

/// `ERR_NICKNAMEINUSE` before sign-on: try again with an underscore.
pub struct NickInUseHandler;

#[async_trait]
impl Handler for NickInUseHandler {
    async fn handle(&self, ctx: &mut Context<'_>, _msg: &Message) -> HandlerResult {
        if ctx.state.signed_on {
            return Ok(());
        }
        let alternative = format!("{}_", ctx.bot.nick());
        warn!(nick = %alternative, "nickname in use, retrying");
        ctx.bot.set_nick(&alternative);
        ctx.bot.outbox.send(Command::NICK(alternative).into());
        Ok(())
    }
}

pub struct PingHandler;

#[async_trait]
impl Handler for PingHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        if let Command::PING(token, _) = &msg.command {
            ctx.bot.outbox.send(Message::pong(token.as_str()));
        }
        Ok(())
    }
}

/// `PONG`: one of our liveness pings came back.
pub struct PongHandler;

#[async_trait]
impl Handler for PongHandler {
    async fn handle(&self, ctx: &mut Context<'_>, _msg: &Message) -> HandlerResult {
        ctx.state.outstanding_pings = ctx.state.outstanding_pings.saturating_sub(1);
        Ok(())
    }
}

/// `ERROR`: the server is closing the link.
pub struct ErrorHandler;

#[async_trait]
impl Handler for ErrorHandler {
    async fn handle(&self, _ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        let reason = match &msg.command {
            Command::ERROR(reason) => reason.clone(),
            _ => String::new(),
        };
        Err(SessionError::ServerError(reason))
    }
}
