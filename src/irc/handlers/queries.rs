//! `WHO` and `WHOIS` replies.

use async_trait::async_trait;
use warden_proto::Message;

use crate::irc::dispatch::{Context, Handler, HandlerResult, params};

/// `RPL_WHOREPLY`: `<me> <channel> <user> <host> <server> <nick> ...`
pub struct WhoReplyHandler;

#[async_trait]
impl Handler for WhoReplyHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        if let Some([channel, user, host, _server, nick]) = params(msg).get(1..6) {
            ctx.bot.roster.on_who_reply(channel, nick, user, host);
        }
        Ok(())
    }
}

/// `RPL_ENDOFWHO`
pub struct EndOfWhoHandler;

#[async_trait]
impl Handler for EndOfWhoHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        if let Some(channel) = params(msg).get(1)
            && channel.starts_with(['#', '&'])
        {
            ctx.bot.roster.on_end_of_who(channel);
        }
        Ok(())
    }
}

pub struct WhoisUserHandler;

#[async_trait]
impl Handler for WhoisUserHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        ctx.bot.whois.on_whois_user(params(msg));
        Ok(())
    }
}

pub struct WhoisAccountHandler;

#[async_trait]
impl Handler for WhoisAccountHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        ctx.bot.whois.on_whois_account(params(msg));
        Ok(())
    }
}

pub struct EndOfWhoisHandler;

#[async_trait]
impl Handler for EndOfWhoisHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        ctx.bot.whois.on_end_of_whois(params(msg));
        Ok(())
    }
}
