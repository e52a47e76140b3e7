//! Handler registry and dispatch.
//!
//! Every inbound message is routed by verb, or for numerics by the symbolic
//! name the session's [`NumericTable`] gives its code. The table is checked
//! against the names the registry handles when the registry is built, so a
//! network missing a reply the bot depends on fails fast.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{Instrument, Level, span};
use warden_proto::numeric::names;
use warden_proto::{Command, Message, NumericTable};

use super::bot::Bot;
use super::commands::BotCommands;
use super::handlers::{
    channel::{InviteHandler, JoinHandler, KickHandler, NickHandler, PartHandler, QuitHandler},
    connection::{
        ErrorHandler, IsupportHandler, NickInUseHandler, PingHandler, PongHandler, WelcomeHandler,
    },
    lists::{BanListHandler, EndOfBanListHandler},
    messaging::{NoticeHandler, PrivmsgHandler},
    mode::ModeHandler,
    queries::{
        EndOfWhoHandler, EndOfWhoisHandler, WhoReplyHandler, WhoisAccountHandler, WhoisUserHandler,
    },
};
use super::session::SessionState;
use crate::db::BanMode;
use crate::error::SessionError;

/// Per-message view handed to a handler.
pub struct Context<'a> {
    pub bot: &'a Arc<Bot>,
    pub state: &'a mut SessionState,
    /// Tasks that die with the session.
    pub tasks: &'a mut JoinSet<()>,
}

pub type HandlerResult = Result<(), SessionError>;

#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult;
}

/// Numeric replies the registry handles. All must be in the numeric table.
pub const REQUIRED_NUMERICS: &[&str] = &[
    names::RPL_WELCOME,
    names::RPL_ISUPPORT,
    names::RPL_WHOREPLY,
    names::RPL_ENDOFWHO,
    names::RPL_WHOISUSER,
    names::RPL_WHOISACCOUNT,
    names::RPL_ENDOFWHOIS,
    names::RPL_BANLIST,
    names::RPL_ENDOFBANLIST,
    names::RPL_QUIETLIST,
    names::RPL_ENDOFQUIETLIST,
];

pub struct Registry {
    handlers: HashMap<&'static str, Box<dyn Handler>>,
    numerics: NumericTable,
}

impl Registry {
    /// Build the registry, failing if `numerics` lacks a reply we handle.
    pub fn new(numerics: NumericTable, commands: BotCommands) -> Result<Self, SessionError> {
        let missing = numerics.missing(REQUIRED_NUMERICS.iter().copied());
        if !missing.is_empty() {
            return Err(SessionError::MissingNumerics(missing));
        }

        let mut handlers: HashMap<&'static str, Box<dyn Handler>> = HashMap::new();

        // Connection
        handlers.insert(names::RPL_WELCOME, Box::new(WelcomeHandler));
        handlers.insert(names::RPL_ISUPPORT, Box::new(IsupportHandler));
        handlers.insert(names::ERR_NICKNAMEINUSE, Box::new(NickInUseHandler));
        handlers.insert("PING", Box::new(PingHandler));
        handlers.insert("PONG", Box::new(PongHandler));
        handlers.insert("ERROR", Box::new(ErrorHandler));

        // Membership
        handlers.insert("JOIN", Box::new(JoinHandler));
        handlers.insert("PART", Box::new(PartHandler));
        handlers.insert("KICK", Box::new(KickHandler));
        handlers.insert("QUIT", Box::new(QuitHandler));
        handlers.insert("NICK", Box::new(NickHandler));
        handlers.insert("INVITE", Box::new(InviteHandler));
        handlers.insert(names::RPL_WHOREPLY, Box::new(WhoReplyHandler));
        handlers.insert(names::RPL_ENDOFWHO, Box::new(EndOfWhoHandler));

        // Bans
        handlers.insert("MODE", Box::new(ModeHandler));
        handlers.insert(names::RPL_BANLIST, Box::new(BanListHandler::new(BanMode::Ban)));
        handlers.insert(names::RPL_QUIETLIST, Box::new(BanListHandler::new(BanMode::Quiet)));
        handlers.insert(names::RPL_ENDOFBANLIST, Box::new(EndOfBanListHandler::new(BanMode::Ban)));
        handlers.insert(
            names::RPL_ENDOFQUIETLIST,
            Box::new(EndOfBanListHandler::new(BanMode::Quiet)),
        );

        // WHOIS
        handlers.insert(names::RPL_WHOISUSER, Box::new(WhoisUserHandler));
        handlers.insert(names::RPL_WHOISACCOUNT, Box::new(WhoisAccountHandler));
        handlers.insert(names::RPL_ENDOFWHOIS, Box::new(EndOfWhoisHandler));

        // Messaging
        handlers.insert("PRIVMSG", Box::new(PrivmsgHandler::new(commands)));
        handlers.insert("NOTICE", Box::new(NoticeHandler));

        Ok(Self { handlers, numerics })
    }

    /// Dispatch a message to its handler. Unhandled messages are ignored.
    pub async fn dispatch(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        let name = match &msg.command {
            Command::Response(code, _) => match self.numerics.name(*code) {
                Some(name) => name.to_owned(),
                None => return Ok(()),
            },
            other => other.name(),
        };

        let Some(handler) = self.handlers.get(name.as_str()) else {
            return Ok(());
        };

        let irc_span = span!(
            Level::DEBUG,
            "irc.event",
            event = %name,
            source = msg.source_nickname(),
        );
        handler.handle(ctx, msg).instrument(irc_span).await
    }
}

/// Parameters of a numeric or raw command.
pub(crate) fn params(msg: &Message) -> &[String] {
    match &msg.command {
        Command::Response(_, params) | Command::Raw(_, params) => params,
        _ => &[],
    }
}
