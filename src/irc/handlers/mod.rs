//! Handlers for the events the bot reacts to.

pub mod channel;
pub mod connection;
pub mod lists;
pub mod messaging;
pub mod mode;
pub mod queries;

use warden_proto::Message;

/// Sender of `msg` as `(nick, user@host)`, for user prefixes only.
pub(crate) fn source_user(msg: &Message) -> Option<(&str, String)> {
    match msg.prefix.as_ref()? {
        warden_proto::Prefix::Nickname(nick, user, host) => Some((nick.as_str(), format!("{user}@{host}"))),
        warden_proto::Prefix::ServerName(_) => None,
    }
}
