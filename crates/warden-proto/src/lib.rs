//! # warden-proto
//!
//! The client-side slice of the IRC protocol that the warden moderation bot
//! speaks: message parsing and serialization, channel mode parsing driven by
//! the server's `ISUPPORT` advertisement, numeric reply lookup through an
//! explicit [`NumericTable`], RFC 1459 casemapping and hostmask glob matching.
//!
//! With the `tokio` feature (on by default) it also provides [`IrcCodec`] and
//! a framed [`Transport`](transport::Transport) over TCP or client-side TLS.
//!
//! ## Quick Start
//!
//! ```rust
//! use warden_proto::{Command, Message};
//!
//! let msg: Message = ":op!op@staff.example MODE #chan +b troll!*@*".parse().unwrap();
//! assert_eq!(msg.source_nickname(), Some("op"));
//! assert!(matches!(msg.command, Command::MODE(ref target, _) if target == "#chan"));
//!
//! let reply = Message::privmsg("op", "noted");
//! assert_eq!(reply.to_string(), "PRIVMSG op :noted\r\n");
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod casemap;
pub mod command;
pub mod error;
#[cfg(feature = "tokio")]
pub mod irc;
pub mod mask;
pub mod message;
pub mod mode;
pub mod numeric;
mod parser;
pub mod prefix;
#[cfg(feature = "tokio")]
pub mod transport;

pub use self::casemap::{irc_eq, irc_lower_char, irc_to_lower};
pub use self::command::Command;
pub use self::error::{MessageParseError, ProtocolError};
#[cfg(feature = "tokio")]
pub use self::irc::IrcCodec;
pub use self::mask::{account_mask, is_extended_mask, matches_hostmask, wildcard_match};
pub use self::message::{Message, Tag};
pub use self::mode::{ChannelModeSpec, Mode};
pub use self::numeric::NumericTable;
pub use self::prefix::Prefix;
#[cfg(feature = "tokio")]
pub use self::transport::Transport;
