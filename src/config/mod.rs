//! Configuration loading and management.
//!
//! - [`types`]: the top-level [`Config`] and its `[irc]`, `[web]`,
//!   `[database]` and `[bans]` sections
//! - [`channel`]: per-channel policy, merged from `[channels.defaults]` and
//!   `[channels."#name"]`
//! - [`validation`]: startup checks

mod channel;
mod types;
mod validation;

pub use channel::{ChannelPolicy, ChannelSettings, ChannelsConfig, PRIVMSG_POLICY};
pub use types::{BansConfig, Config, ConfigError, DatabaseConfig, IrcConfig, WebConfig};
pub use validation::{ValidationError, validate};
