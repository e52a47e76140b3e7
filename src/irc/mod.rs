//! The IRC side of the bot.
//!
//! A [`Session`] owns one connection. Inbound lines are dispatched in
//! arrival order through the [`dispatch::Registry`]; ban changes update the
//! ledger inline, while conversations with operators, timers and the expiry
//! sweep run as tasks that end with the session.

pub mod bans;
pub mod bot;
pub mod commands;
pub mod connection;
pub mod correlator;
pub mod dialog;
pub mod dispatch;
pub mod expiry;
pub mod gates;
mod handlers;
pub mod ops;
pub mod outbox;
pub mod policy;
pub mod roster;
pub mod session;
pub mod whois;

pub use bot::{Bot, Timings};
pub use connection::{Wire, connect};
pub use session::Session;
