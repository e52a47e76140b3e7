//! warden: an IRC moderation bot that keeps a ledger of channel bans.
//!
//! The bot watches `+b`/`+q` changes on channels it sits in, records them,
//! asks the operator who set each ban for details, lifts bans when they
//! expire, and serves the ledger over a small JSON API.

pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod irc;
pub mod supervisor;
pub mod telemetry;
