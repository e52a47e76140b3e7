//! Integration test common infrastructure.
//!
//! A [`FakeServer`] drives a real [`warden::irc::Session`] over an
//! in-process wire and an in-memory ledger.

pub mod server;
pub mod wire;

#[allow(unused_imports)]
pub use server::*;
