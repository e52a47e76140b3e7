//! Per-channel ordering gates.
//!
//! Roster updates and ban matching for a channel must not interleave: a
//! match has to see every join that arrived before the mode change. Both
//! sides close the channel's gate around their work.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use warden_proto::irc_to_lower;

/// Holding one keeps the channel closed to other gated work.
pub type GateGuard = OwnedMutexGuard<()>;

#[derive(Default)]
pub struct ChannelGates {
    gates: DashMap<String, Arc<Mutex<()>>>,
}

impl ChannelGates {
    pub fn new() -> Self {
        Self::default()
    }

    fn gate(&self, channel: &str) -> Arc<Mutex<()>> {
        Arc::clone(
            self.gates
                .entry(irc_to_lower(channel))
                .or_default()
                .value(),
        )
    }

    /// Wait until `channel` is free, then hold it.
    pub async fn close(&self, channel: &str) -> GateGuard {
        self.gate(channel).lock_owned().await
    }

    /// Hold every known channel, for updates that span all of them.
    ///
    /// Gates are taken in name order so two callers cannot deadlock.
    pub async fn close_all(&self) -> Vec<GateGuard> {
        let mut gates: Vec<(String, Arc<Mutex<()>>)> = self
            .gates
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();
        gates.sort_by(|a, b| a.0.cmp(&b.0));

        let mut guards = Vec::with_capacity(gates.len());
        for (_, gate) in gates {
            guards.push(gate.lock_owned().await);
        }
        guards
    }
}
