//! Channel operator status.
//!
//! The bot only holds ops while it needs them. [`OpsTracker::ensure_ops`]
//! asks ChanServ once per channel and lets any number of callers wait for
//! the resulting `+o`; losing ops forgets the channel so the next caller
//! asks again.

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tokio::sync::watch;
use tracing::debug;
use warden_proto::irc_to_lower;

use super::outbox::Outbox;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("lost ops on {0} while waiting for them")]
pub struct OpsLost(pub String);

#[derive(Default)]
pub struct OpsTracker {
    requests: Mutex<HashMap<String, watch::Sender<bool>>>,
    opped: Mutex<HashSet<String>>,
}

impl OpsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve once the bot is opped on `channel`, asking ChanServ if
    /// nobody has yet.
    pub async fn ensure_ops(&self, outbox: &Outbox, channel: &str) -> Result<(), OpsLost> {
        let mut rx = {
            let mut requests = self.requests.lock();
            match requests.get(&irc_to_lower(channel)) {
                Some(tx) => tx.subscribe(),
                None => {
                    let (tx, rx) = watch::channel(false);
                    requests.insert(irc_to_lower(channel), tx);
                    debug!(channel = %channel, "requesting ops");
                    outbox.msg("ChanServ", &format!("op {channel}"));
                    rx
                }
            }
        };

        rx.wait_for(|opped| *opped)
            .await
            .map(|_| ())
            .map_err(|_| OpsLost(channel.to_owned()))
    }

    /// Drop an unanswered request for `channel` so the next
    /// [`ensure_ops`](Self::ensure_ops) asks ChanServ again.
    ///
    /// Does nothing once the bot holds ops there. Callers still waiting on
    /// the dropped request fail with [`OpsLost`].
    pub fn abandon(&self, channel: &str) {
        let key = irc_to_lower(channel);
        let mut requests = self.requests.lock();
        if requests.get(&key).is_some_and(|tx| !*tx.borrow()) {
            requests.remove(&key);
            debug!(channel = %channel, "abandoned ops request");
        }
    }

    /// Record `+o`/`-o` on the bot itself.
    ///
    /// Returns true when this `+o` took the bot from not opped to opped.
    pub fn on_self_op(&self, channel: &str, opped: bool) -> bool {
        let key = irc_to_lower(channel);
        if !opped {
            self.requests.lock().remove(&key);
            self.opped.lock().remove(&key);
            return false;
        }

        let mut requests = self.requests.lock();
        match requests.get(&key) {
            Some(tx) => {
                tx.send_replace(true);
            }
            None => {
                let (tx, _) = watch::channel(true);
                requests.insert(key.clone(), tx);
            }
        }
        drop(requests);

        self.opped.lock().insert(key)
    }

    /// Channels the bot currently holds ops on, casemapped.
    pub fn opped_channels(&self) -> Vec<String> {
        let mut channels: Vec<String> = self.opped.lock().iter().cloned().collect();
        channels.sort();
        channels
    }

    pub fn is_opped(&self, channel: &str) -> bool {
        self.opped.lock().contains(&irc_to_lower(channel))
    }
}
