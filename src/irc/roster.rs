//! Who is on each channel, under which `user@host`.
//!
//! Roster events are applied in arrival order by a single worker task, each
//! under its channel's gate. A `WHO` listing is buffered until
//! `RPL_ENDOFWHO` and then replaces the channel's roster wholesale.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use warden_proto::irc_to_lower;

use super::gates::ChannelGates;
use crate::db::{DbError, Persistence};

/// One roster change. Channel names are casemapped on submission.
#[derive(Debug)]
pub enum RosterOp {
    Join {
        nick: String,
        host: String,
        channel: String,
    },
    Part {
        nick: String,
        channel: String,
    },
    Quit {
        nick: String,
    },
    Rename {
        old: String,
        new: String,
    },
    Snapshot {
        channel: String,
        users: Vec<(String, String)>,
    },
    /// Answered once everything queued before it has been applied.
    Flush(oneshot::Sender<()>),
}

pub struct RosterTracker {
    tx: mpsc::UnboundedSender<RosterOp>,
    who_replies: Mutex<HashMap<String, Vec<(String, String)>>>,
}

impl RosterTracker {
    /// Start the worker. It runs until every tracker handle is dropped.
    pub fn spawn(db: Arc<dyn Persistence>, gates: Arc<ChannelGates>) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(rx, db, gates));
        (
            Self {
                tx,
                who_replies: Mutex::new(HashMap::new()),
            },
            worker,
        )
    }

    pub fn join(&self, nick: &str, host: &str, channel: &str) {
        self.submit(RosterOp::Join {
            nick: nick.to_owned(),
            host: host.to_owned(),
            channel: irc_to_lower(channel),
        });
    }

    pub fn part(&self, nick: &str, channel: &str) {
        self.submit(RosterOp::Part {
            nick: nick.to_owned(),
            channel: irc_to_lower(channel),
        });
    }

    pub fn quit(&self, nick: &str) {
        self.submit(RosterOp::Quit {
            nick: nick.to_owned(),
        });
    }

    pub fn rename(&self, old: &str, new: &str) {
        self.submit(RosterOp::Rename {
            old: old.to_owned(),
            new: new.to_owned(),
        });
    }

    /// `RPL_WHOREPLY`: buffer one member of `channel`.
    pub fn on_who_reply(&self, channel: &str, nick: &str, user: &str, host: &str) {
        self.who_replies
            .lock()
            .entry(irc_to_lower(channel))
            .or_default()
            .push((nick.to_owned(), format!("{user}@{host}")));
    }

    /// `RPL_ENDOFWHO`: replace the roster of `channel` with what was buffered.
    pub fn on_end_of_who(&self, channel: &str) {
        let channel = irc_to_lower(channel);
        let users = self.who_replies.lock().remove(&channel).unwrap_or_default();
        debug!(channel = %channel, members = users.len(), "roster snapshot");
        self.submit(RosterOp::Snapshot { channel, users });
    }

    /// Wait until every change submitted so far has been applied.
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        self.submit(RosterOp::Flush(tx));
        let _ = rx.await;
    }

    fn submit(&self, op: RosterOp) {
        if self.tx.send(op).is_err() {
            warn!("roster worker is gone, dropping update");
        }
    }
}

async fn run_worker(
    mut rx: mpsc::UnboundedReceiver<RosterOp>,
    db: Arc<dyn Persistence>,
    gates: Arc<ChannelGates>,
) {
    while let Some(op) = rx.recv().await {
        if let Err(e) = apply(op, db.as_ref(), &gates).await {
            warn!(error = %e, "roster update failed");
        }
    }
}

async fn apply(op: RosterOp, db: &dyn Persistence, gates: &ChannelGates) -> Result<(), DbError> {
    match op {
        RosterOp::Join {
            nick,
            host,
            channel,
        } => {
            let _gate = gates.close(&channel).await;
            db.add_user_to_channel(&nick, &host, &channel).await
        }
        RosterOp::Part { nick, channel } => {
            let _gate = gates.close(&channel).await;
            db.remove_nick_from_channel(&nick, &channel).await
        }
        RosterOp::Snapshot { channel, users } => {
            let _gate = gates.close(&channel).await;
            db.set_users_in_channel(&channel, &users).await
        }
        RosterOp::Quit { nick } => {
            let _gates = gates.close_all().await;
            db.remove_nick_from_channels(&nick).await
        }
        RosterOp::Rename { old, new } => {
            let _gates = gates.close_all().await;
            db.rename_nick(&old, &new).await
        }
        RosterOp::Flush(done) => {
            let _ = done.send(());
            Ok(())
        }
    }
}
