//! State shared by the dispatch loop and the tasks it spawns.

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use warden_proto::{ChannelModeSpec, irc_eq};

use super::correlator::{NickKey, RequestCorrelator};
use super::gates::ChannelGates;
use super::ops::OpsTracker;
use super::outbox::Outbox;
use super::policy::SetterPolicy;
use super::roster::RosterTracker;
use super::whois::WhoisCorrelator;
use crate::config::{ChannelPolicy, Config};
use crate::db::Persistence;

/// Delays and limits used by a session.
#[derive(Debug, Clone)]
pub struct Timings {
    pub whois_timeout: Duration,
    pub prompt_timeout: Duration,
    /// Upper bound on waiting for ops during an expiry sweep.
    pub sweep_ops_timeout: Duration,
    pub deop_delay: Duration,
    pub redirect_delay: Duration,
    pub sweep_interval: Duration,
    pub ping_interval: Duration,
    /// Unanswered pings tolerated before the connection is dropped.
    pub max_outstanding_pings: u32,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            whois_timeout: Duration::from_secs(30),
            prompt_timeout: Duration::from_secs(20 * 60),
            sweep_ops_timeout: Duration::from_secs(60),
            deop_delay: Duration::from_secs(5 * 60),
            redirect_delay: Duration::from_secs(5),
            sweep_interval: Duration::from_secs(60),
            ping_interval: Duration::from_secs(60),
            max_outstanding_pings: 5,
        }
    }
}

/// Everything a handler, dialog or timer needs to act on the connection.
pub struct Bot {
    pub config: Arc<Config>,
    pub db: Arc<dyn Persistence>,
    pub outbox: Outbox,
    pub timings: Timings,
    pub gates: Arc<ChannelGates>,
    pub ops: OpsTracker,
    pub whois: WhoisCorrelator,
    /// Private-message replies awaited from operators, keyed by nick.
    pub prompts: RequestCorrelator<NickKey, String>,
    pub roster: RosterTracker,
    pub setter_policy: Box<dyn SetterPolicy>,
    nick: RwLock<String>,
    modes: RwLock<ChannelModeSpec>,
}

impl Bot {
    /// Build the shared state and start the roster worker.
    pub fn new(
        config: Arc<Config>,
        db: Arc<dyn Persistence>,
        outbox: Outbox,
        timings: Timings,
        setter_policy: Box<dyn SetterPolicy>,
    ) -> (Self, JoinHandle<()>) {
        let gates = Arc::new(ChannelGates::new());
        let (roster, worker) = RosterTracker::spawn(Arc::clone(&db), Arc::clone(&gates));
        let nick = config.irc.nickname.clone();
        let bot = Self {
            whois: WhoisCorrelator::new(timings.whois_timeout),
            config,
            db,
            outbox,
            timings,
            gates,
            ops: OpsTracker::new(),
            prompts: RequestCorrelator::new(),
            roster,
            setter_policy,
            nick: RwLock::new(nick),
            modes: RwLock::new(ChannelModeSpec::default()),
        };
        (bot, worker)
    }

    /// The nick the server currently knows us by.
    pub fn nick(&self) -> String {
        self.nick.read().clone()
    }

    pub fn set_nick(&self, nick: &str) {
        *self.nick.write() = nick.to_owned();
    }

    pub fn is_me(&self, nick: &str) -> bool {
        irc_eq(&self.nick.read(), nick)
    }

    pub fn policy(&self, channel: &str) -> ChannelPolicy {
        self.config.channel(channel)
    }

    pub fn mode_spec(&self) -> ChannelModeSpec {
        self.modes.read().clone()
    }

    /// Fold one `RPL_ISUPPORT` token into the channel mode table.
    pub fn apply_isupport(&self, token: &str) {
        self.modes.write().apply_isupport(token);
    }

    /// Join every configured channel.
    pub fn autojoin(&self) {
        for channel in &self.config.irc.autojoin {
            self.join(channel);
        }
    }

    /// Join `channel` with its configured key.
    pub fn join(&self, channel: &str) {
        let policy = self.policy(channel);
        self.outbox.join(channel, policy.key.as_deref());
    }
}
