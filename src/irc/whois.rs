//! WHOIS lookups.
//!
//! One WHOIS is in flight at a time. `RPL_WHOISUSER` and `RPL_WHOISACCOUNT`
//! are collated into a [`WhoisResult`] that `RPL_ENDOFWHOIS` hands to the
//! waiting caller.

use parking_lot::Mutex;
use std::time::Duration;
use tracing::{debug, warn};
use warden_proto::{Message, irc_eq};

use super::correlator::RequestCorrelator;
use super::outbox::Outbox;

/// What the server told us about a nick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WhoisResult {
    pub nick: String,
    pub user: Option<String>,
    pub host: Option<String>,
    pub realname: Option<String>,
    /// Services account, if logged in.
    pub account: Option<String>,
}

impl WhoisResult {
    /// A result carrying nothing but the nick, used when the server says
    /// nothing useful.
    pub fn nick_only(nick: &str) -> Self {
        Self {
            nick: nick.to_owned(),
            ..Default::default()
        }
    }
}

#[derive(Default)]
struct Collation {
    requested: Option<String>,
    current: Option<WhoisResult>,
}

pub struct WhoisCorrelator {
    requests: RequestCorrelator<(), WhoisResult>,
    collation: Mutex<Collation>,
    timeout: Duration,
}

impl WhoisCorrelator {
    pub fn new(timeout: Duration) -> Self {
        Self {
            requests: RequestCorrelator::new(),
            collation: Mutex::new(Collation::default()),
            timeout,
        }
    }

    /// Look up `nick`. Never fails: a lookup that goes unanswered yields
    /// [`WhoisResult::nick_only`].
    pub async fn whois(&self, outbox: &Outbox, nick: &str) -> WhoisResult {
        let pending = self.requests.register(()).await;
        {
            let mut collation = self.collation.lock();
            collation.requested = Some(nick.to_owned());
            collation.current = None;
        }
        outbox.send(Message::whois(nick));

        match pending.wait(self.timeout).await {
            Ok(result) => result,
            Err(e) => {
                warn!(nick = %nick, error = %e, "WHOIS unanswered");
                WhoisResult::nick_only(nick)
            }
        }
    }

    /// `RPL_WHOISUSER`: `<me> <nick> <user> <host> * :<realname>`
    pub fn on_whois_user(&self, params: &[String]) {
        if params.len() < 4 {
            return;
        }
        let realname = (params.len() >= 6).then(|| params[params.len() - 1].clone());
        self.collation.lock().current = Some(WhoisResult {
            nick: params[1].clone(),
            user: Some(params[2].clone()),
            host: Some(params[3].clone()),
            realname,
            account: None,
        });
    }

    /// `RPL_WHOISACCOUNT`: `<me> <nick> <account> :is logged in as`
    pub fn on_whois_account(&self, params: &[String]) {
        if params.len() < 3 {
            return;
        }
        let mut collation = self.collation.lock();
        let current = collation
            .current
            .get_or_insert_with(|| WhoisResult::nick_only(&params[1]));
        if irc_eq(&current.nick, &params[1]) {
            current.account = Some(params[2].clone());
        }
    }

    /// `RPL_ENDOFWHOIS`: `<me> <nick> :End of /WHOIS list.`
    pub fn on_end_of_whois(&self, params: &[String]) {
        let Some(nick) = params.get(1) else {
            return;
        };

        let result = {
            let mut collation = self.collation.lock();
            let current = collation.current.take();
            match collation.requested.take() {
                Some(requested) if irc_eq(&requested, nick) => current
                    .filter(|c| irc_eq(&c.nick, nick))
                    .unwrap_or_else(|| WhoisResult::nick_only(&requested)),
                other => {
                    collation.requested = other;
                    debug!(nick = %nick, "discarding unrequested WHOIS reply");
                    return;
                }
            }
        };

        if !self.requests.deliver(&(), result) {
            debug!(nick = %nick, "WHOIS reply arrived after its caller gave up");
        }
    }
}
