//! Follow-up conversation with an operator who just set a ban.
//!
//! The operator is told who the mask hits. When the hits resolve to
//! services accounts the bot offers to narrow the mask to an account, and
//! every dialog ends with a link to the web form for the ban's reason and
//! expiry.

use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use warden_proto::{account_mask, irc_eq};

use super::bans::{Actor, BanChange};
use super::bot::Bot;
use super::correlator::{NickKey, Pending};
use super::ops::OpsLost;
use super::whois::WhoisResult;
use crate::db::DbError;

/// Matches beyond this many are only summarized.
pub const MAX_LISTED_MATCHES: usize = 5;

/// Reply that declines narrowing the mask.
pub const NONE_REPLY: &str = "(none)";

#[derive(Debug, Error)]
pub enum DialogError {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    OpsLost(#[from] OpsLost),
}

/// Live users matching the mask, grouped by account in first-seen order.
type AccountGroups<'a> = Vec<(Option<&'a str>, Vec<&'a WhoisResult>)>;

pub struct BanDialog {
    bot: Arc<Bot>,
    ban_id: i64,
    change: BanChange,
    setter: Actor,
    /// Nicks on the channel matching the mask; `None` for extended masks.
    matches: Option<Vec<String>>,
}

impl BanDialog {
    pub fn new(
        bot: Arc<Bot>,
        ban_id: i64,
        change: BanChange,
        setter: Actor,
        matches: Option<Vec<String>>,
    ) -> Self {
        Self {
            bot,
            ban_id,
            change,
            setter,
            matches,
        }
    }

    pub async fn run(mut self) {
        if let Err(e) = self.converse().await {
            warn!(error = %e, "ban dialog abandoned");
        }
    }

    async fn converse(&mut self) -> Result<(), DialogError> {
        if let Some(matches) = self.matches.take() {
            match matches.len() {
                0 => self.tell(&format!(
                    "fyi: nobody on {} matches the mask '{}'",
                    self.change.channel, self.change.mask
                )),
                n if n > MAX_LISTED_MATCHES => self.tell(&format!(
                    "fyi: more than {} nicks on {} match the mask '{}', including: {}",
                    MAX_LISTED_MATCHES,
                    self.change.channel,
                    self.change.mask,
                    matches[..MAX_LISTED_MATCHES].join(", ")
                )),
                _ => self.narrow(&matches).await?,
            }
        }

        let token = self.bot.db.add_ban_auth(self.ban_id).await?;
        let link = self
            .bot
            .config
            .web
            .link(&format!("/bans/edit/{}/{}", self.ban_id, token));
        self.tell(&format!(
            "to enter and edit details about this ban, please visit {link}"
        ));
        Ok(())
    }

    /// WHOIS every match and offer a narrower mask where one makes sense.
    async fn narrow(&mut self, matches: &[String]) -> Result<(), DialogError> {
        let mut infos = Vec::with_capacity(matches.len());
        for nick in matches {
            infos.push(self.bot.whois.whois(&self.bot.outbox, nick).await);
        }

        let groups = group_by_account(&infos);
        if needs_disambiguation(&groups) {
            if let Some(choice) = self.ask_which(&groups, &infos).await {
                let new_mask = match &choice.account {
                    Some(account) => account_mask(account),
                    None => format!("{}!*@*", choice.nick),
                };
                self.rewrite(new_mask).await?;
            }
        } else if let [(Some(account), _)] = groups.as_slice() {
            let account = (*account).to_owned();
            if self.ask_rewrite(&account).await {
                self.rewrite(account_mask(&account)).await?;
            }
        }
        Ok(())
    }

    /// Ask which nick the mask was meant for. `None` leaves the mask alone.
    async fn ask_which(&self, groups: &AccountGroups<'_>, infos: &[WhoisResult]) -> Option<WhoisResult> {
        let affected = groups
            .iter()
            .map(|(account, members)| {
                let nicks: Vec<&str> = members.iter().map(|m| m.nick.as_str()).collect();
                format!("{} ({})", account.unwrap_or("[no account]"), nicks.join(", "))
            })
            .collect::<Vec<_>>()
            .join(", ");
        let choices = infos
            .iter()
            .map(|info| info.nick.as_str())
            .chain(std::iter::once(NONE_REPLY))
            .collect::<Vec<_>>()
            .join(", ");

        let mut pending = self.listen().await;
        self.tell(&format!(
            "fyi: more than one account on {} matches the mask '{}', including: {}",
            self.change.channel, self.change.mask, affected
        ));
        self.tell(&format!(
            "reply with a nickname to disambiguate the mask, or \"{NONE_REPLY}\" (without quotes, with parentheses) to ignore this warning."
        ));

        loop {
            let reply = match pending.wait(self.bot.timings.prompt_timeout).await {
                Ok(reply) => reply.trim().to_owned(),
                Err(_) => {
                    self.tell("timeout; not disambiguating.");
                    return None;
                }
            };
            if reply == NONE_REPLY {
                return None;
            }
            if let Some(info) = infos.iter().find(|info| irc_eq(&info.nick, &reply)) {
                return Some(info.clone());
            }
            pending = self.listen().await;
            self.tell(&format!("'{reply}' is not one of: {choices}"));
        }
    }

    /// Ask whether to switch to an account mask. Silence counts as yes.
    async fn ask_rewrite(&self, account: &str) -> bool {
        let pending = self.listen().await;
        self.tell(&format!(
            "the mask '{}' on {} matches only one account ({}). change this to a per-account mask? (y/n)",
            self.change.mask, self.change.channel, account
        ));
        match pending.wait(self.bot.timings.prompt_timeout).await {
            Ok(reply) => reply.trim().to_lowercase().starts_with('y'),
            Err(_) => {
                self.tell("timeout; changing to per-account mask.");
                true
            }
        }
    }

    /// Swap the live mask for `new_mask` and track the new one.
    ///
    /// The old row is closed when our own `-b` comes back from the server.
    async fn rewrite(&mut self, new_mask: String) -> Result<(), DialogError> {
        self.bot
            .ops
            .ensure_ops(&self.bot.outbox, &self.change.channel)
            .await?;

        self.tell(&format!(
            "updating '{}' to '{}'.",
            self.change.mask, new_mask
        ));
        let letter = self.change.mode.letter();
        self.bot
            .outbox
            .mode(&self.change.channel, &format!("+{letter}"), &new_mask);
        self.bot
            .outbox
            .mode(&self.change.channel, &format!("-{letter}"), &self.change.mask);

        let policy = self.bot.policy(&self.change.channel);
        self.ban_id = self
            .bot
            .db
            .add_ban(
                &self.change.channel,
                &self.setter.hostmask,
                &new_mask,
                self.change.mode,
                policy.default_ban_duration(),
            )
            .await?;
        info!(old = %self.change.mask, new = %new_mask, id = self.ban_id, "mask rewritten");
        self.change.mask = new_mask;
        Ok(())
    }

    async fn listen(&self) -> Pending<NickKey, String> {
        self.bot
            .prompts
            .register(NickKey::new(&self.setter.nick))
            .await
    }

    fn tell(&self, text: &str) {
        self.bot.outbox.msg(&self.setter.nick, text);
    }
}

/// More than one identity is hit and at least one of them is an account.
///
/// Each account is one identity; each nick without an account is its own.
fn needs_disambiguation(groups: &AccountGroups<'_>) -> bool {
    let identities: usize = groups
        .iter()
        .map(|(account, members)| if account.is_some() { 1 } else { members.len() })
        .sum();
    identities > 1 && groups.iter().any(|(account, _)| account.is_some())
}

fn group_by_account(infos: &[WhoisResult]) -> AccountGroups<'_> {
    let mut groups: AccountGroups<'_> = Vec::new();
    for info in infos {
        let account = info.account.as_deref();
        match groups.iter_mut().find(|(a, _)| *a == account) {
            Some((_, members)) => members.push(info),
            None => groups.push((account, vec![info])),
        }
    }
    groups
}
