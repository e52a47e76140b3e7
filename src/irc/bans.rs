//! Keeping the ledger in step with live ban and quiet lists.

use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{Instrument, debug, info, warn};
use warden_proto::{irc_to_lower, is_extended_mask};

use super::bot::Bot;
use super::dialog::BanDialog;
use crate::db::{BanMode, ListedBan};
use crate::telemetry::spans;

/// A `+b`, `-b`, `+q` or `-q` seen on a channel.
///
/// The ledger keys rows by casemapped channel, like the roster does;
/// [`sync_change`] casemaps `channel` before touching either.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BanChange {
    pub channel: String,
    pub mode: BanMode,
    pub set: bool,
    pub mask: String,
}

/// Who made a change: their nick and full `nick!user@host`.
#[derive(Debug, Clone)]
pub struct Actor {
    pub nick: String,
    pub hostmask: String,
}

/// Record a live list change in the ledger and follow up with whoever made
/// it. Annotation dialogs are spawned onto `tasks`.
pub async fn sync_change(bot: &Arc<Bot>, tasks: &mut JoinSet<()>, actor: &Actor, mut change: BanChange) {
    change.channel = irc_to_lower(&change.channel);
    let policy = bot.policy(&change.channel);
    if !policy.have_ops {
        return;
    }
    let from_me = bot.is_me(&actor.nick);
    if change.set && from_me {
        return;
    }

    // Every roster event dispatched before this change must land before the
    // ledger and roster are read together.
    bot.roster.flush().await;
    let gate = bot.gates.close(&change.channel).await;

    if change.set {
        let id = match bot
            .db
            .add_ban(
                &change.channel,
                &actor.hostmask,
                &change.mask,
                change.mode,
                policy.default_ban_duration(),
            )
            .await
        {
            Ok(id) => id,
            Err(e) => {
                warn!(channel = %change.channel, mask = %change.mask, error = %e, "failed to record ban");
                return;
            }
        };
        info!(channel = %change.channel, mask = %change.mask, mode = %change.mode, id, "ban recorded");

        let matches = if is_extended_mask(&change.mask) {
            None
        } else {
            match bot
                .db
                .check_mask(&change.channel, &change.mask)
                .await
            {
                Ok(nicks) => Some(nicks),
                Err(e) => {
                    warn!(channel = %change.channel, mask = %change.mask, error = %e, "failed to match mask");
                    return;
                }
            }
        };
        drop(gate);

        let span = spans::dialog(&change.channel, &change.mask, &actor.nick);
        let dialog = BanDialog::new(Arc::clone(bot), id, change, actor.clone(), matches);
        tasks.spawn(dialog.run().instrument(span));
        return;
    }

    let prior = match bot
        .db
        .remove_ban(&change.channel, &actor.hostmask, &change.mask, change.mode)
        .await
    {
        Ok(prior) => prior,
        Err(e) => {
            warn!(channel = %change.channel, mask = %change.mask, error = %e, "failed to record unban");
            return;
        }
    };
    drop(gate);

    let Some(prior) = prior.first() else {
        debug!(channel = %change.channel, mask = %change.mask, "unset of untracked mask");
        return;
    };
    if from_me {
        return;
    }

    let setter = prior.set_by.split('!').next().unwrap_or_default();
    if setter.is_empty() || bot.is_me(setter) {
        return;
    }
    bot.outbox.msg(
        setter,
        &format!(
            "fyi: {} removed \"+{} {}\" on {}, which you set {}; it was due to expire {}.",
            actor.nick,
            change.mode.letter(),
            change.mask,
            change.channel,
            describe_time(Some(prior.set_at)),
            describe_time(prior.expire_at),
        ),
    );
}

/// Reconcile a collated ban or quiet list with the ledger.
pub async fn reconcile_list(bot: &Bot, channel: &str, mode: BanMode, listed: Vec<ListedBan>) {
    let channel = irc_to_lower(channel);
    let policy = bot.policy(&channel);
    let listed = bot.setter_policy.retain_user_set(listed);
    match bot
        .db
        .ensure_active_bans(&channel, mode, &listed, policy.default_ban_duration())
        .await
    {
        Ok(0) => {}
        Ok(inserted) => info!(channel = %channel, mode = %mode, inserted, "pulled bans from list"),
        Err(e) => warn!(channel = %channel, mode = %mode, error = %e, "failed to reconcile list"),
    }
}

/// Human-readable UTC timestamp, or "never".
pub fn describe_time(timestamp: Option<i64>) -> String {
    timestamp
        .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0))
        .map(|when| when.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "never".to_owned())
}
