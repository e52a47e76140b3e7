//! Lifting bans whose time is up.

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::bot::Bot;
use crate::db::ExpiredBan;

/// One pass over the ledger: for each channel we may act in, get ops and
/// unset every expired mask.
///
/// The `-b`/`-q` echoes close the ledger rows like any other unset.
pub async fn sweep(bot: Arc<Bot>) {
    let expired = match bot.db.get_expired_bans().await {
        Ok(expired) => expired,
        Err(e) => {
            warn!(error = %e, "failed to read expired bans");
            return;
        }
    };
    if expired.is_empty() {
        return;
    }

    for (channel, bans) in group_by_channel(expired) {
        if !bot.policy(&channel).have_ops {
            debug!(channel = %channel, "no ops configured, leaving expired bans");
            continue;
        }

        let opped = tokio::time::timeout(
            bot.timings.sweep_ops_timeout,
            bot.ops.ensure_ops(&bot.outbox, &channel),
        )
        .await;
        match opped {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(channel = %channel, error = %e, "skipping expiry");
                continue;
            }
            Err(_) => {
                warn!(channel = %channel, "ops never arrived, retrying next sweep");
                bot.ops.abandon(&channel);
                continue;
            }
        }

        for ban in bans {
            info!(channel = %channel, mask = %ban.mask, mode = %ban.mode, "lifting expired ban");
            bot.outbox
                .mode(&channel, &format!("-{}", ban.mode.letter()), &ban.mask);
        }
    }
}

/// Split rows (already ordered by channel) into per-channel runs.
fn group_by_channel(expired: Vec<ExpiredBan>) -> Vec<(String, Vec<ExpiredBan>)> {
    let mut groups: Vec<(String, Vec<ExpiredBan>)> = Vec::new();
    for ban in expired {
        if let Some((channel, bans)) = groups.last_mut()
            && *channel == ban.channel
        {
            bans.push(ban);
            continue;
        }
        groups.push((ban.channel.clone(), vec![ban]));
    }
    groups
}
