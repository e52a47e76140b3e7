//! Follow-up conversations with the operator who set a ban.

mod common;

use common::{
    BOT, CHANNEL, FakeServer, Member, edit_link, is_mode, is_privmsg_to, privmsg, test_timings,
};
use std::time::Duration;
use warden::irc::Timings;
use warden_proto::Command;

const OP: &str = "opnick";
const OP_PREFIX: &str = "opnick!op@staff.test";
const LINK: &str = "to enter and edit details about this ban, please visit ";

const ALICE: Member = Member::new("alice", "alice.host", Some("alice"));
const BOB: Member = Member::new("bob", "bob.host", Some("bob"));

/// Next `PRIVMSG` to the operator, answering any `WHOIS` on the way.
async fn next_to_op(server: &mut FakeServer) -> String {
    loop {
        let msg = server.recv_answering_whois().await.unwrap();
        if let Some((target, text)) = privmsg(&msg)
            && target == OP
        {
            return text.to_owned();
        }
    }
}

fn short_prompts() -> Timings {
    Timings {
        prompt_timeout: Duration::from_millis(300),
        ..test_timings()
    }
}

async fn grant_ops(server: &mut FakeServer) {
    server
        .recv_until(|msg| is_privmsg_to(msg, "ChanServ", "op #chan"))
        .await
        .unwrap();
    server.send(&format!(":ChanServ!ChanServ@services.test MODE {CHANNEL} +o {BOT}"));
}

async fn active_masks(server: &FakeServer) -> Vec<String> {
    let mut masks: Vec<String> = server
        .db
        .bans()
        .get_active_bans()
        .await
        .unwrap()
        .into_iter()
        .map(|ban| ban.mask)
        .collect();
    masks.sort();
    masks
}

#[tokio::test]
async fn test_unaccounted_matches_skip_to_edit_link() {
    let mut server = FakeServer::start(test_timings()).await.unwrap();
    server
        .sign_on(&[
            Member::new("anon1", "shared.host", None),
            Member::new("anon2", "shared.host", None),
        ])
        .await
        .unwrap();

    server.send(&format!(":{OP_PREFIX} MODE {CHANNEL} +b *!*@shared.host"));

    let first = next_to_op(&mut server).await;
    assert!(first.starts_with(LINK), "{first}");
    assert!(edit_link(&first).is_some());
    assert_eq!(active_masks(&server).await, ["*!*@shared.host"]);
}

#[tokio::test]
async fn test_disambiguation_declined_with_none() {
    let mut server = FakeServer::start(test_timings()).await.unwrap();
    server.sign_on(&[ALICE, BOB]).await.unwrap();

    server.send(&format!(":{OP_PREFIX} MODE {CHANNEL} +b *!*@*.host"));

    assert_eq!(
        next_to_op(&mut server).await,
        "fyi: more than one account on #chan matches the mask '*!*@*.host', including: alice (alice), bob (bob)"
    );
    let instructions = next_to_op(&mut server).await;
    assert!(instructions.starts_with("reply with a nickname"), "{instructions}");

    server.send(&format!(":{OP_PREFIX} PRIVMSG {BOT} :(none)"));
    let link = next_to_op(&mut server).await;
    assert!(link.starts_with(LINK), "{link}");
    assert_eq!(active_masks(&server).await, ["*!*@*.host"]);
}

#[tokio::test]
async fn test_disambiguation_reprompts_then_narrows_to_account() {
    let mut server = FakeServer::start(test_timings()).await.unwrap();
    server.sign_on(&[ALICE, BOB]).await.unwrap();

    server.send(&format!(":{OP_PREFIX} MODE {CHANNEL} +b *!*@*.host"));
    next_to_op(&mut server).await;
    next_to_op(&mut server).await;

    server.send(&format!(":{OP_PREFIX} PRIVMSG {BOT} :zed"));
    assert_eq!(
        next_to_op(&mut server).await,
        "'zed' is not one of: alice, bob, (none)"
    );

    server.send(&format!(":{OP_PREFIX} PRIVMSG {BOT} :Bob"));
    grant_ops(&mut server).await;
    assert_eq!(
        next_to_op(&mut server).await,
        "updating '*!*@*.host' to '$a:bob'."
    );
    server
        .recv_until(|msg| is_mode(msg, CHANNEL, "+b", "$a:bob"))
        .await
        .unwrap();
    server
        .recv_until(|msg| is_mode(msg, CHANNEL, "-b", "*!*@*.host"))
        .await
        .unwrap();
    let link = next_to_op(&mut server).await;
    let (id, _) = edit_link(&link).unwrap();

    let active = server.db.bans().get_active_bans().await.unwrap();
    let rewritten = active.iter().find(|ban| ban.mask == "$a:bob").unwrap();
    assert_eq!(rewritten.id, id);
    assert_eq!(rewritten.set_by, OP_PREFIX);
}

#[tokio::test]
async fn test_chosen_nick_without_account_gets_nick_mask() {
    let mut server = FakeServer::start(test_timings()).await.unwrap();
    server
        .sign_on(&[
            Member::new("alice", "shared.host", Some("alice")),
            Member::new("anon", "shared.host", None),
        ])
        .await
        .unwrap();

    server.send(&format!(":{OP_PREFIX} MODE {CHANNEL} +b *!*@shared.host"));
    assert_eq!(
        next_to_op(&mut server).await,
        "fyi: more than one account on #chan matches the mask '*!*@shared.host', including: alice (alice), [no account] (anon)"
    );
    next_to_op(&mut server).await;

    server.send(&format!(":{OP_PREFIX} PRIVMSG {BOT} :anon"));
    grant_ops(&mut server).await;
    server
        .recv_until(|msg| is_mode(msg, CHANNEL, "+b", "anon!*@*"))
        .await
        .unwrap();
    server
        .recv_until(|msg| is_mode(msg, CHANNEL, "-b", "*!*@shared.host"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_disambiguation_timeout_leaves_mask() {
    let mut server = FakeServer::start(short_prompts()).await.unwrap();
    server.sign_on(&[ALICE, BOB]).await.unwrap();

    server.send(&format!(":{OP_PREFIX} MODE {CHANNEL} +b *!*@*.host"));
    next_to_op(&mut server).await;
    next_to_op(&mut server).await;

    assert_eq!(next_to_op(&mut server).await, "timeout; not disambiguating.");
    let link = next_to_op(&mut server).await;
    assert!(link.starts_with(LINK), "{link}");
    assert_eq!(active_masks(&server).await, ["*!*@*.host"]);
}

#[tokio::test]
async fn test_rewrite_timeout_counts_as_yes() {
    let mut server = FakeServer::start(short_prompts()).await.unwrap();
    server.sign_on(&[ALICE]).await.unwrap();

    server.send(&format!(":{OP_PREFIX} MODE {CHANNEL} +b *!*@alice.host"));
    let question = next_to_op(&mut server).await;
    assert!(question.contains("matches only one account (alice)"), "{question}");

    assert_eq!(
        next_to_op(&mut server).await,
        "timeout; changing to per-account mask."
    );
    grant_ops(&mut server).await;
    server
        .recv_until(|msg| is_mode(msg, CHANNEL, "+b", "$a:alice"))
        .await
        .unwrap();
    server
        .recv_until(|msg| is_mode(msg, CHANNEL, "-b", "*!*@alice.host"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_crowded_mask_lists_first_five() {
    let mut server = FakeServer::start(test_timings()).await.unwrap();
    let crowd: Vec<Member> = ["n1", "n2", "n3", "n4", "n5", "n6"]
        .into_iter()
        .map(|nick| Member::new(nick, "crowd.host", None))
        .collect();
    server.sign_on(&crowd).await.unwrap();

    server.send(&format!(":{OP_PREFIX} MODE {CHANNEL} +b *!*@crowd.host"));
    let (skipped, notice) = server
        .recv_until(|msg| privmsg(msg).is_some())
        .await
        .unwrap();
    assert!(!skipped.iter().any(|msg| matches!(msg.command, Command::WHOIS(_))));
    assert_eq!(
        privmsg(&notice),
        Some((
            OP,
            "fyi: more than 5 nicks on #chan match the mask '*!*@crowd.host', including: n1, n2, n3, n4, n5"
        ))
    );
    let link = server.recv().await.unwrap();
    assert!(is_privmsg_to(&link, OP, LINK));
}

#[tokio::test]
async fn test_extended_mask_goes_straight_to_link() {
    let mut server = FakeServer::start(test_timings()).await.unwrap();
    server.sign_on(&[ALICE]).await.unwrap();

    server.send(&format!(":{OP_PREFIX} MODE {CHANNEL} +b $a:troll"));
    let (skipped, first) = server
        .recv_until(|msg| privmsg(msg).is_some())
        .await
        .unwrap();
    assert!(!skipped.iter().any(|msg| matches!(msg.command, Command::WHOIS(_))));
    assert!(is_privmsg_to(&first, OP, LINK));
    assert_eq!(active_masks(&server).await, ["$a:troll"]);
}
