//! Ban ledger workflows driven end to end through a session.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{
    BOT, BOT_PREFIX, CHANNEL, FakeServer, Member, edit_link, is_mode, is_privmsg_to, privmsg,
    test_timings,
};
use http_body_util::BodyExt;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use warden::db::{BanMode, ListedBan, Persistence};
use warden_proto::Command;

const OP: &str = "opnick";
const OP_PREFIX: &str = "opnick!op@staff.test";

const ALICE: Member = Member::new("alice", "alice.host", Some("alice"));
const BOB: Member = Member::new("bob", "bob.host", Some("bob"));

#[tokio::test]
async fn test_zero_match_ban_gets_notice_and_edit_link() {
    let mut server = FakeServer::start(test_timings()).await.unwrap();
    server.sign_on(&[ALICE]).await.unwrap();

    server.send(&format!(":{OP_PREFIX} MODE {CHANNEL} +b troll!*@*"));

    let (_, notice) = server
        .recv_until(|msg| privmsg(msg).is_some())
        .await
        .unwrap();
    assert_eq!(
        privmsg(&notice),
        Some((OP, "fyi: nobody on #chan matches the mask 'troll!*@*'"))
    );

    let link = server.recv().await.unwrap();
    assert!(is_privmsg_to(
        &link,
        OP,
        "to enter and edit details about this ban, please visit "
    ));
    let (id, token) = edit_link(privmsg(&link).unwrap().1).unwrap();

    let active = server.db.bans().get_active_bans().await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, id);
    assert_eq!(active[0].mask, "troll!*@*");
    assert_eq!(active[0].set_by, OP_PREFIX);
    assert!(active[0].unset_at.is_none());

    let app = warden::http::router(Arc::clone(&server.db) as Arc<dyn Persistence>);
    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/bans/edit/{id}/{token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["ban"]["mask"], "troll!*@*");
    assert_eq!(json["ban"]["setBy"], OP);
}

#[tokio::test]
async fn test_bot_own_ban_is_not_recorded_twice() {
    let mut server = FakeServer::start(test_timings()).await.unwrap();
    server.sign_on(&[]).await.unwrap();

    server.send(&format!(":{BOT_PREFIX} MODE {CHANNEL} +b self!*@*"));
    let written = server.sync().await.unwrap();

    assert!(written.iter().all(|msg| privmsg(msg).is_none()));
    assert!(server.db.bans().get_active_bans().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_expiry_sweep_waits_for_ops() {
    let timings = warden::irc::Timings {
        sweep_interval: Duration::from_millis(100),
        ..test_timings()
    };
    let mut server = FakeServer::start(timings).await.unwrap();
    server
        .db
        .bans()
        .add_ban(CHANNEL, OP_PREFIX, "badmask", BanMode::Ban, Some(-3600))
        .await
        .unwrap();
    server.sign_on(&[]).await.unwrap();

    let (before, _) = server
        .recv_until(|msg| is_privmsg_to(msg, "ChanServ", "op #chan"))
        .await
        .unwrap();
    assert!(!before.iter().any(|msg| is_mode(msg, CHANNEL, "-b", "badmask")));

    let waiting = server.drain(Duration::from_millis(300)).await;
    assert!(!waiting.iter().any(|msg| is_mode(msg, CHANNEL, "-b", "badmask")));

    server.send(&format!(":ChanServ!ChanServ@services.test MODE {CHANNEL} +o {BOT}"));
    server
        .recv_until(|msg| is_mode(msg, CHANNEL, "-b", "badmask"))
        .await
        .unwrap();

    server.send(&format!(":{BOT_PREFIX} MODE {CHANNEL} -b badmask"));
    let echoed = server.sync().await.unwrap();
    // An expired row closed by the bot is nobody's business.
    assert!(!echoed.iter().any(|msg| is_privmsg_to(msg, OP, "fyi")));

    let all = server.db.bans().get_all_bans().await.unwrap();
    assert_eq!(all.len(), 1);
    assert!(all[0].unset_at.is_some());
    assert_eq!(all[0].unset_by.as_deref(), Some(BOT_PREFIX));
    assert!(server.db.get_expired_bans().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_banlist_reconcile_inserts_only_missing() {
    let mut server = FakeServer::start(test_timings()).await.unwrap();
    server
        .db
        .bans()
        .add_ban(CHANNEL, OP_PREFIX, "a!*@*", BanMode::Ban, Some(3600))
        .await
        .unwrap();
    server.sign_on(&[]).await.unwrap();

    for _ in 0..2 {
        for mask in ["a!*@*", "b!*@*", "c!*@*"] {
            server.send(&format!(
                ":irc.test 367 {BOT} {CHANNEL} {mask} {OP_PREFIX} 1600000000"
            ));
        }
        // Server-set entries stay out of the ledger.
        server.send(&format!(
            ":irc.test 367 {BOT} {CHANNEL} d!*@* services.freenode.net 1600000000"
        ));
        server.send(&format!(":irc.test 368 {BOT} {CHANNEL} :End of Channel Ban List"));
        server.send(&format!(
            ":irc.test 728 {BOT} {CHANNEL} q quiet!*@* {OP_PREFIX} 1600000000"
        ));
        server.send(&format!(":irc.test 729 {BOT} {CHANNEL} q :End of Channel Quiet List"));
        server.sync().await.unwrap();
    }

    let mut active = server.db.bans().get_active_bans().await.unwrap();
    active.sort_by(|a, b| a.mask.cmp(&b.mask));
    let masks: Vec<(&str, &str)> = active
        .iter()
        .map(|ban| (ban.mask.as_str(), ban.mode.as_str()))
        .collect();
    assert_eq!(
        masks,
        [("a!*@*", "b"), ("b!*@*", "b"), ("c!*@*", "b"), ("quiet!*@*", "q")]
    );

    let today = chrono::Utc::now().format("%Y-%m-%d").to_string();
    assert_eq!(active[0].reason, "");
    for ban in &active[1..] {
        assert_eq!(ban.reason, format!("ban pulled from banlist on {today}"));
        assert_eq!(ban.set_at, 1_600_000_000);
    }
}

#[tokio::test]
async fn test_unset_notifies_original_setter() {
    let mut server = FakeServer::start(test_timings()).await.unwrap();
    server
        .db
        .ensure_active_bans(
            CHANNEL,
            BanMode::Ban,
            &[ListedBan {
                mask: "spam!*@*".to_owned(),
                set_by: OP_PREFIX.to_owned(),
                set_at: 1_600_000_000,
            }],
            None,
        )
        .await
        .unwrap();
    server.sign_on(&[]).await.unwrap();

    // Nothing tracked: no notice.
    server.send(&format!(":other!o@elsewhere.test MODE {CHANNEL} -b ghost!*@*"));
    let written = server.sync().await.unwrap();
    assert!(written.iter().all(|msg| privmsg(msg).is_none()));

    server.send(&format!(":other!o@elsewhere.test MODE {CHANNEL} -b spam!*@*"));
    let written = server.sync().await.unwrap();
    let notice = written
        .iter()
        .find_map(privmsg)
        .expect("setter was not notified");
    assert_eq!(notice.0, OP);
    assert_eq!(
        notice.1,
        "fyi: other removed \"+b spam!*@*\" on #chan, which you set 2020-09-13 12:26:40 UTC; it was due to expire never."
    );
}

#[tokio::test]
async fn test_whois_requests_never_interleave() {
    let mut server = FakeServer::start(test_timings()).await.unwrap();
    server.sign_on(&[ALICE, BOB]).await.unwrap();

    server.send(&format!(":op1!o@staff.test MODE {CHANNEL} +b *!*@alice.host"));
    server.send(&format!(":op2!o@staff.test MODE {CHANNEL} +b *!*@bob.host"));

    let (_, first) = server
        .recv_until(|msg| matches!(msg.command, Command::WHOIS(_)))
        .await
        .unwrap();
    let Command::WHOIS(first_nick) = &first.command else {
        unreachable!()
    };

    let meanwhile = server.drain(Duration::from_millis(300)).await;
    assert!(
        !meanwhile
            .iter()
            .any(|msg| matches!(msg.command, Command::WHOIS(_))),
        "second WHOIS sent before the first completed"
    );

    server.answer_whois(first_nick);
    let (_, second) = server
        .recv_until(|msg| matches!(msg.command, Command::WHOIS(_)))
        .await
        .unwrap();
    let Command::WHOIS(second_nick) = &second.command else {
        unreachable!()
    };
    assert_ne!(first_nick, second_nick);
    server.answer_whois(second_nick);

    // Different operators are asked concurrently.
    let mut asked = Vec::new();
    while asked.len() < 2 {
        let msg = server.recv_answering_whois().await.unwrap();
        if let Some((target, text)) = privmsg(&msg)
            && text.contains("matches only one account")
        {
            asked.push(target.to_owned());
        }
    }
    asked.sort();
    assert_eq!(asked, ["op1", "op2"]);
}

#[tokio::test]
async fn test_dialogs_with_one_operator_are_serialized() {
    let mut server = FakeServer::start(test_timings()).await.unwrap();
    server.sign_on(&[ALICE, BOB]).await.unwrap();

    server.send(&format!(":{OP_PREFIX} MODE {CHANNEL} +b *!*@alice.host"));
    server.send(&format!(":{OP_PREFIX} MODE {CHANNEL} +b *!*@bob.host"));

    let first = server.recv_answering_whois().await.unwrap();
    let (target, question) = privmsg(&first).unwrap();
    assert_eq!(target, OP);
    assert!(question.contains("matches only one account"), "{question}");
    let first_account = if question.contains("(alice)") { "alice" } else { "bob" };

    let meanwhile = server.drain_answering_whois(Duration::from_millis(300)).await;
    assert!(meanwhile.is_empty(), "second dialog spoke early: {meanwhile:?}");

    server.send(&format!(":{OP_PREFIX} PRIVMSG {BOT} :n"));

    let mut link = None;
    let mut second_question = None;
    while link.is_none() || second_question.is_none() {
        let msg = server.recv_answering_whois().await.unwrap();
        let Some((_, text)) = privmsg(&msg) else {
            continue;
        };
        if text.starts_with("to enter and edit") {
            link = Some(text.to_owned());
        } else if text.contains("matches only one account") {
            second_question = Some(text.to_owned());
        }
    }
    let second_question = second_question.unwrap();
    assert!(!second_question.contains(&format!("({first_account})")));

    server.send(&format!(":{OP_PREFIX} PRIVMSG {BOT} :no thanks"));
    let (_, last) = server
        .recv_until(|msg| is_privmsg_to(msg, OP, "to enter and edit"))
        .await
        .unwrap();
    assert!(edit_link(privmsg(&last).unwrap().1).is_some());

    // Declined rewrites leave both host masks in place.
    let masks: Vec<String> = server
        .db
        .bans()
        .get_active_bans()
        .await
        .unwrap()
        .into_iter()
        .map(|ban| ban.mask)
        .collect();
    assert_eq!(masks.len(), 2);
    assert!(masks.contains(&"*!*@alice.host".to_owned()));
    assert!(masks.contains(&"*!*@bob.host".to_owned()));
}

#[tokio::test]
async fn test_accepted_rewrite_switches_to_account_mask() {
    let mut server = FakeServer::start(test_timings()).await.unwrap();
    server.sign_on(&[ALICE]).await.unwrap();

    server.send(&format!(":{OP_PREFIX} MODE {CHANNEL} +b *!*@alice.host"));
    let question = server.recv_answering_whois().await.unwrap();
    assert!(is_privmsg_to(&question, OP, "the mask '*!*@alice.host'"));
    server.send(&format!(":{OP_PREFIX} PRIVMSG {BOT} :yes"));

    server
        .recv_until(|msg| is_privmsg_to(msg, "ChanServ", "op #chan"))
        .await
        .unwrap();
    server.send(&format!(":ChanServ!ChanServ@services.test MODE {CHANNEL} +o {BOT}"));

    server
        .recv_until(|msg| is_mode(msg, CHANNEL, "+b", "$a:alice"))
        .await
        .unwrap();
    server
        .recv_until(|msg| is_mode(msg, CHANNEL, "-b", "*!*@alice.host"))
        .await
        .unwrap();
    server
        .recv_until(|msg| is_privmsg_to(msg, OP, "to enter and edit"))
        .await
        .unwrap();

    server.send(&format!(
        ":{BOT_PREFIX} MODE {CHANNEL} +b-b $a:alice *!*@alice.host"
    ));
    server.sync().await.unwrap();

    let active = server.db.bans().get_active_bans().await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].mask, "$a:alice");
}

#[tokio::test]
async fn test_unanswered_ops_request_is_repeated_next_sweep() {
    let timings = warden::irc::Timings {
        sweep_interval: Duration::from_millis(100),
        sweep_ops_timeout: Duration::from_millis(150),
        ..test_timings()
    };
    let mut server = FakeServer::start(timings).await.unwrap();
    server
        .db
        .bans()
        .add_ban(CHANNEL, OP_PREFIX, "badmask", BanMode::Ban, Some(-3600))
        .await
        .unwrap();
    server.sign_on(&[]).await.unwrap();

    let written = server.drain(Duration::from_millis(1500)).await;
    let requests = written
        .iter()
        .filter(|msg| is_privmsg_to(msg, "ChanServ", "op #chan"))
        .count();
    assert!(requests >= 2, "ChanServ asked {requests} times");
    assert!(!written.iter().any(|msg| is_mode(msg, CHANNEL, "-b", "badmask")));

    server.send(&format!(":ChanServ!ChanServ@services.test MODE {CHANNEL} +o {BOT}"));
    server
        .recv_until(|msg| is_mode(msg, CHANNEL, "-b", "badmask"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_channel_case_shares_ledger_rows() {
    let mut server = FakeServer::start(test_timings()).await.unwrap();
    server.sign_on(&[]).await.unwrap();

    server.send(&format!(":{OP_PREFIX} MODE #Chan +b case!*@*"));
    server.sync().await.unwrap();

    // Listed under the other spelling: already tracked.
    server.send(&format!(
        ":irc.test 367 {BOT} #CHAN case!*@* {OP_PREFIX} 1600000000"
    ));
    server.send(&format!(":irc.test 368 {BOT} #CHAN :End of Channel Ban List"));
    server.sync().await.unwrap();

    let active = server.db.bans().get_active_bans().await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].channel, CHANNEL);

    server.send(&format!(":other!o@elsewhere.test MODE {CHANNEL} -b case!*@*"));
    server.sync().await.unwrap();
    assert!(server.db.bans().get_active_bans().await.unwrap().is_empty());
    assert_eq!(server.db.bans().get_all_bans().await.unwrap().len(), 1);
}
