//! Scripted IRC server driving one bot session.
//!
//! The test plays the server: it feeds raw lines to the session and asserts
//! on the messages the bot writes back.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, timeout};
use warden::config::Config;
use warden::db::{Database, Persistence};
use warden::error::{SessionEnd, SessionError};
use warden::irc::{Session, Timings};
use warden_proto::{Command, Message, NumericTable};

use super::wire::ChannelWire;

pub const BOT: &str = "warden";
pub const BOT_PREFIX: &str = "warden!warden@bot.test";
pub const CHANNEL: &str = "#chan";
pub const WEB_URL: &str = "https://bans.test";

const CONFIG: &str = r##"
[irc]
server = "irc.test"
nickname = "warden"
autojoin = ["#chan"]

[web]
url = "https://bans.test"

[channels.privmsg]
commands = [["allow", "all"]]

[channels."#chan"]
have_ops = true
commands = [["allow", "all"]]
"##;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// A channel member as the server reports it.
#[derive(Clone, Copy)]
pub struct Member {
    pub nick: &'static str,
    pub user: &'static str,
    pub host: &'static str,
    pub account: Option<&'static str>,
}

impl Member {
    pub const fn new(nick: &'static str, host: &'static str, account: Option<&'static str>) -> Self {
        Self {
            nick,
            user: nick,
            host,
            account,
        }
    }
}

/// Timings short enough for tests. Periodic work is pushed out of the way;
/// tests that need it shorten the interval.
pub fn test_timings() -> Timings {
    Timings {
        whois_timeout: Duration::from_secs(5),
        prompt_timeout: Duration::from_secs(10),
        sweep_ops_timeout: Duration::from_secs(5),
        deop_delay: Duration::from_secs(3600),
        redirect_delay: Duration::from_millis(50),
        sweep_interval: Duration::from_secs(3600),
        ping_interval: Duration::from_secs(3600),
        max_outstanding_pings: 5,
    }
}

pub struct FakeServer {
    to_bot: mpsc::UnboundedSender<String>,
    from_bot: mpsc::UnboundedReceiver<Message>,
    pub db: Arc<Database>,
    pub session: JoinHandle<Result<SessionEnd, SessionError>>,
    members: Vec<Member>,
    syncs: u32,
}

impl FakeServer {
    /// Start a session against a fresh in-memory ledger.
    pub async fn start(timings: Timings) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(CONFIG)?;
        let db = Arc::new(Database::new(":memory:").await?);

        let mut session = Session::new(
            Arc::new(config),
            Arc::clone(&db) as Arc<dyn Persistence>,
            NumericTable::charybdis(),
            timings,
        )?;

        let (to_bot, inbound) = mpsc::unbounded_channel();
        let (outbound, from_bot) = mpsc::unbounded_channel();
        let mut wire = ChannelWire::new(inbound, outbound);
        let session = tokio::spawn(async move { session.run(&mut wire).await });

        Ok(Self {
            to_bot,
            from_bot,
            db,
            session,
            members: Vec::new(),
            syncs: 0,
        })
    }

    /// Feed one raw line to the bot.
    pub fn send(&self, line: &str) {
        self.to_bot
            .send(line.to_owned())
            .expect("session stopped reading");
    }

    /// Next message the bot writes.
    pub async fn recv(&mut self) -> anyhow::Result<Message> {
        match timeout(RECV_TIMEOUT, self.from_bot.recv()).await? {
            Some(msg) => Ok(msg),
            None => anyhow::bail!("session closed its wire"),
        }
    }

    /// Receive until `predicate` matches, returning the skipped messages and
    /// the match.
    pub async fn recv_until<F>(&mut self, mut predicate: F) -> anyhow::Result<(Vec<Message>, Message)>
    where
        F: FnMut(&Message) -> bool,
    {
        let mut skipped = Vec::new();
        loop {
            let msg = self.recv().await?;
            if predicate(&msg) {
                return Ok((skipped, msg));
            }
            skipped.push(msg);
        }
    }

    /// Everything the bot writes during `window`.
    pub async fn drain(&mut self, window: Duration) -> Vec<Message> {
        let deadline = Instant::now() + window;
        let mut messages = Vec::new();
        while let Ok(Some(msg)) = tokio::time::timeout_at(deadline, self.from_bot.recv()).await {
            messages.push(msg);
        }
        messages
    }

    /// Wait until every line sent so far has been dispatched, returning what
    /// the bot wrote meanwhile.
    pub async fn sync(&mut self) -> anyhow::Result<Vec<Message>> {
        self.syncs += 1;
        let token = format!("sync-{}", self.syncs);
        self.send(&format!("PING :{token}"));
        let (skipped, _) = self
            .recv_until(|msg| matches!(&msg.command, Command::PONG(t, _) if *t == token))
            .await?;
        Ok(skipped)
    }

    /// Welcome the bot, let it join [`CHANNEL`] and report `members` there.
    pub async fn sign_on(&mut self, members: &[Member]) -> anyhow::Result<()> {
        self.members = members.to_vec();

        self.send(&format!(":irc.test 001 {BOT} :Welcome to the test network"));
        self.send(&format!(
            ":irc.test 005 {BOT} CHANMODES=eIbq,k,flj,CFLMPQScgimnprstz PREFIX=(ov)@+ :are supported by this server"
        ));
        self.recv_until(|msg| matches!(&msg.command, Command::JOIN(c, _) if c == CHANNEL))
            .await?;

        self.send(&format!(":{BOT_PREFIX} JOIN {CHANNEL}"));
        self.recv_until(|msg| matches!(&msg.command, Command::WHO(c) if c == CHANNEL))
            .await?;
        for member in members {
            self.send(&format!(
                ":irc.test 352 {BOT} {CHANNEL} {} {} irc.test {} H :0 {}",
                member.user, member.host, member.nick, member.nick
            ));
        }
        self.send(&format!(":irc.test 315 {BOT} {CHANNEL} :End of /WHO list."));
        self.sync().await?;
        Ok(())
    }

    /// Answer one `WHOIS` from the member table.
    pub fn answer_whois(&self, nick: &str) {
        let Some(member) = self.members.iter().find(|m| m.nick.eq_ignore_ascii_case(nick)) else {
            self.send(&format!(":irc.test 401 {BOT} {nick} :No such nick/channel"));
            self.send(&format!(":irc.test 318 {BOT} {nick} :End of /WHOIS list."));
            return;
        };
        self.send(&format!(
            ":irc.test 311 {BOT} {} {} {} * :{}",
            member.nick, member.user, member.host, member.nick
        ));
        if let Some(account) = member.account {
            self.send(&format!(
                ":irc.test 330 {BOT} {} {account} :is logged in as",
                member.nick
            ));
        }
        self.send(&format!(":irc.test 318 {BOT} {} :End of /WHOIS list.", member.nick));
    }

    /// Next message that is not a `WHOIS`, answering any `WHOIS` on the way.
    pub async fn recv_answering_whois(&mut self) -> anyhow::Result<Message> {
        loop {
            let msg = self.recv().await?;
            match &msg.command {
                Command::WHOIS(nick) => self.answer_whois(nick),
                _ => return Ok(msg),
            }
        }
    }

    /// Everything but `WHOIS` written during `window`, answering any
    /// `WHOIS` on the way.
    pub async fn drain_answering_whois(&mut self, window: Duration) -> Vec<Message> {
        let deadline = Instant::now() + window;
        let mut messages = Vec::new();
        while let Ok(Some(msg)) = tokio::time::timeout_at(deadline, self.from_bot.recv()).await {
            match &msg.command {
                Command::WHOIS(nick) => self.answer_whois(nick),
                _ => messages.push(msg),
            }
        }
        messages
    }
}

/// Target and text of a `PRIVMSG`.
pub fn privmsg(msg: &Message) -> Option<(&str, &str)> {
    match &msg.command {
        Command::PRIVMSG(target, text) => Some((target.as_str(), text.as_str())),
        _ => None,
    }
}

/// Whether `msg` is a `PRIVMSG` to `target` whose text starts with `prefix`.
pub fn is_privmsg_to(msg: &Message, target: &str, prefix: &str) -> bool {
    privmsg(msg).is_some_and(|(t, text)| t == target && text.starts_with(prefix))
}

/// Whether `msg` is `MODE channel flag arg`.
pub fn is_mode(msg: &Message, channel: &str, flag: &str, arg: &str) -> bool {
    matches!(&msg.command, Command::MODE(c, args)
        if c == channel && args.len() == 2 && args[0] == flag && args[1] == arg)
}

/// Row id and token from an edit link.
pub fn edit_link(text: &str) -> Option<(i64, String)> {
    let rest = text.split(&format!("{WEB_URL}/bans/edit/")).nth(1)?;
    let (id, token) = rest.split_once('/')?;
    Some((id.parse().ok()?, token.trim().to_owned()))
}
