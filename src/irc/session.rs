//! One connection's worth of bot.
//!
//! A [`Session`] registers with the server, then multiplexes inbound lines,
//! the outgoing queue, the liveness ping and the expiry sweep until the link
//! drops or a `stop` command arrives. Everything spawned during the session
//! dies with it.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{Instrument, debug, error, info};
use warden_proto::{Command, Message, NumericTable};

use super::bot::{Bot, Timings};
use super::commands::BotCommands;
use super::connection::Wire;
use super::dispatch::{Context, Registry};
use super::expiry;
use super::outbox::Outbox;
use super::policy::{ServerSuffixPolicy, SetterPolicy};
use crate::config::Config;
use crate::db::{BanMode, ListedBan, Persistence};
use crate::error::{SessionEnd, SessionError};
use crate::telemetry::spans;

const PING_TOKEN: &str = "warden";

/// Mutable per-connection state owned by the dispatch loop.
#[derive(Debug, Default)]
pub struct SessionState {
    pub signed_on: bool,
    pub identified: bool,
    pub outstanding_pings: u32,
    /// Ban and quiet list entries awaiting their end-of-list reply, keyed by
    /// casemapped channel.
    pub ban_lists: HashMap<(String, BanMode), Vec<ListedBan>>,
    /// Set by the `stop` command.
    pub shutdown: bool,
}

pub struct Session {
    bot: Arc<Bot>,
    registry: Registry,
    state: SessionState,
    tasks: JoinSet<()>,
    outbound: mpsc::UnboundedReceiver<Message>,
    roster_worker: JoinHandle<()>,
    sweep: Option<JoinHandle<()>>,
}

impl Session {
    /// A fresh session using the server-suffix setter policy from `config`.
    pub fn new(
        config: Arc<Config>,
        db: Arc<dyn Persistence>,
        numerics: NumericTable,
        timings: Timings,
    ) -> Result<Self, SessionError> {
        let policy = ServerSuffixPolicy::new(config.bans.server_suffix.clone());
        Self::with_policy(config, db, numerics, timings, Box::new(policy))
    }

    pub fn with_policy(
        config: Arc<Config>,
        db: Arc<dyn Persistence>,
        numerics: NumericTable,
        timings: Timings,
        setter_policy: Box<dyn SetterPolicy>,
    ) -> Result<Self, SessionError> {
        let registry = Registry::new(numerics, BotCommands::builtin())?;
        let (outbox, outbound) = Outbox::channel();
        let (bot, roster_worker) = Bot::new(config, db, outbox, timings, setter_policy);

        Ok(Self {
            bot: Arc::new(bot),
            registry,
            state: SessionState::default(),
            tasks: JoinSet::new(),
            outbound,
            roster_worker,
            sweep: None,
        })
    }

    pub fn bot(&self) -> &Arc<Bot> {
        &self.bot
    }

    /// Whether the server ever welcomed us on this connection.
    pub fn signed_on(&self) -> bool {
        self.state.signed_on
    }

    /// Run until the link fails or the bot is told to stop.
    pub async fn run<W: Wire>(&mut self, wire: &mut W) -> Result<SessionEnd, SessionError> {
        let span = spans::session(&self.bot.config.irc.server, &self.bot.nick());
        self.drive(wire).instrument(span).await
    }

    async fn drive<W: Wire>(&mut self, wire: &mut W) -> Result<SessionEnd, SessionError> {
        self.register();

        let timings = self.bot.timings.clone();
        let start = Instant::now();
        let mut ping = interval_at(start + timings.ping_interval, timings.ping_interval);
        ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut sweep = interval_at(start + timings.sweep_interval, timings.sweep_interval);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                line = wire.read_line() => match line? {
                    Some(line) => self.handle_line(&line).await?,
                    None => return Err(SessionError::Closed),
                },
                Some(message) = self.outbound.recv() => wire.write_message(message).await?,
                _ = ping.tick() => self.ping()?,
                _ = sweep.tick(), if self.state.signed_on => self.start_sweep(),
                Some(result) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    if let Err(e) = result
                        && e.is_panic()
                    {
                        error!(error = %e, "session task panicked");
                    }
                }
            }

            if self.state.shutdown {
                info!("shutting down");
                self.flush(wire).await?;
                wire.write_message(Command::QUIT(Some("Okay!".to_owned())).into())
                    .await?;
                return Ok(SessionEnd::Shutdown);
            }
        }
    }

    /// Parse and dispatch one inbound line. Unparseable lines are skipped.
    pub async fn handle_line(&mut self, line: &str) -> Result<(), SessionError> {
        let msg: Message = match line.parse() {
            Ok(msg) => msg,
            Err(e) => {
                debug!(line = %line, error = %e, "unparseable line");
                return Ok(());
            }
        };

        let mut ctx = Context {
            bot: &self.bot,
            state: &mut self.state,
            tasks: &mut self.tasks,
        };
        self.registry.dispatch(&mut ctx, &msg).await
    }

    fn register(&self) {
        let irc = &self.bot.config.irc;
        if let Some(password) = &irc.password {
            self.bot.outbox.send(Command::PASS(password.clone()).into());
        }
        let nick = self.bot.nick();
        let username = irc.username.clone().unwrap_or_else(|| nick.clone());
        self.bot.outbox.send(Command::NICK(nick).into());
        self.bot
            .outbox
            .send(Command::USER(username, "0".to_owned(), irc.realname.clone()).into());
    }

    fn ping(&mut self) -> Result<(), SessionError> {
        if self.state.outstanding_pings > self.bot.timings.max_outstanding_pings {
            return Err(SessionError::PingTimeout(self.state.outstanding_pings));
        }
        self.bot.outbox.send(Message::ping(PING_TOKEN));
        self.state.outstanding_pings += 1;
        Ok(())
    }

    fn start_sweep(&mut self) {
        if self.sweep.as_ref().is_some_and(|sweep| !sweep.is_finished()) {
            debug!("previous expiry sweep still running");
            return;
        }
        let bot = Arc::clone(&self.bot);
        self.sweep = Some(tokio::spawn(expiry::sweep(bot).instrument(spans::sweep())));
    }

    async fn flush<W: Wire>(&mut self, wire: &mut W) -> Result<(), SessionError> {
        while let Ok(message) = self.outbound.try_recv() {
            wire.write_message(message).await?;
        }
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.roster_worker.abort();
        if let Some(sweep) = &self.sweep {
            sweep.abort();
        }
    }
}
