//! Reconnect loop around [`Session`].
//!
//! The database and web server outlive individual connections; every
//! reconnect starts a fresh session with empty correlators and op state.

use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use warden_proto::NumericTable;

use crate::config::Config;
use crate::db::Persistence;
use crate::error::{SessionEnd, SessionError};
use crate::irc::{Session, Timings, connect};

/// Exponential reconnect delay with jitter.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    cap: Duration,
    current: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(120))
    }
}

impl Backoff {
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self {
            base,
            cap,
            current: base,
        }
    }

    /// Delay before the next attempt; doubles the following one up to the cap.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.cap);

        let jitter_ms = u64::try_from(delay.as_millis() / 10).unwrap_or(0);
        let jitter = rand::thread_rng().gen_range(0..=jitter_ms);
        delay + Duration::from_millis(jitter)
    }

    pub fn reset(&mut self) {
        self.current = self.base;
    }
}

/// Connect, run and reconnect until a `stop` command or an error that a new
/// connection cannot fix.
pub async fn run(config: Arc<Config>, db: Arc<dyn Persistence>) -> Result<(), SessionError> {
    let mut backoff = Backoff::default();

    'reconnect_loop: loop {
        let mut session = Session::new(
            Arc::clone(&config),
            Arc::clone(&db),
            NumericTable::charybdis(),
            Timings::default(),
        )?;

        info!(server = %config.irc.server, port = config.irc.port, tls = config.irc.tls, "Connecting");
        match connect(&config.irc).await {
            Ok(mut transport) => match session.run(&mut transport).await {
                Ok(SessionEnd::Shutdown) => {
                    info!("Stopped by command");
                    break 'reconnect_loop;
                }
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => warn!(error = %e, code = e.error_code(), "Session ended"),
            },
            Err(e) => warn!(error = %e, code = e.error_code(), "Connect failed"),
        }

        if session.signed_on() {
            backoff.reset();
        }
        drop(session);

        let delay = backoff.next_delay();
        info!(delay_ms = delay.as_millis() as u64, "Reconnecting");
        tokio::time::sleep(delay).await;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_to_cap() {
        let mut backoff = Backoff::new(Duration::from_secs(1), Duration::from_secs(5));
        let expected = [1, 2, 4, 5, 5];
        for secs in expected {
            let delay = backoff.next_delay();
            let floor = Duration::from_secs(secs);
            assert!(delay >= floor && delay <= floor + floor / 10, "{delay:?} vs {floor:?}");
        }
    }

    #[test]
    fn test_backoff_reset() {
        let mut backoff = Backoff::default();
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert!(backoff.next_delay() < Duration::from_millis(1100));
    }
}
