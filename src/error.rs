//! Session-level error handling.
//!
//! Everything that ends a live IRC session funnels into [`SessionError`];
//! the supervisor in `main` logs it and reconnects. Failures inside a single
//! event (a bad line, a failed ledger write) are logged where they happen
//! and never reach this type.

use thiserror::Error;
use warden_proto::ProtocolError;

use crate::db::DbError;

/// Errors that end a session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("transport error: {0}")]
    Transport(#[from] ProtocolError),

    #[error("connection closed by server")]
    Closed,

    #[error("server sent ERROR: {0}")]
    ServerError(String),

    #[error("no PONG for {0} pings")]
    PingTimeout(u32),

    #[error("outgoing queue closed")]
    Send,

    #[error("tls setup failed: {0}")]
    Tls(String),

    #[error("database error: {0}")]
    Db(#[from] DbError),

    #[error("missing numerics: {}", .0.join(", "))]
    MissingNumerics(Vec<&'static str>),
}

impl SessionError {
    /// Get a static error code string for log fields.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Closed => "closed",
            Self::ServerError(_) => "server_error",
            Self::PingTimeout(_) => "ping_timeout",
            Self::Send => "send",
            Self::Tls(_) => "tls",
            Self::Db(_) => "db",
            Self::MissingNumerics(_) => "missing_numerics",
        }
    }

    /// Whether reconnecting could help.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::MissingNumerics(_))
    }
}

/// Why a session ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// A `stop` command asked the process to exit.
    Shutdown,
}
