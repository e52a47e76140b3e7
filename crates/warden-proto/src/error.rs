//! Error types for the IRC protocol library.

use thiserror::Error;

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Top-level protocol errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// I/O error during reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A line exceeded the codec's maximum length without a terminator.
    #[error("message too long: {actual} bytes (limit: {limit})")]
    MessageTooLong {
        /// Actual line length so far.
        actual: usize,
        /// Maximum allowed length.
        limit: usize,
    },

    /// Illegal control character in an outgoing message.
    #[error("illegal control character: {0:?}")]
    IllegalControlChar(char),

    /// Failed to parse an IRC message.
    #[error("invalid message: {string}")]
    InvalidMessage {
        /// The invalid message string.
        string: String,
        /// The underlying parse error.
        #[source]
        cause: MessageParseError,
    },
}

/// Errors encountered when parsing IRC messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum MessageParseError {
    /// Message was empty.
    #[error("empty message")]
    EmptyMessage,

    /// The line did not follow `[@tags] [:prefix] command [params]`.
    #[error("malformed line at byte {position}: {context}")]
    Malformed {
        /// Byte offset where parsing failed.
        position: usize,
        /// Short description of what was expected.
        context: String,
    },

    /// A known command arrived with fewer parameters than it needs.
    #[error("{command} needs at least {needed} parameters")]
    NotEnoughArgs {
        /// Command name.
        command: String,
        /// Minimum number of parameters.
        needed: usize,
    },

    /// A mode string referenced an argument that was not supplied.
    #[error("invalid mode argument: {0}")]
    InvalidModeArg(String),
}
