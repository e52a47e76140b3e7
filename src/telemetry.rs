//! Logging setup and span constructors.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` overrides the `info` default.
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();
}

/// Standardized span constructors.
pub mod spans {
    use tracing::{Span, info_span};

    /// One connection to the IRC server.
    pub fn session(server: &str, nick: &str) -> Span {
        info_span!("session", server = %server, nick = %nick)
    }

    /// A ban annotation dialog with the operator who set `mask`.
    pub fn dialog(channel: &str, mask: &str, setter: &str) -> Span {
        info_span!("dialog", channel = %channel, mask = %mask, setter = %setter)
    }

    /// One expiry sweep.
    pub fn sweep() -> Span {
        info_span!("expiry_sweep")
    }

    /// One web API request.
    pub fn web(route: &str) -> Span {
        info_span!("web", route = %route)
    }
}
