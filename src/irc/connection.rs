//! The line-level link to the server.

use async_trait::async_trait;
use std::sync::Arc;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tracing::{info, warn};
use warden_proto::{Message, ProtocolError, Transport};

use crate::config::IrcConfig;
use crate::error::SessionError;

/// A bidirectional stream of IRC lines.
///
/// [`Transport`] is the real thing; tests drive sessions through channels.
#[async_trait]
pub trait Wire: Send {
    /// Next inbound line, or `None` once the peer has closed.
    async fn read_line(&mut self) -> Result<Option<String>, ProtocolError>;
    async fn write_message(&mut self, message: Message) -> Result<(), ProtocolError>;
}

#[async_trait]
impl Wire for Transport {
    async fn read_line(&mut self) -> Result<Option<String>, ProtocolError> {
        Transport::read_line(self).await
    }

    async fn write_message(&mut self, message: Message) -> Result<(), ProtocolError> {
        Transport::write_message(self, message).await
    }
}

/// Client TLS settings trusting the platform's root certificates.
pub fn tls_config() -> Arc<ClientConfig> {
    let mut roots = RootCertStore::empty();
    let certs = rustls_native_certs::load_native_certs();
    for cert in certs.certs {
        if let Err(e) = roots.add(cert) {
            warn!("Failed to add root cert: {}", e);
        }
    }
    for e in &certs.errors {
        warn!("Error loading native certs: {}", e);
    }

    Arc::new(
        ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth(),
    )
}

/// Open a connection to the configured server.
pub async fn connect(irc: &IrcConfig) -> Result<Transport, SessionError> {
    info!(server = %irc.server, port = irc.port, tls = irc.tls, "connecting");
    let tls = irc.tls.then(tls_config);
    Ok(Transport::connect(&irc.server, irc.port, tls).await?)
}
