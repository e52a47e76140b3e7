//! Framed IRC transport over TCP or client-side TLS.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::ClientConfig;
use tokio_rustls::TlsConnector;
use tokio_util::codec::Framed;
use tracing::warn;

use crate::error::ProtocolError;
use crate::irc::IrcCodec;
use crate::Message;

/// A connected, framed IRC stream.
#[allow(clippy::large_enum_variant)]
pub enum Transport {
    /// Plain TCP.
    Tcp {
        /// The framed codec for TCP.
        framed: Framed<TcpStream, IrcCodec>,
    },
    /// TLS to the server.
    ClientTls {
        /// The framed codec for client-side TLS.
        framed: Framed<TlsStream<TcpStream>, IrcCodec>,
    },
}

impl Transport {
    /// Wrap a connected TCP stream.
    pub fn tcp(stream: TcpStream) -> Self {
        if let Err(e) = Self::enable_keepalive(&stream) {
            warn!("failed to enable TCP keepalive: {}", e);
        }
        Self::Tcp {
            framed: Framed::new(stream, IrcCodec::new()),
        }
    }

    /// Wrap an established client TLS stream.
    pub fn client_tls(stream: TlsStream<TcpStream>) -> Self {
        Self::ClientTls {
            framed: Framed::new(stream, IrcCodec::new()),
        }
    }

    /// Connect to `host:port`, optionally negotiating TLS with `config`.
    pub async fn connect(
        host: &str,
        port: u16,
        tls: Option<Arc<ClientConfig>>,
    ) -> Result<Self, ProtocolError> {
        let stream = TcpStream::connect((host, port)).await?;
        let Some(config) = tls else {
            return Ok(Self::tcp(stream));
        };

        if let Err(e) = Self::enable_keepalive(&stream) {
            warn!("failed to enable TCP keepalive: {}", e);
        }
        let server_name = ServerName::try_from(host.to_owned()).map_err(|e| {
            ProtocolError::Io(std::io::Error::new(std::io::ErrorKind::InvalidInput, e))
        })?;
        let stream = TlsConnector::from(config)
            .connect(server_name, stream)
            .await?;
        Ok(Self::client_tls(stream))
    }

    fn enable_keepalive(stream: &TcpStream) -> std::io::Result<()> {
        use socket2::{SockRef, TcpKeepalive};

        let sock = SockRef::from(stream);
        let keepalive = TcpKeepalive::new()
            .with_time(Duration::from_secs(120))
            .with_interval(Duration::from_secs(30));
        sock.set_tcp_keepalive(&keepalive)
    }

    /// Next inbound line, or `None` once the peer has closed the stream.
    pub async fn read_line(&mut self) -> Result<Option<String>, ProtocolError> {
        let next = match self {
            Self::Tcp { framed } => framed.next().await,
            Self::ClientTls { framed } => framed.next().await,
        };
        next.transpose()
    }

    /// Send one message.
    pub async fn write_message(&mut self, message: Message) -> Result<(), ProtocolError> {
        match self {
            Self::Tcp { framed } => framed.send(message).await,
            Self::ClientTls { framed } => framed.send(message).await,
        }
    }
}
