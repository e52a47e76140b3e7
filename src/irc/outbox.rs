//! Outgoing message queue shared by the session and its spawned tasks.

use tokio::sync::mpsc;
use tracing::debug;
use warden_proto::Message;

/// Longest `PRIVMSG` body the bot sends.
pub const MAX_BODY_BYTES: usize = 512;

/// Cloneable handle onto the connection's write queue.
///
/// Sends never block; once the connection is gone they are dropped.
#[derive(Clone, Debug)]
pub struct Outbox {
    tx: mpsc::UnboundedSender<Message>,
}

impl Outbox {
    /// A new outbox and the receiver the connection drains.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue a raw message.
    pub fn send(&self, message: Message) {
        if self.tx.send(message).is_err() {
            debug!("outbox closed, dropping message");
        }
    }

    /// `PRIVMSG target :text`, with `text` cut to [`MAX_BODY_BYTES`].
    pub fn msg(&self, target: &str, text: &str) {
        self.send(Message::privmsg(target, truncate(text, MAX_BODY_BYTES)));
    }

    /// `MODE channel <flag> arg`
    pub fn mode(&self, channel: &str, flag: &str, arg: &str) {
        self.send(Message::mode(channel, &[flag, arg]));
    }

    pub fn join(&self, channel: &str, key: Option<&str>) {
        self.send(Message::join(channel, key.map(str::to_owned)));
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

fn truncate(text: &str, limit: usize) -> &str {
    if text.len() <= limit {
        return text;
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
