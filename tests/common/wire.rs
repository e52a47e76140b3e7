//! In-process wire: lines in from the test, messages out to the test.

use async_trait::async_trait;
use tokio::sync::mpsc;
use warden::irc::Wire;
use warden_proto::{Message, ProtocolError};

pub struct ChannelWire {
    inbound: mpsc::UnboundedReceiver<String>,
    outbound: mpsc::UnboundedSender<Message>,
}

impl ChannelWire {
    pub fn new(
        inbound: mpsc::UnboundedReceiver<String>,
        outbound: mpsc::UnboundedSender<Message>,
    ) -> Self {
        Self { inbound, outbound }
    }
}

#[async_trait]
impl Wire for ChannelWire {
    async fn read_line(&mut self) -> Result<Option<String>, ProtocolError> {
        Ok(self.inbound.recv().await)
    }

    async fn write_message(&mut self, message: Message) -> Result<(), ProtocolError> {
        // The test may have stopped listening; the session keeps going.
        let _ = self.outbound.send(message);
        Ok(())
    }
}
