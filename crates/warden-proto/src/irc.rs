//! Line codec for tokio.
//!
//! Decoding yields raw lines rather than parsed messages so that one
//! malformed line from the server does not tear down the framed stream; the
//! caller parses and decides what to do with failures. Encoding takes a
//! [`Message`] and refuses to put a second line on the wire.

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{self, ProtocolError};
use crate::message::Message;

/// Inbound lines may carry up to 8191 bytes of IRCv3 tags ahead of the
/// 512-byte body.
pub const MAX_INBOUND_LINE: usize = 8191 + 512;

/// Tokio codec: `String` lines in, [`Message`]s out.
pub struct IrcCodec {
    next_index: usize,
    max_len: usize,
}

impl Default for IrcCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl IrcCodec {
    /// Codec with the default inbound line limit.
    pub fn new() -> Self {
        Self::with_max_len(MAX_INBOUND_LINE)
    }

    /// Codec with a custom inbound line limit in bytes.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            next_index: 0,
            max_len,
        }
    }

    /// Cut outgoing data after its first line ending and reject control
    /// characters other than the IRC formatting codes.
    pub fn sanitize(mut data: String) -> error::Result<String> {
        if let Some((pos, len)) = ["\r\n", "\r", "\n"]
            .iter()
            .flat_map(|needle| data.find(needle).map(|pos| (pos, needle.len())))
            .min_by_key(|&(pos, _)| pos)
        {
            data.truncate(pos + len);
        }

        let body = data.trim_end_matches(['\r', '\n']);
        if let Some(ch) = body.chars().find(|&c| is_illegal_control_char(c)) {
            return Err(ProtocolError::IllegalControlChar(ch));
        }

        Ok(data)
    }
}

/// Control characters that may not appear inside a line. Bold, color,
/// reset, reverse, italic and underline codes are allowed.
fn is_illegal_control_char(c: char) -> bool {
    matches!(c, '\0'..='\x1f')
        && !matches!(c, '\x02' | '\x03' | '\x0f' | '\x16' | '\x1d' | '\x1f' | '\x01')
}

impl Decoder for IrcCodec {
    type Item = String;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> error::Result<Option<String>> {
        if let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') {
            let line = src.split_to(self.next_index + offset + 1);
            self.next_index = 0;
            let text = String::from_utf8_lossy(&line);
            return Ok(Some(text.trim_end_matches(['\r', '\n']).to_owned()));
        }

        if src.len() > self.max_len {
            let actual = src.len();
            src.clear();
            self.next_index = 0;
            return Err(ProtocolError::MessageTooLong {
                actual,
                limit: self.max_len,
            });
        }

        self.next_index = src.len();
        Ok(None)
    }
}

impl Encoder<Message> for IrcCodec {
    type Error = ProtocolError;

    fn encode(&mut self, msg: Message, dst: &mut BytesMut) -> error::Result<()> {
        let line = Self::sanitize(msg.to_string())?;
        dst.reserve(line.len());
        dst.put(line.as_bytes());
        Ok(())
    }
}
