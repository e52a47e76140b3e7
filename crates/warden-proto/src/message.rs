//! Owned IRC messages.

use std::fmt;
use std::str::FromStr;

use crate::command::Command;
use crate::error::{MessageParseError, ProtocolError};
use crate::parser::ParsedLine;
use crate::prefix::Prefix;

/// An IRCv3 message tag: key and optional value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tag(pub String, pub Option<String>);

/// A complete IRC message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    /// IRCv3 message tags, if any.
    pub tags: Option<Vec<Tag>>,
    /// Message origin.
    pub prefix: Option<Prefix>,
    /// The command and its parameters.
    pub command: Command,
}

impl Message {
    /// Build a message from a verb and parameters, with an optional prefix.
    pub fn new(
        prefix: Option<&str>,
        command: &str,
        args: Vec<&str>,
    ) -> Result<Message, MessageParseError> {
        Ok(Message {
            tags: None,
            prefix: prefix.map(Prefix::new_from_str),
            command: Command::new(command, args)?,
        })
    }

    /// Attach a prefix.
    pub fn with_prefix(mut self, prefix: impl Into<Prefix>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// `PRIVMSG target :text`
    pub fn privmsg(target: impl Into<String>, text: impl Into<String>) -> Self {
        Command::PRIVMSG(target.into(), text.into()).into()
    }

    /// `NOTICE target :text`
    pub fn notice(target: impl Into<String>, text: impl Into<String>) -> Self {
        Command::NOTICE(target.into(), text.into()).into()
    }

    /// `MODE target modes args...`
    pub fn mode(target: impl Into<String>, args: &[&str]) -> Self {
        Command::MODE(target.into(), args.iter().map(|s| (*s).to_owned()).collect()).into()
    }

    /// `JOIN channel [key]`
    pub fn join(channel: impl Into<String>, key: Option<String>) -> Self {
        Command::JOIN(channel.into(), key).into()
    }

    /// `PART channel`
    pub fn part(channel: impl Into<String>) -> Self {
        Command::PART(channel.into(), None).into()
    }

    /// `WHO mask`
    pub fn who(mask: impl Into<String>) -> Self {
        Command::WHO(mask.into()).into()
    }

    /// `WHOIS nick`
    pub fn whois(nick: impl Into<String>) -> Self {
        Command::WHOIS(nick.into()).into()
    }

    /// `PING token`
    pub fn ping(token: impl Into<String>) -> Self {
        Command::PING(token.into(), None).into()
    }

    /// `PONG token`
    pub fn pong(token: impl Into<String>) -> Self {
        Command::PONG(token.into(), None).into()
    }

    /// Nickname of the sender, if the prefix names a user.
    pub fn source_nickname(&self) -> Option<&str> {
        self.prefix.as_ref().and_then(Prefix::nick)
    }

    /// The full `nick!user@host` of the sender, or the nick alone when the
    /// prefix carries nothing more.
    pub fn source_hostmask(&self) -> Option<String> {
        match self.prefix.as_ref()? {
            Prefix::Nickname(..) => self.prefix.as_ref().map(Prefix::to_string),
            Prefix::ServerName(_) => None,
        }
    }

    /// Look up a tag value by key.
    pub fn tag_value(&self, key: &str) -> Option<&str> {
        self.tags
            .as_ref()?
            .iter()
            .find(|tag| tag.0 == key)
            .and_then(|tag| tag.1.as_deref())
    }
}

impl From<Command> for Message {
    fn from(command: Command) -> Self {
        Message {
            tags: None,
            prefix: None,
            command,
        }
    }
}

fn parse_tags(raw: &str) -> Vec<Tag> {
    raw.split(';')
        .filter(|t| !t.is_empty())
        .map(|t| match t.split_once('=') {
            Some((k, v)) => Tag(k.to_owned(), Some(unescape_tag_value(v))),
            None => Tag(t.to_owned(), None),
        })
        .collect()
}

fn unescape_tag_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(':') => out.push(';'),
            Some('s') => out.push(' '),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

fn escape_tag_value(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
    for c in value.chars() {
        match c {
            ';' => f.write_str("\\:")?,
            ' ' => f.write_str("\\s")?,
            '\\' => f.write_str("\\\\")?,
            '\r' => f.write_str("\\r")?,
            '\n' => f.write_str("\\n")?,
            c => write!(f, "{c}")?,
        }
    }
    Ok(())
}

impl FromStr for Message {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |cause| ProtocolError::InvalidMessage {
            string: s.to_owned(),
            cause,
        };

        let line = ParsedLine::parse(s).map_err(invalid)?;
        let command = Command::new(line.command, line.params.to_vec()).map_err(invalid)?;

        Ok(Message {
            tags: line.tags.map(parse_tags),
            prefix: line.prefix.map(Prefix::new_from_str),
            command,
        })
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref tags) = self.tags {
            f.write_str("@")?;
            for (i, tag) in tags.iter().enumerate() {
                if i > 0 {
                    f.write_str(";")?;
                }
                f.write_str(&tag.0)?;
                if let Some(ref value) = tag.1 {
                    f.write_str("=")?;
                    escape_tag_value(f, value)?;
                }
            }
            f.write_str(" ")?;
        }

        if let Some(ref prefix) = self.prefix {
            write!(f, ":{prefix} ")?;
        }

        write!(f, "{}\r\n", self.command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mode_line() {
        let msg: Message = ":op!o@staff.example MODE #chan +bb a!*@* $a:troll"
            .parse()
            .unwrap();
        assert_eq!(msg.source_nickname(), Some("op"));
        assert_eq!(msg.source_hostmask().as_deref(), Some("op!o@staff.example"));
        assert_eq!(
            msg.command,
            Command::MODE(
                "#chan".into(),
                vec!["+bb".into(), "a!*@*".into(), "$a:troll".into()]
            )
        );
    }

    #[test]
    fn test_server_prefix_has_no_hostmask() {
        let msg: Message = ":irc.example.net 001 bot :Welcome".parse().unwrap();
        assert_eq!(msg.source_nickname(), None);
        assert_eq!(msg.source_hostmask(), None);
        assert!(matches!(msg.command, Command::Response(1, _)));
    }

    #[test]
    fn test_tags_are_unescaped() {
        let msg: Message = "@account=troll;msg=a\\sb :t!t@h PRIVMSG bot :hi".parse().unwrap();
        assert_eq!(msg.tag_value("account"), Some("troll"));
        assert_eq!(msg.tag_value("msg"), Some("a b"));
    }

    #[test]
    fn test_invalid_line_reports_input() {
        let err = ":srv KICK #chan".parse::<Message>().unwrap_err();
        match err {
            ProtocolError::InvalidMessage { string, cause } => {
                assert_eq!(string, ":srv KICK #chan");
                assert!(matches!(cause, MessageParseError::NotEnoughArgs { .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_display_round_trip_line() {
        let msg = Message::notice("opnick", "nobody matches").with_prefix("bot!b@h");
        assert_eq!(msg.to_string(), ":bot!b@h NOTICE opnick :nobody matches\r\n");
    }
}
