//! IRC commands understood by the bot.
//!
//! Only the verbs the bot reads or writes get their own variant. Numerics
//! become [`Command::Response`] and every other verb is kept as
//! [`Command::Raw`] so it can still be logged and ignored.

use std::fmt;

use crate::error::MessageParseError;

/// An IRC command with its parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum Command {
    /// `PASS password`
    PASS(String),
    /// `NICK nickname`
    NICK(String),
    /// `USER username mode :realname`
    USER(String, String, String),
    /// `QUIT [:reason]`
    QUIT(Option<String>),
    /// `JOIN channel [key]`
    JOIN(String, Option<String>),
    /// `PART channel [:reason]`
    PART(String, Option<String>),
    /// `KICK channel nick [:reason]`
    KICK(String, String, Option<String>),
    /// `INVITE nick channel`
    INVITE(String, String),
    /// `MODE target [modestring [args...]]`
    MODE(String, Vec<String>),
    /// `PRIVMSG target :text`
    PRIVMSG(String, String),
    /// `NOTICE target :text`
    NOTICE(String, String),
    /// `WHO mask`
    WHO(String),
    /// `WHOIS nick`
    WHOIS(String),
    /// `PING token [server]`
    PING(String, Option<String>),
    /// `PONG token [server]`
    PONG(String, Option<String>),
    /// `ERROR :message`
    ERROR(String),
    /// Three-digit numeric reply.
    Response(u16, Vec<String>),
    /// Any other verb.
    Raw(String, Vec<String>),
}

fn need(command: &str, args: &[&str], needed: usize) -> Result<(), MessageParseError> {
    if args.len() < needed {
        Err(MessageParseError::NotEnoughArgs {
            command: command.to_owned(),
            needed,
        })
    } else {
        Ok(())
    }
}

fn opt(args: &[&str], idx: usize) -> Option<String> {
    args.get(idx).map(|s| (*s).to_owned())
}

impl Command {
    /// Build a command from its verb and raw parameters.
    pub fn new(cmd: &str, args: Vec<&str>) -> Result<Command, MessageParseError> {
        if cmd.len() == 3 && cmd.bytes().all(|b| b.is_ascii_digit()) {
            let code = cmd.parse::<u16>().unwrap_or_default();
            return Ok(Command::Response(
                code,
                args.into_iter().map(str::to_owned).collect(),
            ));
        }

        let upper = cmd.to_ascii_uppercase();
        let command = match upper.as_str() {
            "PASS" => {
                need(&upper, &args, 1)?;
                Command::PASS(args[0].to_owned())
            }
            "NICK" => {
                need(&upper, &args, 1)?;
                Command::NICK(args[0].to_owned())
            }
            "USER" => {
                need(&upper, &args, 4)?;
                Command::USER(args[0].to_owned(), args[1].to_owned(), args[3].to_owned())
            }
            "QUIT" => Command::QUIT(opt(&args, 0)),
            "JOIN" => {
                need(&upper, &args, 1)?;
                Command::JOIN(args[0].to_owned(), opt(&args, 1))
            }
            "PART" => {
                need(&upper, &args, 1)?;
                Command::PART(args[0].to_owned(), opt(&args, 1))
            }
            "KICK" => {
                need(&upper, &args, 2)?;
                Command::KICK(args[0].to_owned(), args[1].to_owned(), opt(&args, 2))
            }
            "INVITE" => {
                need(&upper, &args, 2)?;
                Command::INVITE(args[0].to_owned(), args[1].to_owned())
            }
            "MODE" => {
                need(&upper, &args, 1)?;
                Command::MODE(
                    args[0].to_owned(),
                    args[1..].iter().map(|s| (*s).to_owned()).collect(),
                )
            }
            "PRIVMSG" => {
                need(&upper, &args, 2)?;
                Command::PRIVMSG(args[0].to_owned(), args[1].to_owned())
            }
            "NOTICE" => {
                need(&upper, &args, 2)?;
                Command::NOTICE(args[0].to_owned(), args[1].to_owned())
            }
            "WHO" => {
                need(&upper, &args, 1)?;
                Command::WHO(args[0].to_owned())
            }
            "WHOIS" => {
                need(&upper, &args, 1)?;
                Command::WHOIS(args[args.len() - 1].to_owned())
            }
            "PING" => {
                need(&upper, &args, 1)?;
                Command::PING(args[0].to_owned(), opt(&args, 1))
            }
            "PONG" => {
                need(&upper, &args, 1)?;
                Command::PONG(args[0].to_owned(), opt(&args, 1))
            }
            "ERROR" => {
                need(&upper, &args, 1)?;
                Command::ERROR(args[0].to_owned())
            }
            _ => Command::Raw(upper, args.into_iter().map(str::to_owned).collect()),
        };
        Ok(command)
    }

    /// The verb as it appears on the wire (numerics are zero-padded).
    pub fn name(&self) -> String {
        match self {
            Command::Response(code, _) => format!("{code:03}"),
            Command::Raw(name, _) => name.clone(),
            other => other.static_name().to_owned(),
        }
    }

    fn static_name(&self) -> &'static str {
        match self {
            Command::PASS(_) => "PASS",
            Command::NICK(_) => "NICK",
            Command::USER(..) => "USER",
            Command::QUIT(_) => "QUIT",
            Command::JOIN(..) => "JOIN",
            Command::PART(..) => "PART",
            Command::KICK(..) => "KICK",
            Command::INVITE(..) => "INVITE",
            Command::MODE(..) => "MODE",
            Command::PRIVMSG(..) => "PRIVMSG",
            Command::NOTICE(..) => "NOTICE",
            Command::WHO(_) => "WHO",
            Command::WHOIS(_) => "WHOIS",
            Command::PING(..) => "PING",
            Command::PONG(..) => "PONG",
            Command::ERROR(_) => "ERROR",
            Command::Response(..) | Command::Raw(..) => "",
        }
    }
}

/// Write `name` and its parameters, prefixing the last with `:` when it
/// must be (or `force_trailing` asks for it).
fn write_cmd(
    f: &mut fmt::Formatter<'_>,
    name: &str,
    args: &[&str],
    force_trailing: bool,
) -> fmt::Result {
    f.write_str(name)?;
    let Some((last, middle)) = args.split_last() else {
        return Ok(());
    };
    for arg in middle {
        write!(f, " {arg}")?;
    }
    if force_trailing || last.is_empty() || last.contains(' ') || last.starts_with(':') {
        write!(f, " :{last}")
    } else {
        write!(f, " {last}")
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::PASS(p) => write_cmd(f, "PASS", &[p.as_str()], false),
            Command::NICK(n) => write_cmd(f, "NICK", &[n.as_str()], false),
            Command::USER(u, m, r) => write_cmd(f, "USER", &[u.as_str(), m.as_str(), "*", r.as_str()], true),
            Command::QUIT(Some(r)) => write_cmd(f, "QUIT", &[r.as_str()], true),
            Command::QUIT(None) => write_cmd(f, "QUIT", &[], false),
            Command::JOIN(c, Some(k)) => write_cmd(f, "JOIN", &[c.as_str(), k.as_str()], false),
            Command::JOIN(c, None) => write_cmd(f, "JOIN", &[c.as_str()], false),
            Command::PART(c, Some(r)) => write_cmd(f, "PART", &[c.as_str(), r.as_str()], true),
            Command::PART(c, None) => write_cmd(f, "PART", &[c.as_str()], false),
            Command::KICK(c, n, Some(r)) => write_cmd(f, "KICK", &[c.as_str(), n.as_str(), r.as_str()], true),
            Command::KICK(c, n, None) => write_cmd(f, "KICK", &[c.as_str(), n.as_str()], false),
            Command::INVITE(n, c) => write_cmd(f, "INVITE", &[n.as_str(), c.as_str()], false),
            Command::MODE(t, args) => {
                let mut all = vec![t.as_str()];
                all.extend(args.iter().map(String::as_str));
                write_cmd(f, "MODE", &all, false)
            }
            Command::PRIVMSG(t, m) => write_cmd(f, "PRIVMSG", &[t.as_str(), m.as_str()], true),
            Command::NOTICE(t, m) => write_cmd(f, "NOTICE", &[t.as_str(), m.as_str()], true),
            Command::WHO(m) => write_cmd(f, "WHO", &[m.as_str()], false),
            Command::WHOIS(n) => write_cmd(f, "WHOIS", &[n.as_str()], false),
            Command::PING(t, Some(s)) => write_cmd(f, "PING", &[t.as_str(), s.as_str()], false),
            Command::PING(t, None) => write_cmd(f, "PING", &[t.as_str()], false),
            Command::PONG(t, Some(s)) => write_cmd(f, "PONG", &[t.as_str(), s.as_str()], false),
            Command::PONG(t, None) => write_cmd(f, "PONG", &[t.as_str()], false),
            Command::ERROR(m) => write_cmd(f, "ERROR", &[m.as_str()], true),
            Command::Response(code, args) => {
                let args: Vec<&str> = args.iter().map(String::as_str).collect();
                write_cmd(f, &format!("{code:03}"), &args, false)
            }
            Command::Raw(name, args) => {
                let args: Vec<&str> = args.iter().map(String::as_str).collect();
                write_cmd(f, name, &args, false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_becomes_response() {
        let cmd = Command::new("330", vec!["bot", "nick", "acct", "is logged in as"]).unwrap();
        assert_eq!(
            cmd,
            Command::Response(
                330,
                vec!["bot".into(), "nick".into(), "acct".into(), "is logged in as".into()]
            )
        );
        assert_eq!(cmd.name(), "330");
    }

    #[test]
    fn test_unknown_verb_is_raw() {
        let cmd = Command::new("cap", vec!["*", "LS"]).unwrap();
        assert_eq!(cmd, Command::Raw("CAP".into(), vec!["*".into(), "LS".into()]));
    }

    #[test]
    fn test_not_enough_args() {
        assert_eq!(
            Command::new("KICK", vec!["#chan"]),
            Err(MessageParseError::NotEnoughArgs {
                command: "KICK".into(),
                needed: 2
            })
        );
    }

    #[test]
    fn test_display_trailing_rules() {
        assert_eq!(
            Command::MODE("#chan".into(), vec!["+b".into(), "a!*@*".into()]).to_string(),
            "MODE #chan +b a!*@*"
        );
        assert_eq!(
            Command::PRIVMSG("ChanServ".into(), "op #chan".into()).to_string(),
            "PRIVMSG ChanServ :op #chan"
        );
        assert_eq!(
            Command::USER("warden".into(), "0".into(), "Warden bot".into()).to_string(),
            "USER warden 0 * :Warden bot"
        );
        assert_eq!(Command::PONG("tok".into(), None).to_string(), "PONG tok");
    }
}
