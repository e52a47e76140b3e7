//! Chat commands and chat filters.
//!
//! Commands are looked up by name in [`BotCommands`] and only run where the
//! channel policy allows them. Filters (currently the no-LOL zone) are named
//! features gated by the same allow/deny rules.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::info;

use super::bot::Bot;

/// Policy name of the no-LOL zone filter.
pub const LOL_FEATURE: &str = "lol";

static LOL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    // Literal pattern; compiling cannot fail.
    Regex::new(r"(?i)\b(lo+l[lo]*|rofl+|lmao+|lel|kek)z*\b").expect("valid lol regex")
});

/// Whether `text` contains laughter the no-LOL zone forbids.
pub fn is_lol(text: &str) -> bool {
    LOL_REGEX.is_match(text)
}

/// What the session should do after a command ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Continue,
    Shutdown,
}

/// One command invocation.
pub struct Invocation<'a> {
    /// Where replies go: the channel, or the sender for private messages.
    pub reply_to: &'a str,
    pub sender: &'a str,
    pub args: Vec<&'a str>,
}

type CommandFn = fn(&Bot, &Invocation<'_>) -> CommandOutcome;

/// Name to handler table for chat commands.
pub struct BotCommands {
    commands: HashMap<&'static str, CommandFn>,
}

impl BotCommands {
    /// The commands the bot ships with.
    pub fn builtin() -> Self {
        let mut commands: HashMap<&'static str, CommandFn> = HashMap::new();
        commands.insert("stop", stop);
        commands.insert("bans", bans);
        Self { commands }
    }

    /// Every name a channel's command rules may mention.
    pub fn known_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.commands.keys().copied().collect();
        names.push(LOL_FEATURE);
        names.sort_unstable();
        names
    }

    /// Handler for `name`. Usability is the caller's check, since it depends
    /// on where the line came from.
    pub fn lookup(&self, name: &str) -> Option<CommandFn> {
        self.commands.get(name).copied()
    }
}

/// Pull the command text out of a message.
///
/// Channel messages must address the bot (`warden: bans`, `warden, bans!`);
/// private messages are commands as they stand.
pub fn extract_command(nick: &str, text: &str, private: bool) -> Option<String> {
    let pattern = format!(r"(?i)^\s*{}\s*[,:> ]+(\S?.*?)[.!?]?\s*$", regex::escape(nick));
    if let Ok(addressed) = Regex::new(&pattern)
        && let Some(caps) = addressed.captures(text)
    {
        return caps
            .get(1)
            .map(|m| m.as_str().to_owned())
            .filter(|c| !c.is_empty());
    }
    let text = text.trim();
    (private && !text.is_empty()).then(|| text.to_owned())
}

fn stop(bot: &Bot, call: &Invocation<'_>) -> CommandOutcome {
    info!(sender = %call.sender, "stop requested");
    bot.outbox.msg(call.reply_to, "Okay!");
    CommandOutcome::Shutdown
}

fn bans(bot: &Bot, call: &Invocation<'_>) -> CommandOutcome {
    bot.outbox.msg(call.reply_to, &bot.config.web.link("/bans"));
    CommandOutcome::Continue
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_addressed_command() {
        assert_eq!(
            extract_command("warden", "warden: bans", false).as_deref(),
            Some("bans")
        );
        assert_eq!(
            extract_command("warden", "  Warden, stop!", false).as_deref(),
            Some("stop")
        );
        assert_eq!(
            extract_command("warden", "warden> bans please?", false).as_deref(),
            Some("bans please")
        );
        assert_eq!(extract_command("warden", "wardens: bans", false), None);
        assert_eq!(extract_command("warden", "hello everyone", false), None);
    }

    #[test]
    fn test_private_messages_are_commands() {
        assert_eq!(extract_command("warden", "bans", true).as_deref(), Some("bans"));
        assert_eq!(extract_command("warden", "   ", true), None);
    }

    #[test]
    fn test_nick_with_regex_metacharacters() {
        assert_eq!(
            extract_command("w[ard]en", "w[ard]en: bans", false).as_deref(),
            Some("bans")
        );
    }

    #[test]
    fn test_lol_detection() {
        assert!(is_lol("lol"));
        assert!(is_lol("that was LOOOOL"));
        assert!(is_lol("roflz"));
        assert!(is_lol("kek"));
        assert!(!is_lol("lollipop"));
        assert!(!is_lol("hello"));
    }

    #[test]
    fn test_known_names() {
        assert_eq!(BotCommands::builtin().known_names(), vec!["bans", "lol", "stop"]);
    }
}
