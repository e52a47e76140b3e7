//! Per-channel policy.
//!
//! `[channels.defaults]` applies to every channel, then the channel's own
//! table is layered on top. Command rules accumulate in order: each rule is
//! `["allow" | "deny", names...]`, and the name `all` resets every earlier
//! decision to the given default.

use serde::Deserialize;
use std::collections::HashMap;
use warden_proto::irc_eq;

/// Pseudo-channel whose policy governs private messages.
pub const PRIVMSG_POLICY: &str = "privmsg";

const DEFAULT_BAN_SECONDS: i64 = 28800;

/// One channel table as written in the config file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChannelSettings {
    /// The bot may issue operator commands here.
    pub have_ops: Option<bool>,
    /// Expiry for new ledger rows; zero or less never expires.
    pub default_ban_seconds: Option<i64>,
    /// Leave on join and go here instead.
    pub anti_redirect: Option<String>,
    /// Channel key used on join.
    pub key: Option<String>,
    /// Command allow/deny rules.
    #[serde(default)]
    pub commands: Vec<Vec<String>>,
}

/// The `[channels]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChannelsConfig {
    #[serde(default)]
    pub defaults: ChannelSettings,
    #[serde(flatten)]
    pub named: HashMap<String, ChannelSettings>,
}

impl ChannelsConfig {
    /// Settings table for `name`, matched with IRC casemapping.
    pub fn settings(&self, name: &str) -> Option<&ChannelSettings> {
        self.named
            .iter()
            .find(|(key, _)| irc_eq(key, name))
            .map(|(_, settings)| settings)
    }

    /// Effective policy for `name`.
    pub fn policy(&self, name: &str) -> ChannelPolicy {
        let mut policy = ChannelPolicy::new(name);
        policy.apply(&self.defaults);
        if let Some(settings) = self.settings(name) {
            policy.apply(settings);
        }
        policy
    }
}

/// Effective settings for one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelPolicy {
    pub name: String,
    pub have_ops: bool,
    pub default_ban_seconds: i64,
    pub anti_redirect: Option<String>,
    pub key: Option<String>,
    default_usable: bool,
    command_usable: HashMap<String, bool>,
}

impl ChannelPolicy {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            have_ops: false,
            default_ban_seconds: DEFAULT_BAN_SECONDS,
            anti_redirect: None,
            key: None,
            default_usable: false,
            command_usable: HashMap::new(),
        }
    }

    fn apply(&mut self, settings: &ChannelSettings) {
        if let Some(have_ops) = settings.have_ops {
            self.have_ops = have_ops;
        }
        if let Some(seconds) = settings.default_ban_seconds {
            self.default_ban_seconds = seconds;
        }
        if settings.anti_redirect.is_some() {
            self.anti_redirect.clone_from(&settings.anti_redirect);
        }
        if settings.key.is_some() {
            self.key.clone_from(&settings.key);
        }

        for rule in &settings.commands {
            let Some((verb, names)) = rule.split_first() else {
                continue;
            };
            let usable = match verb.as_str() {
                "allow" => true,
                "deny" => false,
                _ => continue,
            };
            if names.len() == 1 && names[0] == "all" {
                self.default_usable = usable;
                self.command_usable.clear();
                continue;
            }
            for name in names {
                self.command_usable.insert(name.clone(), usable);
            }
        }
    }

    /// Whether the chat command (or feature) `name` may be used here.
    pub fn is_command_usable(&self, name: &str) -> bool {
        self.command_usable
            .get(name)
            .copied()
            .unwrap_or(self.default_usable)
    }

    /// Duration for new ledger rows, `None` meaning never.
    pub fn default_ban_duration(&self) -> Option<i64> {
        (self.default_ban_seconds > 0).then_some(self.default_ban_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(rules: &[&[&str]]) -> Vec<Vec<String>> {
        rules
            .iter()
            .map(|r| r.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    fn config() -> ChannelsConfig {
        let mut named = HashMap::new();
        named.insert(
            "#Chan".to_string(),
            ChannelSettings {
                have_ops: Some(true),
                commands: rules(&[&["allow", "all"], &["deny", "stop"]]),
                ..Default::default()
            },
        );
        named.insert(
            "#quiet".to_string(),
            ChannelSettings {
                default_ban_seconds: Some(0),
                commands: rules(&[&["deny", "all"]]),
                ..Default::default()
            },
        );
        ChannelsConfig {
            defaults: ChannelSettings {
                key: Some("sekrit".to_string()),
                commands: rules(&[&["allow", "bans"]]),
                ..Default::default()
            },
            named,
        }
    }

    #[test]
    fn test_defaults_apply_to_unknown_channels() {
        let policy = config().policy("#unlisted");
        assert!(!policy.have_ops);
        assert_eq!(policy.default_ban_duration(), Some(28800));
        assert_eq!(policy.key.as_deref(), Some("sekrit"));
        assert!(policy.is_command_usable("bans"));
        assert!(!policy.is_command_usable("stop"));
    }

    #[test]
    fn test_channel_rules_layer_over_defaults() {
        let policy = config().policy("#chan");
        assert!(policy.have_ops);
        assert!(policy.is_command_usable("lol"));
        assert!(!policy.is_command_usable("stop"));
    }

    #[test]
    fn test_deny_all_resets_earlier_allows() {
        let policy = config().policy("#quiet");
        assert!(!policy.is_command_usable("bans"));
        assert_eq!(policy.default_ban_duration(), None);
    }
}
