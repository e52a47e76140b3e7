//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::{Config, PRIVMSG_POLICY};
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("irc.nickname is required")]
    MissingNickname,
    #[error("irc.server is required")]
    MissingServer,
    #[error("not a channel name: '{0}'")]
    InvalidChannelName(String),
    #[error("{channel}: command rule must start with \"allow\" or \"deny\": {rule:?}")]
    InvalidCommandRule { channel: String, rule: Vec<String> },
    #[error("{channel}: unknown command '{command}'")]
    UnknownCommand { channel: String, command: String },
    #[error("web.url must start with http:// or https://, got '{0}'")]
    InvalidWebUrl(String),
}

fn is_channel_name(name: &str) -> bool {
    name.len() > 1
        && name.starts_with(['#', '&'])
        && !name.contains([' ', ',', '\x07'])
}

/// Validate a configuration, returning all errors found.
///
/// `known_commands` lists every chat command and feature name a command
/// rule may mention.
pub fn validate(config: &Config, known_commands: &[&str]) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.irc.nickname.trim().is_empty() {
        errors.push(ValidationError::MissingNickname);
    }
    if config.irc.server.trim().is_empty() {
        errors.push(ValidationError::MissingServer);
    }
    if !config.web.url.starts_with("http://") && !config.web.url.starts_with("https://") {
        errors.push(ValidationError::InvalidWebUrl(config.web.url.clone()));
    }

    for channel in &config.irc.autojoin {
        if !is_channel_name(channel) {
            errors.push(ValidationError::InvalidChannelName(channel.clone()));
        }
    }

    let tables = std::iter::once(("defaults", &config.channels.defaults)).chain(
        config
            .channels
            .named
            .iter()
            .map(|(name, settings)| (name.as_str(), settings)),
    );

    for (name, settings) in tables {
        if name != "defaults" && name != PRIVMSG_POLICY && !is_channel_name(name) {
            errors.push(ValidationError::InvalidChannelName(name.to_string()));
        }
        if let Some(target) = &settings.anti_redirect
            && !is_channel_name(target)
        {
            errors.push(ValidationError::InvalidChannelName(target.clone()));
        }

        for rule in &settings.commands {
            match rule.split_first() {
                Some((verb, names)) if verb == "allow" || verb == "deny" => {
                    for command in names {
                        if command != "all" && !known_commands.contains(&command.as_str()) {
                            errors.push(ValidationError::UnknownCommand {
                                channel: name.to_string(),
                                command: command.clone(),
                            });
                        }
                    }
                }
                _ => errors.push(ValidationError::InvalidCommandRule {
                    channel: name.to_string(),
                    rule: rule.clone(),
                }),
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
