//! Core configuration types.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use super::channel::{ChannelPolicy, ChannelsConfig};
use super::validation::ValidationError;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
    Invalid(Vec<ValidationError>),
}

/// Bot configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// IRC connection and identity.
    pub irc: IrcConfig,
    /// Web UI.
    #[serde(default)]
    pub web: WebConfig,
    /// Ledger storage.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Ban list handling.
    #[serde(default)]
    pub bans: BansConfig,
    /// Channel policies.
    #[serde(default)]
    pub channels: ChannelsConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Run the startup checks; `known_commands` are the registered chat
    /// commands and features.
    pub fn validate(&self, known_commands: &[&str]) -> Result<(), ConfigError> {
        super::validation::validate(self, known_commands).map_err(ConfigError::Invalid)
    }

    /// Effective policy for a channel (or for [`super::PRIVMSG_POLICY`]).
    pub fn channel(&self, name: &str) -> ChannelPolicy {
        self.channels.policy(name)
    }
}

/// `[irc]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct IrcConfig {
    /// Server hostname.
    pub server: String,
    #[serde(default = "default_irc_port")]
    pub port: u16,
    /// Connect with TLS.
    #[serde(default)]
    pub tls: bool,
    pub nickname: String,
    /// Username for `USER`; defaults to the nickname.
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default = "default_realname")]
    pub realname: String,
    /// Server password sent with `PASS`.
    #[serde(default)]
    pub password: Option<String>,
    /// Password for `NickServ identify`.
    #[serde(default)]
    pub nickserv_password: Option<String>,
    /// Channels to join once signed on (and identified, if applicable).
    #[serde(default)]
    pub autojoin: Vec<String>,
}

fn default_irc_port() -> u16 {
    6667
}

fn default_realname() -> String {
    "warden".to_string()
}

/// `[web]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    /// Public base URL used in links sent over IRC.
    #[serde(default = "default_web_url")]
    pub url: String,
    #[serde(default = "default_web_bind")]
    pub bind: String,
    #[serde(default = "default_web_port")]
    pub port: u16,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            url: default_web_url(),
            bind: default_web_bind(),
            port: default_web_port(),
        }
    }
}

impl WebConfig {
    /// `<url><path>` without doubling the slash between them.
    pub fn link(&self, path: &str) -> String {
        format!("{}{}", self.url.trim_end_matches('/'), path)
    }
}

fn default_web_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_web_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_web_port() -> u16 {
    8080
}

/// `[database]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    "warden.db".to_string()
}

/// `[bans]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct BansConfig {
    /// Bans whose setter looks like a server under this suffix are not
    /// pulled into the ledger.
    #[serde(default = "default_server_suffix")]
    pub server_suffix: String,
}

impl Default for BansConfig {
    fn default() -> Self {
        Self {
            server_suffix: default_server_suffix(),
        }
    }
}

fn default_server_suffix() -> String {
    ".freenode.net".to_string()
}
