//! Configuration module for Gatewarden.
//!
//! Loads configuration from environment variables; `main` loads `.env` first.
//! Parsing is written over a key lookup so it can run against a plain map.

mod moderation;
mod parse;

use std::env;
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::ConfigError;

pub use moderation::ModerationSettings;

/// File name of the persisted policy state inside `DATA_DIR`.
const POLICY_FILE: &str = "group_join_data.json";

/// Bot running mode
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BotMode {
    #[default]
    Polling,
    Webhook,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    // Telegram
    pub bot_token: String,
    pub bot_mode: BotMode,
    pub webhook_url: Option<String>,
    pub webhook_port: u16,
    pub webhook_secret: Option<String>,

    /// Owner user IDs (comma-separated).
    /// Owners pass every admin check and receive private audit notices.
    pub owner_ids: Vec<u64>,

    /// Directory holding persisted state.
    pub data_dir: PathBuf,

    /// Options consumed by the moderation engines.
    pub moderation: ModerationSettings,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bot_mode = match lookup("BOT_MODE")
            .unwrap_or_default()
            .trim()
            .to_lowercase()
            .as_str()
        {
            "webhook" => BotMode::Webhook,
            _ => BotMode::Polling,
        };

        let webhook_url = parse::non_empty(lookup("WEBHOOK_URL"));
        if bot_mode == BotMode::Webhook && webhook_url.is_none() {
            return Err(ConfigError::Missing("WEBHOOK_URL"));
        }

        let webhook_port = match parse::non_empty(lookup("WEBHOOK_PORT")) {
            Some(raw) => raw.parse::<u16>().map_err(|_| ConfigError::Invalid {
                key: "WEBHOOK_PORT",
                value: raw,
                expected: "a port number",
            })?,
            None => 8443,
        };

        // Unparsable entries are skipped, matching how ids are typed by hand.
        let owner_ids = lookup("OWNER_IDS")
            .unwrap_or_default()
            .split(',')
            .filter_map(|s| s.trim().parse::<u64>().ok())
            .collect();

        let bot_token =
            parse::non_empty(lookup("BOT_TOKEN")).ok_or(ConfigError::Missing("BOT_TOKEN"))?;

        Ok(Self {
            bot_token,
            bot_mode,
            webhook_url,
            webhook_port,
            webhook_secret: parse::non_empty(lookup("WEBHOOK_SECRET")),
            owner_ids,
            data_dir: parse::non_empty(lookup("DATA_DIR"))
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data")),
            moderation: ModerationSettings::from_lookup(&lookup)?,
        })
    }

    /// Location of the persisted policy file.
    pub fn policy_path(&self) -> PathBuf {
        self.data_dir.join(POLICY_FILE)
    }
}
