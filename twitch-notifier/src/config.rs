//! Environment-derived application configuration.
//!
//! All settings come from the process environment (optionally seeded from
//! a `.env` file by the bootstrap). Missing required variables are a
//! fatal configuration error at startup.

use std::env;
use std::time::Duration;

use crate::error::{Error, Result};

/// Environment variables that must be present and non-empty.
const REQUIRED_VARS: &[&str] = &[
    "DISCORD_TOKEN",
    "DISCORD_CHANNEL_ID",
    "TWITCH_CLIENT_ID",
    "TWITCH_CLIENT_SECRET",
    "TWITCH_CHANNEL",
];

/// Default poll interval in minutes.
const DEFAULT_CHECK_INTERVAL_MINUTES: u64 = 2;

/// Default HTTP port for the health surface.
const DEFAULT_PORT: u16 = 3000;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Discord bot token.
    pub discord_token: String,
    /// Discord channel that receives live announcements.
    pub discord_channel_id: String,
    /// Twitch application client id.
    pub twitch_client_id: String,
    /// Twitch application client secret.
    pub twitch_client_secret: String,
    /// Channel login to monitor.
    pub twitch_channel: String,
    /// Fixed delay between polls.
    pub poll_interval: Duration,
    /// Port for the health surface.
    pub port: u16,
    /// Optional mention prefixed to announcements (e.g. "@everyone").
    pub mention: Option<String>,
}

impl AppConfig {
    /// Build the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        let missing: Vec<&str> = REQUIRED_VARS
            .iter()
            .copied()
            .filter(|name| env::var(name).map(|v| v.trim().is_empty()).unwrap_or(true))
            .collect();

        if !missing.is_empty() {
            return Err(Error::config(format!(
                "missing required environment variables: {}",
                missing.join(", ")
            )));
        }

        Ok(Self {
            discord_token: env::var("DISCORD_TOKEN").unwrap_or_default(),
            discord_channel_id: env::var("DISCORD_CHANNEL_ID").unwrap_or_default(),
            twitch_client_id: env::var("TWITCH_CLIENT_ID").unwrap_or_default(),
            twitch_client_secret: env::var("TWITCH_CLIENT_SECRET").unwrap_or_default(),
            twitch_channel: env::var("TWITCH_CHANNEL").unwrap_or_default(),
            poll_interval: parse_poll_interval(env::var("CHECK_INTERVAL").ok()),
            port: parse_port(env::var("PORT").ok()),
            mention: parse_mention(env::var("DISCORD_MENTION").ok()),
        })
    }
}

/// Parse the poll interval (in minutes) with fallback to the default.
fn parse_poll_interval(raw: Option<String>) -> Duration {
    let minutes = raw
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|&m| m > 0)
        .unwrap_or(DEFAULT_CHECK_INTERVAL_MINUTES);
    Duration::from_secs(minutes * 60)
}

/// Parse the health port with fallback to the default.
fn parse_port(raw: Option<String>) -> u16 {
    raw.and_then(|v| v.trim().parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT)
}

/// Normalize the optional mention; empty strings mean "no mention".
fn parse_mention(raw: Option<String>) -> Option<String> {
    raw.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
