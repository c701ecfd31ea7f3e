//! Notification channels.
//!
//! Currently a single channel: Discord, via the REST API.

mod discord;

pub use discord::{DiscordConfig, DiscordNotifier};
