//! Discord notification channel.
//!
//! Delivers live announcements through the Discord REST API with a bot
//! token. Implements Discord's recommended rate limit handling:
//! - No hardcoded rate limits
//! - Retries on 429 responses respecting the Retry-After header

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use helix_api::StreamSnapshot;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::notification::Notifier;

/// Maximum number of retries for rate-limited requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Discord REST API base.
const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

/// Embed accent color (Twitch purple).
const EMBED_COLOR: u32 = 0x9146FF;

/// Dimensions substituted into the Helix thumbnail template.
const THUMBNAIL_WIDTH: u32 = 1920;
const THUMBNAIL_HEIGHT: u32 = 1080;

/// Discord channel configuration.
#[derive(Debug, Clone)]
pub struct DiscordConfig {
    /// Bot token for the Authorization header.
    pub bot_token: String,
    /// Channel that receives live announcements.
    pub channel_id: String,
    /// Optional mention appended to the message content (e.g. "@everyone").
    pub mention: Option<String>,
    /// REST API base, overridable for tests.
    pub api_base: String,
}

impl DiscordConfig {
    /// Create a configuration against the production API.
    pub fn new(bot_token: impl Into<String>, channel_id: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            channel_id: channel_id.into(),
            mention: None,
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    /// Set the mention appended to announcements.
    pub fn with_mention(mut self, mention: Option<String>) -> Self {
        self.mention = mention;
        self
    }
}

/// Discord notification channel.
pub struct DiscordNotifier {
    config: DiscordConfig,
    client: Client,
}

impl DiscordNotifier {
    /// Create a new Discord channel.
    pub fn new(config: DiscordConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    /// Verify the configured token against the API.
    ///
    /// Called once at startup; a rejecting or unreachable API is fatal.
    pub async fn probe(&self) -> Result<()> {
        let url = format!("{}/users/@me", self.config.api_base);
        let response = self
            .client
            .get(&url)
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(|e| Error::notification(format!("Discord probe failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::notification(format!(
                "Discord rejected the bot token: {status} - {body}"
            )));
        }
        Ok(())
    }

    fn auth_header(&self) -> String {
        format!("Bot {}", self.config.bot_token)
    }

    /// Build the message payload for a live announcement.
    fn build_payload(&self, snapshot: &StreamSnapshot) -> serde_json::Value {
        let watch_url = format!("https://www.twitch.tv/{}", snapshot.user_login);
        let category = snapshot
            .game_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or("Just Chatting");

        let mut embed = json!({
            "title": format!("{} is now live on Twitch!", snapshot.user_name),
            "url": watch_url,
            "description": if snapshot.title.is_empty() { "No title" } else { snapshot.title.as_str() },
            "color": EMBED_COLOR,
            "fields": [
                { "name": "Category", "value": category, "inline": true },
                { "name": "Viewers", "value": snapshot.viewer_count.to_string(), "inline": true },
                { "name": "Watch", "value": format!("[Click here]({watch_url})"), "inline": true },
            ],
            "timestamp": Utc::now().to_rfc3339(),
        });

        if !snapshot.thumbnail_url.is_empty() {
            let image_url =
                render_thumbnail_url(&snapshot.thumbnail_url, Utc::now().timestamp_millis());
            embed["image"] = json!({ "url": image_url });
        }
        if let Some(profile_image_url) = &snapshot.profile_image_url {
            embed["thumbnail"] = json!({ "url": profile_image_url });
        }

        let content = match &self.config.mention {
            Some(mention) => format!("🔴 **{}** is now live! {}", snapshot.user_name, mention),
            None => format!("🔴 **{}** is now live!", snapshot.user_name),
        };

        json!({
            "content": content,
            "embeds": [embed],
        })
    }

    /// Send request with rate limit handling.
    /// Retries on 429 responses respecting the Retry-After header.
    async fn send_with_retry(&self, payload: &serde_json::Value) -> Result<()> {
        let url = format!(
            "{}/channels/{}/messages",
            self.config.api_base, self.config.channel_id
        );
        let mut attempts = 0;

        loop {
            attempts += 1;

            let response = self
                .client
                .post(&url)
                .header("Authorization", self.auth_header())
                .json(payload)
                .send()
                .await
                .map_err(|e| Error::notification(format!("Discord request failed: {e}")))?;

            let status = response.status();

            if status.is_success() {
                return Ok(());
            }

            if status.as_u16() == 429 {
                let retry_after = parse_retry_after(&response);

                if attempts >= MAX_RATE_LIMIT_RETRIES {
                    warn!(
                        "Discord rate limit: max retries ({}) exceeded, last retry_after was {:?}",
                        MAX_RATE_LIMIT_RETRIES, retry_after
                    );
                    return Err(Error::notification(format!(
                        "Discord rate limit exceeded after {MAX_RATE_LIMIT_RETRIES} retries"
                    )));
                }

                let wait_duration = retry_after.unwrap_or(Duration::from_secs(1));
                debug!(
                    "Discord rate limited (429), waiting {:?} before retry (attempt {}/{})",
                    wait_duration, attempts, MAX_RATE_LIMIT_RETRIES
                );
                tokio::time::sleep(wait_duration).await;
                continue;
            }

            // Other error - don't retry
            let body = response.text().await.unwrap_or_default();
            warn!("Discord message failed: {} - {}", status, body);
            return Err(Error::notification(format!(
                "Discord message failed: {status} - {body}"
            )));
        }
    }
}

/// Parse the Retry-After duration from a 429 response.
fn parse_retry_after(response: &reqwest::Response) -> Option<Duration> {
    // Try Retry-After header first (Discord sets this)
    if let Some(retry_after) = response.headers().get("Retry-After")
        && let Ok(secs) = retry_after.to_str().ok()?.parse::<f64>()
    {
        return Some(Duration::from_secs_f64(secs));
    }

    // Fallback: try X-RateLimit-Reset-After header
    if let Some(reset_after) = response.headers().get("X-RateLimit-Reset-After")
        && let Ok(secs) = reset_after.to_str().ok()?.parse::<f64>()
    {
        return Some(Duration::from_secs_f64(secs));
    }

    None
}

/// Substitute the `{width}`/`{height}` placeholders and append a
/// timestamp query parameter so Discord does not serve a cached preview.
fn render_thumbnail_url(template: &str, now_ms: i64) -> String {
    let url = template
        .replace("{width}", &THUMBNAIL_WIDTH.to_string())
        .replace("{height}", &THUMBNAIL_HEIGHT.to_string());
    format!("{url}?t={now_ms}")
}

#[async_trait]
impl Notifier for DiscordNotifier {
    fn channel_type(&self) -> &'static str {
        "discord"
    }

    async fn notify_live(&self, snapshot: &StreamSnapshot) -> Result<()> {
        let payload = self.build_payload(snapshot);
        self.send_with_retry(&payload).await?;

        debug!(channel_id = %self.config.channel_id, "Discord notification sent");
        Ok(())
    }
}
