//! Serde models for Helix payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Response from the client-credentials token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Token lifetime in seconds.
    pub expires_in: i64,
    #[serde(default)]
    pub token_type: String,
}

/// Envelope for Helix list responses (`{ "data": [...] }`).
#[derive(Debug, Clone, Deserialize)]
pub struct DataEnvelope<T> {
    pub data: Vec<T>,
}

/// A Helix user record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub login: String,
    pub display_name: String,
    #[serde(default)]
    pub profile_image_url: Option<String>,
}

/// A Helix stream record as returned by the streams endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stream {
    pub id: String,
    pub user_login: String,
    pub user_name: String,
    /// "live" for a running broadcast; other values are treated as offline.
    #[serde(rename = "type", default)]
    pub stream_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub game_name: Option<String>,
    #[serde(default)]
    pub viewer_count: u64,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    /// Template URL with `{width}`/`{height}` placeholders.
    #[serde(default)]
    pub thumbnail_url: String,
}

impl Stream {
    /// Check whether the record describes a running broadcast.
    pub fn is_live(&self) -> bool {
        self.stream_type == "live"
    }
}

/// A point-in-time view of a live channel.
///
/// Merged from the stream record and the user record, because the streams
/// endpoint alone lacks the profile image needed for notification
/// rendering. Constructed fresh on each poll and not retained beyond a
/// single comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamSnapshot {
    /// Broadcast session id; changes when a new stream starts.
    pub id: String,
    pub user_login: String,
    pub user_name: String,
    pub title: String,
    pub game_name: Option<String>,
    pub viewer_count: u64,
    pub started_at: Option<DateTime<Utc>>,
    /// Template URL with `{width}`/`{height}` placeholders.
    pub thumbnail_url: String,
    pub profile_image_url: Option<String>,
}

impl StreamSnapshot {
    /// Merge a live stream record with the owning user's profile image.
    pub fn from_stream(stream: Stream, profile_image_url: Option<String>) -> Self {
        Self {
            id: stream.id,
            user_login: stream.user_login,
            user_name: stream.user_name,
            title: stream.title,
            game_name: stream.game_name,
            viewer_count: stream.viewer_count,
            started_at: stream.started_at,
            thumbnail_url: stream.thumbnail_url,
            profile_image_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_is_live() {
        let json = r#"{
            "id": "40952121085",
            "user_login": "cohhcarnage",
            "user_name": "CohhCarnage",
            "type": "live",
            "title": "Road to 100!",
            "game_name": "Deep Rock Galactic",
            "viewer_count": 5723,
            "started_at": "2024-03-08T15:30:57Z",
            "thumbnail_url": "https://static-cdn.jtvnw.net/previews-ttv/live_user_cohhcarnage-{width}x{height}.jpg"
        }"#;

        let stream: Stream = serde_json::from_str(json).unwrap();
        assert!(stream.is_live());
        assert_eq!(stream.viewer_count, 5723);
        assert_eq!(stream.game_name.as_deref(), Some("Deep Rock Galactic"));
    }

    #[test]
    fn test_stream_missing_optional_fields() {
        // game_name and started_at can be absent from the payload
        let json = r#"{
            "id": "1",
            "user_login": "someone",
            "user_name": "Someone",
            "type": "live",
            "title": "hi",
            "viewer_count": 3,
            "thumbnail_url": ""
        }"#;

        let stream: Stream = serde_json::from_str(json).unwrap();
        assert!(stream.game_name.is_none());
        assert!(stream.started_at.is_none());
    }

    #[test]
    fn test_snapshot_merges_profile_image() {
        let stream = Stream {
            id: "42".to_string(),
            user_login: "someone".to_string(),
            user_name: "Someone".to_string(),
            stream_type: "live".to_string(),
            title: "hi".to_string(),
            game_name: None,
            viewer_count: 1,
            started_at: None,
            thumbnail_url: String::new(),
        };

        let snapshot = StreamSnapshot::from_stream(
            stream,
            Some("https://example.com/avatar.png".to_string()),
        );
        assert_eq!(snapshot.id, "42");
        assert_eq!(
            snapshot.profile_image_url.as_deref(),
            Some("https://example.com/avatar.png")
        );
    }
}
