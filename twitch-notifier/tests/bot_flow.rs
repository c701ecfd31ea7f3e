//! End-to-end tests for the notifier.
//!
//! Wires the real Helix client, stream monitor, and Discord channel
//! against in-process fake servers, then drives poll cycles by hand and
//! asserts on the messages the fake Discord endpoint receives.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{Value, json};

use helix_api::HelixClient;
use twitch_notifier::monitor::{MonitorConfig, StreamMonitor};
use twitch_notifier::notification::channels::{DiscordConfig, DiscordNotifier};

/// Fake Helix: always accepts the issued token, serves scripted payloads.
#[derive(Default)]
struct FakeHelix {
    user: Mutex<Option<Value>>,
    stream: Mutex<Option<Value>>,
}

/// Fake Discord: records every posted message.
#[derive(Default)]
struct FakeDiscord {
    messages: Mutex<Vec<Value>>,
    reject_token: AtomicBool,
}

async fn token_endpoint() -> Json<Value> {
    Json(json!({ "access_token": "fake-token", "expires_in": 3600, "token_type": "bearer" }))
}

async fn users_endpoint(State(state): State<Arc<FakeHelix>>) -> Json<Value> {
    let data: Vec<Value> = state.user.lock().clone().into_iter().collect();
    Json(json!({ "data": data }))
}

async fn streams_endpoint(State(state): State<Arc<FakeHelix>>) -> Json<Value> {
    let data: Vec<Value> = state.stream.lock().clone().into_iter().collect();
    Json(json!({ "data": data }))
}

async fn me_endpoint(State(state): State<Arc<FakeDiscord>>) -> (StatusCode, Json<Value>) {
    if state.reject_token.load(Ordering::SeqCst) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "401: Unauthorized" })),
        );
    }
    (StatusCode::OK, Json(json!({ "id": "1", "username": "notifier" })))
}

async fn messages_endpoint(
    State(state): State<Arc<FakeDiscord>>,
    Json(payload): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.messages.lock().push(payload);
    (StatusCode::OK, Json(json!({ "id": "900" })))
}

async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind fake server");
    let addr = listener.local_addr().expect("Failed to read local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("fake server died");
    });
    format!("http://{addr}")
}

async fn setup() -> (Arc<FakeHelix>, Arc<FakeDiscord>, StreamMonitor, tokio::sync::watch::Receiver<bool>)
{
    let helix_state = Arc::new(FakeHelix::default());
    let helix_base = spawn(
        Router::new()
            .route("/oauth2/token", post(token_endpoint))
            .route("/helix/users", get(users_endpoint))
            .route("/helix/streams", get(streams_endpoint))
            .with_state(helix_state.clone()),
    )
    .await;

    let discord_state = Arc::new(FakeDiscord::default());
    let discord_base = spawn(
        Router::new()
            .route("/users/@me", get(me_endpoint))
            .route("/channels/{channel_id}/messages", post(messages_endpoint))
            .with_state(discord_state.clone()),
    )
    .await;

    let client = Arc::new(HelixClient::with_base_urls(
        "client-id",
        "secret",
        &helix_base,
        &helix_base,
    ));

    let mut discord_config = DiscordConfig::new("bot-token", "1234567890")
        .with_mention(Some("@everyone".to_string()));
    discord_config.api_base = discord_base;
    let notifier = Arc::new(DiscordNotifier::new(discord_config));

    let (monitor, live_rx) = StreamMonitor::new(
        client,
        notifier,
        MonitorConfig {
            channel: "rello".to_string(),
            poll_interval: Duration::from_secs(120),
        },
    );

    (helix_state, discord_state, monitor, live_rx)
}

fn sample_user() -> Value {
    json!({
        "id": "141981764",
        "login": "rello",
        "display_name": "Rello",
        "profile_image_url": "https://static-cdn.jtvnw.net/user-profile.png"
    })
}

fn live_stream(id: &str, game_name: Option<&str>) -> Value {
    let mut stream = json!({
        "id": id,
        "user_login": "rello",
        "user_name": "Rello",
        "type": "live",
        "title": "drums and chatting",
        "viewer_count": 42,
        "started_at": "2024-03-08T15:30:57Z",
        "thumbnail_url": "https://static-cdn.jtvnw.net/previews-ttv/live_user_rello-{width}x{height}.jpg"
    });
    if let Some(game_name) = game_name {
        stream["game_name"] = json!(game_name);
    }
    stream
}

#[tokio::test]
async fn full_live_cycle_announces_each_broadcast_once() {
    let (helix, discord, mut monitor, live_rx) = setup().await;
    *helix.user.lock() = Some(sample_user());

    // Offline at startup: nothing announced.
    monitor.check_once().await;
    assert!(discord.messages.lock().is_empty());
    assert!(!*live_rx.borrow());

    // Goes live: one announcement.
    *helix.stream.lock() = Some(live_stream("a", None));
    monitor.check_once().await;
    monitor.check_once().await;
    assert_eq!(discord.messages.lock().len(), 1);
    assert!(*live_rx.borrow());

    // New broadcast session without an offline gap: announced again.
    *helix.stream.lock() = Some(live_stream("b", Some("Music")));
    monitor.check_once().await;
    assert_eq!(discord.messages.lock().len(), 2);

    // Stream ends: silent reset.
    *helix.stream.lock() = None;
    monitor.check_once().await;
    assert_eq!(discord.messages.lock().len(), 2);
    assert!(!*live_rx.borrow());
}

#[tokio::test]
async fn announcement_payload_renders_snapshot() {
    let (helix, discord, mut monitor, _live_rx) = setup().await;
    *helix.user.lock() = Some(sample_user());
    // No game_name set on the stream payload.
    *helix.stream.lock() = Some(live_stream("a", None));

    monitor.check_once().await;

    let messages = discord.messages.lock();
    let embed = &messages[0]["embeds"][0];
    assert_eq!(embed["fields"][0]["value"], "Just Chatting");
    assert_eq!(embed["fields"][1]["value"], "42");
    assert_eq!(embed["url"], "https://www.twitch.tv/rello");
    assert!(
        embed["image"]["url"]
            .as_str()
            .unwrap()
            .contains("1920x1080")
    );
    assert_eq!(
        embed["thumbnail"]["url"],
        "https://static-cdn.jtvnw.net/user-profile.png"
    );
    assert!(
        messages[0]["content"]
            .as_str()
            .unwrap()
            .contains("@everyone")
    );
}

#[tokio::test]
async fn startup_probe_rejects_bad_token() {
    let discord_state = Arc::new(FakeDiscord::default());
    discord_state.reject_token.store(true, Ordering::SeqCst);
    let discord_base = spawn(
        Router::new()
            .route("/users/@me", get(me_endpoint))
            .with_state(discord_state.clone()),
    )
    .await;

    let mut config = DiscordConfig::new("bad-token", "1234567890");
    config.api_base = discord_base;
    let notifier = DiscordNotifier::new(config);

    assert!(notifier.probe().await.is_err());
}
