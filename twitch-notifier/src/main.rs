use std::sync::Arc;
use std::time::Instant;

use helix_api::HelixClient;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use twitch_notifier::config::AppConfig;
use twitch_notifier::health::{self, HealthState};
use twitch_notifier::monitor::{MonitorConfig, StreamMonitor};
use twitch_notifier::notification::channels::{DiscordConfig, DiscordNotifier};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "twitch_notifier=info,helix_api=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;

    let client = Arc::new(HelixClient::new(
        config.twitch_client_id.clone(),
        config.twitch_client_secret.clone(),
    ));

    let notifier = Arc::new(DiscordNotifier::new(
        DiscordConfig::new(config.discord_token.clone(), config.discord_channel_id.clone())
            .with_mention(config.mention.clone()),
    ));

    // Failing to reach Discord at startup is fatal; everything after this
    // point is retried or skipped per poll cycle instead.
    notifier.probe().await?;
    tracing::info!(channel = %config.twitch_channel, "connected to the Discord API");

    let cancel = CancellationToken::new();

    let (monitor, live_rx) = StreamMonitor::new(
        client,
        notifier,
        MonitorConfig {
            channel: config.twitch_channel.clone(),
            poll_interval: config.poll_interval,
        },
    );

    let health_state = HealthState {
        monitored_channel: config.twitch_channel.clone(),
        live_rx,
        start_time: Instant::now(),
    };
    let health_task = tokio::spawn(health::serve(config.port, health_state, cancel.clone()));
    let monitor_task = tokio::spawn(monitor.run(cancel.clone()));

    shutdown_signal().await;
    tracing::info!("shutdown signal received, stopping");
    cancel.cancel();

    let _ = monitor_task.await;
    if let Ok(Err(e)) = health_task.await {
        tracing::warn!(error = %e, "health server exited with error");
    }

    Ok(())
}

/// Wait for SIGINT (and SIGTERM on unix).
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term =
            signal(SignalKind::terminate()).expect("Failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = term.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
