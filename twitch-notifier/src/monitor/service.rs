//! Stream monitor service implementation.
//!
//! The StreamMonitor owns the polling loop and the live/offline edge
//! detector. It is the only component that mutates [`WatchState`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use helix_api::{HelixClient, StreamSnapshot};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::state::{Transition, WatchState};
use crate::notification::Notifier;

/// Source of stream snapshots.
///
/// The seam between the monitor and the API client; tests inject a
/// scripted source so poll cycles can be driven synchronously.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Fetch the current snapshot for a channel; `None` means offline or
    /// unknown login.
    async fn fetch(&self, channel: &str) -> helix_api::Result<Option<StreamSnapshot>>;
}

#[async_trait]
impl SnapshotSource for HelixClient {
    async fn fetch(&self, channel: &str) -> helix_api::Result<Option<StreamSnapshot>> {
        self.get_stream(channel).await
    }
}

/// Configuration for the stream monitor.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Channel login to watch.
    pub channel: String,
    /// Fixed delay between polls.
    pub poll_interval: Duration,
}

/// The stream monitor service.
pub struct StreamMonitor {
    source: Arc<dyn SnapshotSource>,
    notifier: Arc<dyn Notifier>,
    state: WatchState,
    live_tx: watch::Sender<bool>,
    config: MonitorConfig,
}

impl StreamMonitor {
    /// Create a new monitor.
    ///
    /// Returns the monitor together with a receiver for the live flag,
    /// consumed read-only by the health surface.
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        notifier: Arc<dyn Notifier>,
        config: MonitorConfig,
    ) -> (Self, watch::Receiver<bool>) {
        let (live_tx, live_rx) = watch::channel(false);
        let monitor = Self {
            source,
            notifier,
            state: WatchState::Offline,
            live_tx,
            config,
        };
        (monitor, live_rx)
    }

    /// Current observed state.
    pub fn state(&self) -> &WatchState {
        &self.state
    }

    /// Run one poll cycle.
    ///
    /// A fetch failure is logged and leaves the state untouched; the
    /// channel is never forced offline by a transient error. A dispatch
    /// failure is logged by the same rule and does not prevent the state
    /// update, so the announcement is not repeated on the next cycle.
    pub async fn check_once(&mut self) {
        let snapshot = match self.source.fetch(&self.config.channel).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(channel = %self.config.channel, error = %e, "stream status check failed");
                return;
            }
        };

        match self.state.apply(snapshot.as_ref()) {
            Transition::None => {}
            Transition::WentLive { stream_id } => {
                // `apply` yields WentLive only for a live poll result.
                if let Some(snapshot) = snapshot {
                    info!(
                        channel = %self.config.channel,
                        stream_id = %stream_id,
                        title = %snapshot.title,
                        "stream went live"
                    );
                    if let Err(e) = self.notifier.notify_live(&snapshot).await {
                        warn!(
                            channel_type = self.notifier.channel_type(),
                            error = %e,
                            "live notification failed"
                        );
                    }
                    self.state = WatchState::Live { stream_id };
                    self.live_tx.send_replace(true);
                }
            }
            Transition::WentOffline => {
                info!(channel = %self.config.channel, "stream ended");
                self.state = WatchState::Offline;
                self.live_tx.send_replace(false);
            }
        }
    }

    /// Run the polling loop until cancelled.
    ///
    /// The first check runs immediately, then once per interval. Each
    /// tick is awaited to completion before the next is scheduled, so
    /// poll cycles never overlap.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!(
            channel = %self.config.channel,
            interval_secs = self.config.poll_interval.as_secs(),
            "starting stream monitor"
        );

        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    info!("stream monitor shutting down");
                    break;
                }
                _ = interval.tick() => {
                    self.check_once().await;
                }
            }
        }
    }
}
