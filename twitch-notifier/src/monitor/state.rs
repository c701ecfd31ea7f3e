//! Live/offline state tracking and transition detection.

use helix_api::StreamSnapshot;
use serde::{Deserialize, Serialize};

/// Observed state of the monitored channel.
///
/// The broadcast session id is tracked only while live, so "live without
/// an id" (and the reverse) is unrepresentable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WatchState {
    /// Channel is offline, or has not been observed yet.
    #[default]
    Offline,
    /// Channel is live with the given broadcast session id.
    Live { stream_id: String },
}

impl WatchState {
    /// Check if the channel is currently considered live.
    pub fn is_live(&self) -> bool {
        matches!(self, WatchState::Live { .. })
    }

    /// Get the current broadcast session id, if live.
    pub fn stream_id(&self) -> Option<&str> {
        match self {
            WatchState::Live { stream_id } => Some(stream_id),
            WatchState::Offline => None,
        }
    }

    /// Decide the transition for one poll result.
    ///
    /// A notification is due only for `WentLive`, which covers both the
    /// offline-to-live edge and a live id change without an offline gap
    /// (the platform started a new broadcast session).
    pub fn apply(&self, poll: Option<&StreamSnapshot>) -> Transition {
        match (self, poll) {
            (WatchState::Live { stream_id }, Some(snapshot)) if *stream_id == snapshot.id => {
                Transition::None
            }
            (_, Some(snapshot)) => Transition::WentLive {
                stream_id: snapshot.id.clone(),
            },
            (WatchState::Live { .. }, None) => Transition::WentOffline,
            (WatchState::Offline, None) => Transition::None,
        }
    }
}

/// Outcome of comparing a poll result against the previous state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Nothing changed; no state mutation, no dispatch.
    None,
    /// Channel entered a new broadcast session; fire a notification.
    WentLive { stream_id: String },
    /// Channel went offline; reset state, no notification.
    WentOffline,
}
