//! Stream monitor module.
//!
//! The Stream Monitor is responsible for:
//! - Polling the channel's live status on a fixed interval
//! - Detecting live/offline transitions and new broadcast sessions
//! - Dispatching one notification per detected live transition
//! - Publishing the live flag for the health surface

mod service;
mod state;

pub use service::{MonitorConfig, SnapshotSource, StreamMonitor};
pub use state::{Transition, WatchState};
