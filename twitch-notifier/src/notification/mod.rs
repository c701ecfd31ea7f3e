//! Notification dispatch.
//!
//! Channels render a live announcement from a stream snapshot and deliver
//! it to a fixed destination. Delivery failures are surfaced as errors for
//! the monitor to log; they must never crash the poll cycle.

pub mod channels;

use async_trait::async_trait;
use helix_api::StreamSnapshot;

use crate::Result;

/// Trait for live notification channels.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Get the channel type name.
    fn channel_type(&self) -> &'static str;

    /// Deliver a live announcement for the given snapshot.
    async fn notify_live(&self, snapshot: &StreamSnapshot) -> Result<()>;
}
