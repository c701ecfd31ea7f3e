//! Twitch Helix API client.
//!
//! This crate wraps the two Helix read endpoints the notifier needs
//! (user lookup and stream lookup) behind a client that owns the
//! application access token lifecycle: lazy acquisition through the
//! client-credentials grant, expiry bookkeeping, and a single bounded
//! retry when the API rejects a token that local bookkeeping still
//! considered valid.

pub mod client;
pub mod error;
pub mod models;

pub use client::HelixClient;
pub use error::{Error, Result};
pub use models::{Stream, StreamSnapshot, User};
