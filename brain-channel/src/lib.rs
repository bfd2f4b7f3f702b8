//! # Brain Channel
//!
//! Reconnecting WebSocket client for the Brain Gateway live channels.
//!
//! A channel client keeps one logical subscription to a named channel
//! (`market-data`, `portfolio`, `signals`, ...) alive over an unreliable
//! transport. Every inbound frame is parsed as an [`Envelope`]; malformed
//! frames are logged and dropped.
//!
//! The lifecycle is driven by [`ChannelMachine`], a pure state machine that
//! turns [`Event`]s into [`Action`]s. The spawned driver task performs the
//! actions against a real socket and reports results back as events.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use brain_channel::{ChannelClient, ChannelConfig};
//! use brain_channel::feeds::MarketDataFeed;
//!
//! # async fn run() -> Result<(), brain_core::error::BrainError> {
//! let config = ChannelConfig::builder()
//!     .base_url("ws://localhost:8000/ws")
//!     .channel("market-data")
//!     .build();
//!
//! let feed = Arc::new(MarketDataFeed::new("BTC-USD"));
//! let handle = ChannelClient::new(config).with_callback(feed.clone()).spawn()?;
//!
//! // ... later
//! handle.disconnect();
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

mod client;
mod config;
mod envelope;
mod machine;
mod state;
mod timer;

/// Typed consumers built on top of the channel client
pub mod feeds;

pub use client::{ChannelCallback, ChannelClient, ChannelHandle, ChannelSender, NoopCallback};
pub use config::{ChannelConfig, ChannelConfigBuilder};
pub use envelope::Envelope;
pub use machine::{Action, ChannelMachine, Event, RetryPolicy};
pub use state::{ConnectionState, ReadyState};
pub use timer::ReconnectTimer;
