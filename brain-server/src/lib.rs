//! # Brain Server
//!
//! Process wiring for Brain Link.
//!
//! This crate provides:
//! - The combined [`ServerConfig`] loaded from file, environment and flags
//! - Graceful shutdown on SIGINT/SIGTERM
//! - The channel watcher used by `brain-server watch`

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod shutdown;
pub mod watch;

pub use config::{ChannelDefaults, ServerConfig};
pub use shutdown::ShutdownController;
pub use watch::{FeedKind, LoggingCallback, Watcher};
