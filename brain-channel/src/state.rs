//! Channel connection state.

#![allow(clippy::redundant_pub_crate)]

use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::envelope::Envelope;

/// Lifecycle state of a channel client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionState {
    /// No transport and no retry pending.
    #[default]
    Disconnected,
    /// A transport is being opened.
    Connecting,
    /// The transport is open.
    Connected,
    /// Waiting for the reconnect timer.
    Reconnecting,
    /// The transport is being closed.
    Closing,
    /// Closed on request; no further retries.
    Closed,
}

impl ConnectionState {
    /// Returns true if the connection is active.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Returns true if the connection is in a transitional state.
    #[must_use]
    pub fn is_transitioning(&self) -> bool {
        matches!(self, Self::Connecting | Self::Reconnecting | Self::Closing)
    }

    /// Returns true if the connection is closed or disconnected.
    #[must_use]
    pub fn is_inactive(&self) -> bool {
        matches!(self, Self::Disconnected | Self::Closed)
    }

    /// Maps the client lifecycle onto the transport ready state.
    #[must_use]
    pub fn ready_state(&self) -> ReadyState {
        match self {
            Self::Connecting => ReadyState::Connecting,
            Self::Connected => ReadyState::Open,
            Self::Closing => ReadyState::Closing,
            Self::Disconnected | Self::Reconnecting | Self::Closed => ReadyState::Closed,
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
            Self::Reconnecting => write!(f, "Reconnecting"),
            Self::Closing => write!(f, "Closing"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}

/// Transport-level ready state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadyState {
    /// Handshake in progress.
    Connecting,
    /// Frames can be exchanged.
    Open,
    /// Close handshake in progress.
    Closing,
    /// No transport.
    Closed,
}

/// Snapshot shared between the driver task and handles.
#[derive(Debug, Default)]
pub(crate) struct ChannelStatus {
    pub state: ConnectionState,
    pub last_message: Option<Envelope>,
    /// Consecutive failed or lost connections since the last successful open.
    pub reconnect_attempts: u32,
    /// Successful transport establishments so far.
    pub connections: u64,
    pub last_connected: Option<Instant>,
}

impl ChannelStatus {
    pub fn mark_connected(&mut self) {
        self.connections += 1;
        self.last_connected = Some(Instant::now());
    }
}
