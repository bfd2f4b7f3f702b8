//! Connection lifecycle state machine.
//!
//! [`ChannelMachine`] performs no I/O. The driver feeds it [`Event`]s and
//! executes the returned [`Action`]s in order; results of those actions
//! (a transport opened, a close completed, a timer fired) come back as new
//! events.

use brain_core::error::NetworkError;
use std::time::Duration;

use crate::envelope::Envelope;
use crate::state::ConnectionState;

/// Something that happened to the channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The client was spawned.
    Start,
    /// The transport handshake completed.
    Opened,
    /// The transport could not be established.
    OpenFailed(NetworkError),
    /// A parsed inbound frame.
    Frame(Envelope),
    /// A transport error that does not by itself close the connection.
    TransportError(NetworkError),
    /// The transport closed, or a requested close completed.
    Closed,
    /// The reconnect timer fired.
    RetryElapsed,
    /// Explicit disconnect requested by the consumer.
    Disconnect,
    /// Explicit reconnect requested by the consumer.
    Reconnect,
}

/// Something the driver must do.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Start opening a new transport.
    OpenTransport,
    /// Close the current transport, or abandon one being opened.
    CloseTransport,
    /// Arm the reconnect timer.
    ArmRetry(Duration),
    /// Cancel a pending reconnect timer.
    CancelRetry,
    /// Notify `on_connect`.
    EmitConnected,
    /// Notify `on_disconnect`.
    EmitDisconnected,
    /// Notify `on_message`.
    EmitMessage(Envelope),
    /// Notify `on_error`.
    EmitError(NetworkError),
}

/// Reconnection delay policy.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Whether unexpected closes are followed by a retry.
    pub enabled: bool,
    /// Delay before the first retry.
    pub interval: Duration,
    /// Growth factor per consecutive attempt; 1.0 keeps the delay fixed.
    pub multiplier: f64,
    /// Cap for grown delays. Never lowers the base interval.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: Duration::from_millis(3_000),
            multiplier: 1.0,
            max_delay: Duration::from_millis(30_000),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-based).
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss
    )]
    pub fn delay(&self, attempt: u32) -> Duration {
        if self.multiplier <= 1.0 {
            return self.interval;
        }

        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let grown = self.interval.as_millis() as f64 * self.multiplier.powi(exponent);
        let cap = self.max_delay.max(self.interval).as_millis() as f64;
        Duration::from_millis(grown.min(cap) as u64)
    }
}

/// Pure connection lifecycle.
///
/// # Example
///
/// ```
/// use brain_channel::{Action, ChannelMachine, ConnectionState, Event, RetryPolicy};
///
/// let mut machine = ChannelMachine::new(RetryPolicy::default());
/// assert_eq!(machine.handle(Event::Start), vec![Action::OpenTransport]);
/// assert_eq!(machine.handle(Event::Opened), vec![Action::EmitConnected]);
/// assert_eq!(machine.state(), ConnectionState::Connected);
/// ```
#[derive(Debug, Clone)]
pub struct ChannelMachine {
    state: ConnectionState,
    policy: RetryPolicy,
    attempts: u32,
    retry_armed: bool,
    reopen_after_close: bool,
}

impl ChannelMachine {
    /// Creates a machine in the `Disconnected` state.
    #[must_use]
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            policy,
            attempts: 0,
            retry_armed: false,
            reopen_after_close: false,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Retries scheduled since the last successful open.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Returns true while a reconnect timer is armed.
    #[must_use]
    pub fn retry_pending(&self) -> bool {
        self.retry_armed
    }

    /// Applies an event and returns the actions to perform, in order.
    pub fn handle(&mut self, event: Event) -> Vec<Action> {
        use ConnectionState as S;

        match (self.state, event) {
            (S::Disconnected, Event::Start) => self.open(),

            (S::Connecting, Event::Opened) => {
                self.state = S::Connected;
                self.attempts = 0;
                vec![Action::EmitConnected]
            }
            // A close was requested while the handshake was finishing.
            (S::Closed, Event::Opened) => vec![Action::CloseTransport],

            (S::Connecting, Event::OpenFailed(error)) => {
                let mut actions = vec![Action::EmitError(error)];
                actions.extend(self.schedule_retry());
                actions
            }

            (S::Connected, Event::Frame(envelope)) => vec![Action::EmitMessage(envelope)],

            (S::Connected | S::Closing, Event::TransportError(error)) => {
                vec![Action::EmitError(error)]
            }

            (S::Connected, Event::Closed) => {
                let mut actions = vec![Action::EmitDisconnected];
                actions.extend(self.schedule_retry());
                actions
            }
            (S::Closing, Event::Closed) => {
                if self.reopen_after_close {
                    self.reopen_after_close = false;
                    self.attempts = 0;
                    self.open()
                } else {
                    self.state = S::Closed;
                    Vec::new()
                }
            }

            (S::Reconnecting, Event::RetryElapsed) if self.retry_armed => {
                self.retry_armed = false;
                self.open()
            }

            (state, Event::Disconnect) => self.disconnect(state),
            (state, Event::Reconnect) => self.reconnect(state),

            // Everything else is stale: a frame after close, a timer that
            // lost a race with cancellation, a second start.
            _ => Vec::new(),
        }
    }

    fn open(&mut self) -> Vec<Action> {
        self.state = ConnectionState::Connecting;
        vec![Action::OpenTransport]
    }

    fn schedule_retry(&mut self) -> Vec<Action> {
        if !self.policy.enabled {
            self.state = ConnectionState::Disconnected;
            return Vec::new();
        }

        let delay = self.policy.delay(self.attempts);
        self.attempts = self.attempts.saturating_add(1);
        self.retry_armed = true;
        self.state = ConnectionState::Reconnecting;
        vec![Action::ArmRetry(delay)]
    }

    fn disconnect(&mut self, state: ConnectionState) -> Vec<Action> {
        use ConnectionState as S;

        match state {
            S::Closed => Vec::new(),
            S::Closing => {
                self.reopen_after_close = false;
                Vec::new()
            }
            S::Connected => {
                self.state = S::Closing;
                vec![Action::CloseTransport, Action::EmitDisconnected]
            }
            S::Connecting => {
                self.state = S::Closed;
                vec![Action::CloseTransport]
            }
            S::Reconnecting => {
                self.retry_armed = false;
                self.state = S::Closed;
                vec![Action::CancelRetry]
            }
            S::Disconnected => {
                self.state = S::Closed;
                Vec::new()
            }
        }
    }

    fn reconnect(&mut self, state: ConnectionState) -> Vec<Action> {
        use ConnectionState as S;

        match state {
            S::Connecting => Vec::new(),
            S::Closing => {
                self.reopen_after_close = true;
                Vec::new()
            }
            S::Connected => {
                self.state = S::Closing;
                self.reopen_after_close = true;
                vec![Action::CloseTransport, Action::EmitDisconnected]
            }
            S::Reconnecting => {
                self.retry_armed = false;
                self.attempts = 0;
                let mut actions = vec![Action::CancelRetry];
                actions.extend(self.open());
                actions
            }
            S::Disconnected | S::Closed => {
                self.attempts = 0;
                self.open()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn policy(interval_ms: u64) -> RetryPolicy {
        RetryPolicy {
            interval: Duration::from_millis(interval_ms),
            ..RetryPolicy::default()
        }
    }

    fn connected(policy: RetryPolicy) -> ChannelMachine {
        let mut machine = ChannelMachine::new(policy);
        machine.handle(Event::Start);
        machine.handle(Event::Opened);
        machine
    }

    fn refused() -> NetworkError {
        NetworkError::ConnectionFailed {
            reason: "connection refused".to_string(),
        }
    }

    #[test]
    fn test_start_and_open() {
        let mut machine = ChannelMachine::new(policy(3_000));
        assert_eq!(machine.state(), ConnectionState::Disconnected);

        assert_eq!(machine.handle(Event::Start), vec![Action::OpenTransport]);
        assert_eq!(machine.state(), ConnectionState::Connecting);

        assert_eq!(machine.handle(Event::Opened), vec![Action::EmitConnected]);
        assert_eq!(machine.state(), ConnectionState::Connected);

        assert!(machine.handle(Event::Start).is_empty());
    }

    #[test]
    fn test_every_close_arms_exactly_one_retry() {
        let mut machine = connected(policy(3_000));

        for _ in 0..5 {
            assert_eq!(
                machine.handle(Event::Closed),
                vec![
                    Action::EmitDisconnected,
                    Action::ArmRetry(Duration::from_millis(3_000))
                ]
            );
            assert_eq!(machine.state(), ConnectionState::Reconnecting);
            assert!(machine.retry_pending());

            assert_eq!(machine.handle(Event::RetryElapsed), vec![Action::OpenTransport]);
            assert!(machine.handle(Event::RetryElapsed).is_empty());
            assert_eq!(machine.handle(Event::Opened), vec![Action::EmitConnected]);
        }
    }

    #[test]
    fn test_open_failure_retries_without_disconnect_event() {
        let mut machine = ChannelMachine::new(policy(1_000));
        machine.handle(Event::Start);

        let actions = machine.handle(Event::OpenFailed(refused()));
        assert_eq!(
            actions,
            vec![
                Action::EmitError(refused()),
                Action::ArmRetry(Duration::from_millis(1_000))
            ]
        );
        assert!(!actions.contains(&Action::EmitDisconnected));
        assert_eq!(machine.attempts(), 1);
    }

    #[test]
    fn test_reconnect_disabled_stays_disconnected() {
        let mut machine = connected(RetryPolicy {
            enabled: false,
            ..RetryPolicy::default()
        });

        assert_eq!(machine.handle(Event::Closed), vec![Action::EmitDisconnected]);
        assert_eq!(machine.state(), ConnectionState::Disconnected);
        assert!(!machine.retry_pending());
    }

    #[test]
    fn test_disconnect_cancels_pending_retry() {
        let mut machine = connected(policy(3_000));
        machine.handle(Event::Closed);

        assert_eq!(machine.handle(Event::Disconnect), vec![Action::CancelRetry]);
        assert_eq!(machine.state(), ConnectionState::Closed);
        assert!(machine.handle(Event::RetryElapsed).is_empty());
        assert_eq!(machine.state(), ConnectionState::Closed);
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        let mut machine = connected(policy(3_000));

        assert_eq!(
            machine.handle(Event::Disconnect),
            vec![Action::CloseTransport, Action::EmitDisconnected]
        );
        assert_eq!(machine.state(), ConnectionState::Closing);
        assert!(machine.handle(Event::Disconnect).is_empty());

        assert!(machine.handle(Event::Closed).is_empty());
        assert_eq!(machine.state(), ConnectionState::Closed);
        assert!(machine.handle(Event::Disconnect).is_empty());
        assert!(machine.handle(Event::Closed).is_empty());
    }

    #[test]
    fn test_disconnect_while_connecting_abandons_open() {
        let mut machine = ChannelMachine::new(policy(3_000));
        machine.handle(Event::Start);

        assert_eq!(machine.handle(Event::Disconnect), vec![Action::CloseTransport]);
        assert_eq!(machine.handle(Event::Opened), vec![Action::CloseTransport]);
        assert!(machine.handle(Event::OpenFailed(refused())).is_empty());
        assert_eq!(machine.state(), ConnectionState::Closed);
    }

    #[test]
    fn test_reconnect_while_connected_reopens_after_close() {
        let mut machine = connected(policy(3_000));

        assert_eq!(
            machine.handle(Event::Reconnect),
            vec![Action::CloseTransport, Action::EmitDisconnected]
        );
        assert_eq!(machine.state(), ConnectionState::Closing);
        assert_eq!(machine.handle(Event::Closed), vec![Action::OpenTransport]);
        assert_eq!(machine.state(), ConnectionState::Connecting);
    }

    #[test]
    fn test_reconnect_skips_pending_delay() {
        let mut machine = connected(policy(3_000));
        machine.handle(Event::Closed);

        assert_eq!(
            machine.handle(Event::Reconnect),
            vec![Action::CancelRetry, Action::OpenTransport]
        );
        assert!(!machine.retry_pending());
        assert!(machine.handle(Event::RetryElapsed).is_empty());
    }

    #[test]
    fn test_reconnect_revives_closed_channel() {
        let mut machine = connected(policy(3_000));
        machine.handle(Event::Disconnect);
        machine.handle(Event::Closed);

        assert_eq!(machine.handle(Event::Reconnect), vec![Action::OpenTransport]);
        assert_eq!(machine.state(), ConnectionState::Connecting);
    }

    #[test]
    fn test_disconnect_during_reconnect_close_wins() {
        let mut machine = connected(policy(3_000));
        machine.handle(Event::Reconnect);
        machine.handle(Event::Disconnect);

        assert!(machine.handle(Event::Closed).is_empty());
        assert_eq!(machine.state(), ConnectionState::Closed);
    }

    #[test]
    fn test_frames_only_delivered_while_connected() {
        let envelope = Envelope::new("ticker", json!({"price": 1}));
        let mut machine = ChannelMachine::new(policy(3_000));

        assert!(machine.handle(Event::Frame(envelope.clone())).is_empty());
        machine.handle(Event::Start);
        machine.handle(Event::Opened);
        assert_eq!(
            machine.handle(Event::Frame(envelope.clone())),
            vec![Action::EmitMessage(envelope)]
        );
    }

    #[test]
    fn test_transport_error_does_not_change_state() {
        let mut machine = connected(policy(3_000));
        let error = NetworkError::WebSocket {
            reason: "reset".to_string(),
        };

        assert_eq!(
            machine.handle(Event::TransportError(error.clone())),
            vec![Action::EmitError(error)]
        );
        assert_eq!(machine.state(), ConnectionState::Connected);
    }

    #[test]
    fn test_backoff_policy() {
        let policy = RetryPolicy {
            enabled: true,
            interval: Duration::from_secs(1),
            multiplier: 2.0,
            max_delay: Duration::from_secs(10),
        };

        assert_eq!(policy.delay(0), Duration::from_secs(1));
        assert_eq!(policy.delay(1), Duration::from_secs(2));
        assert_eq!(policy.delay(3), Duration::from_secs(8));
        assert_eq!(policy.delay(4), Duration::from_secs(10));
        assert_eq!(policy.delay(u32::MAX), Duration::from_secs(10));
    }

    #[test]
    fn test_fixed_delay_ignores_cap() {
        let policy = RetryPolicy {
            interval: Duration::from_secs(60),
            max_delay: Duration::from_secs(5),
            ..RetryPolicy::default()
        };
        assert_eq!(policy.delay(7), Duration::from_secs(60));
    }

    #[test]
    fn test_attempts_reset_after_successful_open() {
        let mut machine = ChannelMachine::new(RetryPolicy {
            multiplier: 2.0,
            ..policy(100)
        });
        machine.handle(Event::Start);
        machine.handle(Event::OpenFailed(refused()));
        machine.handle(Event::RetryElapsed);
        let actions = machine.handle(Event::OpenFailed(refused()));
        assert!(actions.contains(&Action::ArmRetry(Duration::from_millis(200))));

        machine.handle(Event::RetryElapsed);
        machine.handle(Event::Opened);
        assert_eq!(machine.attempts(), 0);
        assert_eq!(
            machine.handle(Event::Closed),
            vec![
                Action::EmitDisconnected,
                Action::ArmRetry(Duration::from_millis(100))
            ]
        );
    }
}
