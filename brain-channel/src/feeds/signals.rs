//! Trading signal and risk alert feed.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use super::window::RollingWindow;
use crate::client::ChannelCallback;
use crate::envelope::Envelope;

/// Signals kept in the feed.
pub const SIGNAL_FEED_CAPACITY: usize = 10;

/// Risk alerts kept in the feed.
pub const RISK_ALERT_CAPACITY: usize = 5;

/// Recent signals and alerts.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalSnapshot {
    /// Recent `trading_signal` payloads, newest first.
    pub signals: RollingWindow<Value>,
    /// Recent `risk_alert` payloads, newest first.
    pub alerts: RollingWindow<Value>,
}

impl Default for SignalSnapshot {
    fn default() -> Self {
        Self {
            signals: RollingWindow::new(SIGNAL_FEED_CAPACITY),
            alerts: RollingWindow::new(RISK_ALERT_CAPACITY),
        }
    }
}

/// Keeps the most recent trading signals and risk alerts.
#[derive(Debug, Default)]
pub struct SignalFeed {
    snapshot: RwLock<SignalSnapshot>,
}

impl SignalFeed {
    /// Creates an empty feed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Recent signals, newest first.
    #[must_use]
    pub fn signals(&self) -> Vec<Value> {
        self.snapshot.read().signals.to_vec()
    }

    /// Recent risk alerts, newest first.
    #[must_use]
    pub fn alerts(&self) -> Vec<Value> {
        self.snapshot.read().alerts.to_vec()
    }

    /// Copy of the whole state.
    #[must_use]
    pub fn snapshot(&self) -> SignalSnapshot {
        self.snapshot.read().clone()
    }

    /// Routes one envelope into its slot. Unknown types are ignored.
    pub fn apply(&self, envelope: Envelope) {
        let mut snapshot = self.snapshot.write();
        match envelope.kind.as_str() {
            "trading_signal" => snapshot.signals.push(envelope.data),
            "risk_alert" => snapshot.alerts.push(envelope.data),
            other => debug!(kind = %other, "Ignoring signal message"),
        }
    }
}

#[async_trait]
impl ChannelCallback for SignalFeed {
    async fn on_message(&self, envelope: Envelope) {
        self.apply(envelope);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bounds() {
        let feed = SignalFeed::new();
        for n in 0..12 {
            feed.apply(Envelope::new("trading_signal", json!({ "n": n })));
            feed.apply(Envelope::new("risk_alert", json!({ "n": n })));
        }

        assert_eq!(feed.signals().len(), SIGNAL_FEED_CAPACITY);
        assert_eq!(feed.alerts().len(), RISK_ALERT_CAPACITY);
        assert_eq!(feed.signals()[0], json!({"n": 11}));
        assert_eq!(feed.alerts()[4], json!({"n": 7}));
    }

    #[test]
    fn test_other_types_ignored() {
        let feed = SignalFeed::new();
        feed.apply(Envelope::new("ticker", json!({"price": 3})));
        assert_eq!(feed.snapshot(), SignalSnapshot::default());
    }
}
