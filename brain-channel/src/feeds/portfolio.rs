//! Portfolio feed.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use super::window::RollingWindow;
use crate::client::ChannelCallback;
use crate::envelope::Envelope;

/// Trade executions kept in the log.
pub const EXECUTION_LOG_CAPACITY: usize = 20;

/// Latest portfolio state.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioSnapshot {
    /// Latest `portfolio_update` payload.
    pub portfolio: Option<Value>,
    /// Latest `position_update` payload.
    pub positions: Option<Value>,
    /// Recent `trade_executed` payloads, newest first.
    pub executions: RollingWindow<Value>,
}

impl Default for PortfolioSnapshot {
    fn default() -> Self {
        Self {
            portfolio: None,
            positions: None,
            executions: RollingWindow::new(EXECUTION_LOG_CAPACITY),
        }
    }
}

/// Keeps the portfolio snapshot, position list and execution log.
#[derive(Debug, Default)]
pub struct PortfolioFeed {
    snapshot: RwLock<PortfolioSnapshot>,
}

impl PortfolioFeed {
    /// Creates an empty feed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest portfolio snapshot.
    #[must_use]
    pub fn portfolio(&self) -> Option<Value> {
        self.snapshot.read().portfolio.clone()
    }

    /// Latest position list.
    #[must_use]
    pub fn positions(&self) -> Option<Value> {
        self.snapshot.read().positions.clone()
    }

    /// Recent executions, newest first.
    #[must_use]
    pub fn executions(&self) -> Vec<Value> {
        self.snapshot.read().executions.to_vec()
    }

    /// Copy of the whole state.
    #[must_use]
    pub fn snapshot(&self) -> PortfolioSnapshot {
        self.snapshot.read().clone()
    }

    /// Routes one envelope into its slot. Unknown types are ignored.
    pub fn apply(&self, envelope: Envelope) {
        let mut snapshot = self.snapshot.write();
        match envelope.kind.as_str() {
            "portfolio_update" => snapshot.portfolio = Some(envelope.data),
            "position_update" => snapshot.positions = Some(envelope.data),
            "trade_executed" => snapshot.executions.push(envelope.data),
            other => debug!(kind = %other, "Ignoring portfolio message"),
        }
    }
}

#[async_trait]
impl ChannelCallback for PortfolioFeed {
    async fn on_message(&self, envelope: Envelope) {
        self.apply(envelope);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_routing() {
        let feed = PortfolioFeed::new();
        feed.apply(Envelope::new("portfolio_update", json!({"equity": 1000})));
        feed.apply(Envelope::new("position_update", json!([{"symbol": "BTC-USD"}])));
        feed.apply(Envelope::new("position_update", json!([])));

        assert_eq!(feed.portfolio(), Some(json!({"equity": 1000})));
        assert_eq!(feed.positions(), Some(json!([])));
        assert!(feed.executions().is_empty());
    }

    #[test]
    fn test_execution_log_bounded() {
        let feed = PortfolioFeed::new();
        for n in 0..30 {
            feed.apply(Envelope::new("trade_executed", json!({ "n": n })));
        }

        let executions = feed.executions();
        assert_eq!(executions.len(), EXECUTION_LOG_CAPACITY);
        assert_eq!(executions.first(), Some(&json!({"n": 29})));
        assert_eq!(executions.last(), Some(&json!({"n": 10})));
    }
}
