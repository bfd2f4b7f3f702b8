//! Market data feed.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::window::RollingWindow;
use crate::client::{ChannelCallback, ChannelSender};
use crate::envelope::Envelope;

/// Trades kept on the tape.
pub const TRADE_TAPE_CAPACITY: usize = 50;

/// Latest market state for one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketSnapshot {
    /// Latest `ticker` payload.
    pub ticker: Option<Value>,
    /// Latest `orderbook` payload.
    pub order_book: Option<Value>,
    /// Recent `trade` payloads, newest first.
    pub trades: RollingWindow<Value>,
}

impl Default for MarketSnapshot {
    fn default() -> Self {
        Self {
            ticker: None,
            order_book: None,
            trades: RollingWindow::new(TRADE_TAPE_CAPACITY),
        }
    }
}

/// Subscribes to one symbol and keeps ticker, order book and trade tape.
///
/// A `{"action":"subscribe","symbol":...}` frame is sent on every
/// connection and whenever the symbol changes while connected.
#[derive(Debug)]
pub struct MarketDataFeed {
    symbol: RwLock<String>,
    sender: RwLock<Option<ChannelSender>>,
    snapshot: RwLock<MarketSnapshot>,
}

impl MarketDataFeed {
    /// Creates a feed for `symbol`.
    #[must_use]
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: RwLock::new(symbol.into()),
            sender: RwLock::new(None),
            snapshot: RwLock::new(MarketSnapshot::default()),
        }
    }

    /// Subscribed symbol.
    #[must_use]
    pub fn symbol(&self) -> String {
        self.symbol.read().clone()
    }

    /// Switches to another symbol.
    ///
    /// Returns true if a subscribe frame was sent right away; otherwise the
    /// new symbol is used on the next connection.
    pub fn set_symbol(&self, symbol: impl Into<String>) -> bool {
        let symbol = symbol.into();
        {
            let mut current = self.symbol.write();
            if *current == symbol {
                return false;
            }
            current.clone_from(&symbol);
        }

        let sender = self.sender.read().clone();
        match sender {
            Some(sender) if sender.is_connected() => Self::subscribe(&sender, &symbol),
            _ => false,
        }
    }

    /// Latest ticker.
    #[must_use]
    pub fn ticker(&self) -> Option<Value> {
        self.snapshot.read().ticker.clone()
    }

    /// Latest order book.
    #[must_use]
    pub fn order_book(&self) -> Option<Value> {
        self.snapshot.read().order_book.clone()
    }

    /// Recent trades, newest first.
    #[must_use]
    pub fn trades(&self) -> Vec<Value> {
        self.snapshot.read().trades.to_vec()
    }

    /// Copy of the whole state.
    #[must_use]
    pub fn snapshot(&self) -> MarketSnapshot {
        self.snapshot.read().clone()
    }

    /// Routes one envelope into its slot. Unknown types are ignored.
    pub fn apply(&self, envelope: Envelope) {
        let mut snapshot = self.snapshot.write();
        match envelope.kind.as_str() {
            "ticker" => snapshot.ticker = Some(envelope.data),
            "orderbook" => snapshot.order_book = Some(envelope.data),
            "trade" => snapshot.trades.push(envelope.data),
            other => debug!(kind = %other, "Ignoring market message"),
        }
    }

    fn subscribe(sender: &ChannelSender, symbol: &str) -> bool {
        let frame = json!({ "action": "subscribe", "symbol": symbol });
        match sender.send_json(&frame) {
            Ok(()) => {
                debug!(symbol = %symbol, "Subscribe sent");
                true
            }
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "Failed to send subscribe");
                false
            }
        }
    }
}

#[async_trait]
impl ChannelCallback for MarketDataFeed {
    async fn on_message(&self, envelope: Envelope) {
        self.apply(envelope);
    }

    async fn on_connect(&self, sender: &ChannelSender) {
        *self.sender.write() = Some(sender.clone());
        let symbol = self.symbol();
        Self::subscribe(sender, &symbol);
    }
}
