//! Channel watcher behind `brain-server watch`.
//!
//! Attaches one of the typed feeds to a live channel, logs connectivity and
//! inbound envelopes, and periodically logs a summary of the feed state.

use async_trait::async_trait;
use brain_channel::feeds::{MarketDataFeed, PortfolioFeed, SignalFeed};
use brain_channel::{ChannelCallback, ChannelClient, ChannelHandle, ChannelSender, Envelope};
use brain_core::error::NetworkError;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::ChannelDefaults;
use crate::shutdown::ShutdownController;

/// Feed to attach to the watched channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum FeedKind {
    /// Ticker, order book and trade tape for one symbol
    Market,
    /// Portfolio, positions and executions
    Portfolio,
    /// Trading signals and risk alerts
    Signals,
}

impl FeedKind {
    /// Channel the feed is usually served on.
    #[must_use]
    pub const fn default_channel(self) -> &'static str {
        match self {
            Self::Market => "market-data",
            Self::Portfolio => "portfolio",
            Self::Signals => "signals",
        }
    }
}

/// Logs channel events and hands them on to the wrapped callback.
pub struct LoggingCallback {
    inner: Arc<dyn ChannelCallback>,
    received: AtomicU64,
}

impl LoggingCallback {
    /// Wraps `inner`.
    #[must_use]
    pub fn new(inner: Arc<dyn ChannelCallback>) -> Self {
        Self {
            inner,
            received: AtomicU64::new(0),
        }
    }

    /// Number of envelopes received so far.
    #[must_use]
    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ChannelCallback for LoggingCallback {
    async fn on_message(&self, envelope: Envelope) {
        let count = self.received.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(kind = %envelope.kind, count, "Envelope received");
        self.inner.on_message(envelope).await;
    }

    async fn on_connect(&self, sender: &ChannelSender) {
        info!(channel = %sender.channel(), "Channel connected");
        self.inner.on_connect(sender).await;
    }

    async fn on_disconnect(&self) {
        warn!("Channel disconnected");
        self.inner.on_disconnect().await;
    }

    async fn on_error(&self, error: NetworkError) {
        warn!(error = %error, "Channel error");
        self.inner.on_error(error).await;
    }
}

type Summary = Box<dyn Fn() -> Value + Send + Sync>;

/// A running channel client with a typed feed attached.
pub struct Watcher {
    handle: ChannelHandle,
    callback: Arc<LoggingCallback>,
    summary: Summary,
}

impl Watcher {
    /// Spawns a client for `kind` on `channel` (or the feed's usual channel).
    ///
    /// `symbol` is only used by the market feed.
    pub fn spawn(
        defaults: &ChannelDefaults,
        kind: FeedKind,
        channel: Option<&str>,
        symbol: &str,
    ) -> anyhow::Result<Self> {
        let (feed, summary): (Arc<dyn ChannelCallback>, Summary) = match kind {
            FeedKind::Market => {
                let feed = Arc::new(MarketDataFeed::new(symbol));
                let view = Arc::clone(&feed);
                let summary: Summary = Box::new(move || {
                    let snapshot = view.snapshot();
                    json!({
                        "symbol": view.symbol(),
                        "ticker": snapshot.ticker,
                        "has_order_book": snapshot.order_book.is_some(),
                        "trades": snapshot.trades.len(),
                    })
                });
                (feed as Arc<dyn ChannelCallback>, summary)
            }
            FeedKind::Portfolio => {
                let feed = Arc::new(PortfolioFeed::new());
                let view = Arc::clone(&feed);
                let summary: Summary = Box::new(move || {
                    let snapshot = view.snapshot();
                    json!({
                        "has_portfolio": snapshot.portfolio.is_some(),
                        "has_positions": snapshot.positions.is_some(),
                        "executions": snapshot.executions.len(),
                    })
                });
                (feed as Arc<dyn ChannelCallback>, summary)
            }
            FeedKind::Signals => {
                let feed = Arc::new(SignalFeed::new());
                let view = Arc::clone(&feed);
                let summary: Summary = Box::new(move || {
                    let snapshot = view.snapshot();
                    json!({
                        "signals": snapshot.signals.len(),
                        "alerts": snapshot.alerts.len(),
                        "latest_signal": snapshot.signals.latest(),
                    })
                });
                (feed as Arc<dyn ChannelCallback>, summary)
            }
        };

        let config = defaults.for_channel(channel.unwrap_or(kind.default_channel()));
        let callback = Arc::new(LoggingCallback::new(feed));
        let handle = ChannelClient::new(config)
            .with_callback(callback.clone())
            .spawn()?;

        Ok(Self {
            handle,
            callback,
            summary,
        })
    }

    /// Handle of the underlying channel client.
    #[must_use]
    pub fn handle(&self) -> &ChannelHandle {
        &self.handle
    }

    /// Current feed state as JSON.
    #[must_use]
    pub fn summary(&self) -> Value {
        (self.summary)()
    }

    /// Logs a summary every `report_every` until shutdown, then disconnects.
    pub async fn run(self, shutdown: ShutdownController, report_every: Duration) {
        let mut ticker = tokio::time::interval(report_every);
        ticker.tick().await;

        loop {
            tokio::select! {
                () = shutdown.wait_for_shutdown() => break,
                _ = ticker.tick() => {
                    info!(
                        channel = %self.handle.channel(),
                        state = %self.handle.state(),
                        received = self.callback.received(),
                        reconnects = self.handle.reconnect_attempts(),
                        summary = %self.summary(),
                        "Feed summary"
                    );
                }
            }
        }

        self.handle.disconnect();
        info!(channel = %self.handle.channel(), "Watcher stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brain_channel::NoopCallback;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Seen {
        kinds: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ChannelCallback for Seen {
        async fn on_message(&self, envelope: Envelope) {
            self.kinds.lock().push(envelope.kind);
        }
    }

    #[test]
    fn test_default_channels() {
        assert_eq!(FeedKind::Market.default_channel(), "market-data");
        assert_eq!(FeedKind::Portfolio.default_channel(), "portfolio");
        assert_eq!(FeedKind::Signals.default_channel(), "signals");
    }

    #[tokio::test]
    async fn test_logging_callback_counts_and_delegates() {
        let seen = Arc::new(Seen::default());
        let callback = LoggingCallback::new(seen.clone());

        callback
            .on_message(Envelope::new("ticker", json!({"price": 1.0})))
            .await;
        callback
            .on_message(Envelope::new("trade", json!({"qty": 2})))
            .await;
        callback.on_disconnect().await;

        assert_eq!(callback.received(), 2);
        assert_eq!(*seen.kinds.lock(), vec!["ticker", "trade"]);
    }

    #[tokio::test]
    async fn test_logging_callback_over_noop() {
        let callback = LoggingCallback::new(Arc::new(NoopCallback));
        callback
            .on_error(NetworkError::ConnectionClosed {
                reason: "reset".to_string(),
            })
            .await;
        assert_eq!(callback.received(), 0);
    }

    #[tokio::test]
    async fn test_watcher_rejects_invalid_defaults() {
        let defaults = ChannelDefaults {
            base_url: "http://localhost:8000/ws".to_string(),
            ..Default::default()
        };
        assert!(Watcher::spawn(&defaults, FeedKind::Signals, None, "BTC-USD").is_err());
    }

    #[tokio::test]
    async fn test_watcher_stops_on_shutdown() {
        let defaults = ChannelDefaults {
            // Nothing listens here; the client keeps retrying until stopped.
            base_url: "ws://127.0.0.1:1/ws".to_string(),
            reconnect_interval_ms: 50,
            ..Default::default()
        };
        let watcher = Watcher::spawn(&defaults, FeedKind::Market, None, "ETH-USD").unwrap();
        assert_eq!(watcher.handle().channel(), "market-data");
        assert_eq!(watcher.summary()["symbol"], "ETH-USD");
        assert_eq!(watcher.summary()["trades"], 0);

        let shutdown = ShutdownController::new();
        shutdown.initiate_shutdown();
        tokio::time::timeout(
            Duration::from_secs(1),
            watcher.run(shutdown, Duration::from_millis(20)),
        )
        .await
        .unwrap();
    }
}
