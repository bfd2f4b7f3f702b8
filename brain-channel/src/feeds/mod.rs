//! Channel consumers that demultiplex envelopes into typed slots.
//!
//! Each feed implements [`ChannelCallback`](crate::ChannelCallback) and is
//! shared with the client through an `Arc`; the consumer keeps its own
//! clone and reads snapshots from it.

mod market;
mod portfolio;
mod signals;
mod window;

pub use market::{MarketDataFeed, MarketSnapshot, TRADE_TAPE_CAPACITY};
pub use portfolio::{EXECUTION_LOG_CAPACITY, PortfolioFeed, PortfolioSnapshot};
pub use signals::{RISK_ALERT_CAPACITY, SIGNAL_FEED_CAPACITY, SignalFeed, SignalSnapshot};
pub use window::RollingWindow;
