//! Cancellable reconnect timer.

use std::pin::Pin;
use std::time::Duration;
use tokio::time::{Instant, Sleep, sleep};

/// Single-shot timer owned by the connection driver.
///
/// At most one deadline is armed at a time. Cancelling drops the deadline,
/// so a cancelled timer can never fire.
#[derive(Debug, Default)]
pub struct ReconnectTimer {
    sleep: Option<Pin<Box<Sleep>>>,
}

impl ReconnectTimer {
    /// Creates an unarmed timer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the timer, replacing any previous deadline.
    pub fn arm(&mut self, delay: Duration) {
        self.sleep = Some(Box::pin(sleep(delay)));
    }

    /// Disarms the timer. Returns true if a deadline was pending.
    pub fn cancel(&mut self) -> bool {
        self.sleep.take().is_some()
    }

    /// Returns true while a deadline is pending.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.sleep.is_some()
    }

    /// Pending deadline, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.sleep.as_ref().map(|s| s.deadline())
    }

    /// Completes when the armed deadline passes and disarms the timer.
    ///
    /// Never completes while unarmed, which makes it usable as a
    /// `tokio::select!` branch.
    pub async fn elapsed(&mut self) {
        match self.sleep.as_mut() {
            Some(sleep) => {
                sleep.as_mut().await;
                self.sleep = None;
            }
            None => std::future::pending::<()>().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_delay() {
        let mut timer = ReconnectTimer::new();
        let start = Instant::now();
        timer.arm(Duration::from_millis(3_000));
        assert!(timer.is_armed());

        timer.elapsed().await;

        assert!(start.elapsed() >= Duration::from_millis(3_000));
        assert!(!timer.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_timer_never_fires() {
        let mut timer = ReconnectTimer::new();
        timer.arm(Duration::from_millis(100));
        assert!(timer.cancel());
        assert!(!timer.cancel());

        let fired = tokio::time::timeout(Duration::from_secs(60), timer.elapsed()).await;
        assert!(fired.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_replaces_deadline() {
        let mut timer = ReconnectTimer::new();
        timer.arm(Duration::from_secs(10));
        let first = timer.deadline().unwrap();
        timer.arm(Duration::from_secs(1));
        assert!(timer.deadline().unwrap() < first);

        let start = Instant::now();
        timer.elapsed().await;
        assert!(start.elapsed() < Duration::from_secs(10));
    }
}
