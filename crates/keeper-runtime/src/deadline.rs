//! Resettable one-shot timer used for trailing-edge throttling and debouncing.

use std::pin::Pin;
use std::time::Duration;

use tokio::time::{self, Instant, Sleep};

/// A one-shot timer whose fire time moves every time it is reset.
///
/// [`TrailingDeadline::fired`] completes once per arming and stays pending
/// while disarmed. It is cancel-safe, so it can sit in a `tokio::select!`
/// loop next to other branches.
#[derive(Debug, Default)]
pub struct TrailingDeadline {
    sleep: Option<Pin<Box<Sleep>>>,
}

impl TrailingDeadline {
    /// Create a disarmed deadline.
    pub fn new() -> Self {
        Self { sleep: None }
    }

    /// Arm (or re-arm) the deadline to fire `after` from now.
    pub fn reset(&mut self, after: Duration) {
        let at = Instant::now() + after;
        match self.sleep.as_mut() {
            Some(sleep) => sleep.as_mut().reset(at),
            None => self.sleep = Some(Box::pin(time::sleep_until(at))),
        }
    }

    /// Disarm without firing.
    pub fn cancel(&mut self) {
        self.sleep = None;
    }

    /// `true` while a fire is pending.
    pub fn is_armed(&self) -> bool {
        self.sleep.is_some()
    }

    /// Wait for the pending fire, then disarm.
    pub async fn fired(&mut self) {
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

    /// Paused-clock timers land on millisecond ticks.
    fn assert_elapsed(start: Instant, expected: Duration) {
        let elapsed = start.elapsed();
        assert!(
            elapsed >= expected && elapsed < expected + Duration::from_millis(5),
            "elapsed {elapsed:?}, expected {expected:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarmed_never_fires() {
        let mut deadline = TrailingDeadline::new();
        let result = time::timeout(Duration::from_secs(3600), deadline.fired()).await;
        assert!(result.is_err());
        assert!(!deadline.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_delay_then_disarms() {
        let start = Instant::now();
        let mut deadline = TrailingDeadline::new();
        deadline.reset(Duration::from_secs(60));
        assert!(deadline.is_armed());

        deadline.fired().await;

        assert_elapsed(start, Duration::from_secs(60));
        assert!(!deadline.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_pushes_fire_time_out() {
        let start = Instant::now();
        let mut deadline = TrailingDeadline::new();
        deadline.reset(Duration::from_secs(60));

        time::sleep(Duration::from_secs(45)).await;
        deadline.reset(Duration::from_secs(60));

        deadline.fired().await;
        assert_elapsed(start, Duration::from_secs(105));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_disarms() {
        let mut deadline = TrailingDeadline::new();
        deadline.reset(Duration::from_millis(500));
        deadline.cancel();

        let result = time::timeout(Duration::from_secs(10), deadline.fired()).await;
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_cancellation_keeps_deadline() {
        let start = Instant::now();
        let mut deadline = TrailingDeadline::new();
        deadline.reset(Duration::from_secs(10));

        // Losing a select race must not lose the pending fire.
        tokio::select! {
            () = deadline.fired() => panic!("fired too early"),
            () = time::sleep(Duration::from_secs(3)) => {}
        }
        assert!(deadline.is_armed());

        deadline.fired().await;
        assert_elapsed(start, Duration::from_secs(10));
    }
}
