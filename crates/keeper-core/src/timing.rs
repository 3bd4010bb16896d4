//! Timing constants for the session monitor.
//!
//! Every delay the monitor uses is a named constant here and can be overridden
//! per monitor through [`MonitorTimings`] (the binary exposes each one as a
//! CLI flag).

use std::time::Duration;

use crate::error::{KeeperError, Result};

// ── Defaults ──────────────────────────────────────────────────────────────────

/// Pause after arming before the first validation, so the host can finish
/// storing a fresh token.
pub const SETTLE_DELAY: Duration = Duration::from_millis(3_000);

/// Period of the repeating session validation.
pub const SESSION_CHECK_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Period of the repeating session refresh.
pub const SESSION_REFRESH_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// Quiet window after the last activity event before an activity refresh fires.
pub const ACTIVITY_THROTTLE: Duration = Duration::from_secs(60);

/// Delay between the host returning to the foreground and the validation it
/// triggers.
pub const VISIBILITY_DEBOUNCE: Duration = Duration::from_millis(500);

// ── MonitorTimings ────────────────────────────────────────────────────────────

/// The full set of delays a single monitor runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorTimings {
    pub settle_delay: Duration,
    pub check_interval: Duration,
    pub refresh_interval: Duration,
    pub activity_throttle: Duration,
    pub visibility_debounce: Duration,
}

impl Default for MonitorTimings {
    fn default() -> Self {
        Self {
            settle_delay: SETTLE_DELAY,
            check_interval: SESSION_CHECK_INTERVAL,
            refresh_interval: SESSION_REFRESH_INTERVAL,
            activity_throttle: ACTIVITY_THROTTLE,
            visibility_debounce: VISIBILITY_DEBOUNCE,
        }
    }
}

impl MonitorTimings {
    /// Reject configurations the monitor cannot run with.
    ///
    /// Both repeating periods must be non-zero (`tokio::time::interval`
    /// panics on a zero period). The one-shot delays may be zero.
    pub fn validate(&self) -> Result<()> {
        if self.check_interval.is_zero() {
            return Err(KeeperError::Config(
                "session check interval must be non-zero".to_string(),
            ));
        }
        if self.refresh_interval.is_zero() {
            return Err(KeeperError::Config(
                "session refresh interval must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
