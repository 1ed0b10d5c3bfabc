//! Bounded polling with exponential backoff.
//!
//! A freshly created remote repository is not always visible right away.
//! Instead of sleeping a fixed amount of time before talking to it, callers
//! poll a predicate: attempt `n` (1-based) is followed by a delay of
//! `interval * 2^(n-1)` when it fails, and no delay follows the last attempt.

use std::thread;
use std::time::Duration;

use log::{debug, warn};

use crate::settings::PollSettings;

/// Delay after failed attempt `attempt` (1-based).
pub fn backoff_delay(interval: Duration, attempt: u32) -> Duration {
    let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
    interval.saturating_mul(factor)
}

/// Call `ready` until it returns `true` or the attempt budget is spent.
///
/// Returns the number of attempts used on success, `None` on exhaustion.
pub fn poll_until<F>(settings: PollSettings, what: &str, mut ready: F) -> Option<u32>
where
    F: FnMut() -> bool,
{
    let attempts = settings.attempts.max(1);
    for attempt in 1..=attempts {
        if ready() {
            debug!("{} ready after {} attempt(s)", what, attempt);
            return Some(attempt);
        }
        if attempt < attempts {
            let delay = backoff_delay(settings.interval, attempt);
            debug!(
                "{} not ready (attempt {}/{}), retrying in {:?}",
                what, attempt, attempts, delay
            );
            thread::sleep(delay);
        }
    }
    warn!("{} still not ready after {} attempts", what, attempts);
    None
}
