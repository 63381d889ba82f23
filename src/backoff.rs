//! Reconnect backoff.
//!
//! Two transitions: every throttled-connect signal grows the wait by a
//! fixed increment (unbounded — a server that keeps throttling deserves
//! ever-longer pauses), and a fully ready connection resets it to the
//! default. The owning driver sleeps [`ReconnectBackoff::wait`] before the
//! next connect attempt; this type never sleeps itself.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Escalating wait interval between reconnect attempts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconnectBackoff {
    wait: Duration,
    increment: Duration,
    default: Duration,
}

impl ReconnectBackoff {
    /// Create a backoff starting (and resetting) at `default`, growing by
    /// `increment` per throttle signal.
    #[must_use]
    pub fn new(default: Duration, increment: Duration) -> Self {
        Self {
            wait: default,
            increment,
            default,
        }
    }

    /// The current wait interval.
    #[must_use]
    pub fn wait(&self) -> Duration {
        self.wait
    }

    /// The server throttled us; back off further.
    pub fn throttled(&mut self) {
        self.wait += self.increment;
        debug!(wait = ?self.wait, "connect throttled, reconnect delay increased");
    }

    /// The connection reached fully-ready; start over from the default.
    pub fn reset(&mut self) {
        self.wait = self.default;
    }
}

impl Default for ReconnectBackoff {
    /// The original bot's values: 5 seconds, growing by 30 per throttle.
    fn default() -> Self {
        Self::new(Duration::from_secs(5), Duration::from_secs(30))
    }
}
