//! Tuning values for the socket client polling loop.

use std::time::Duration;

use crate::defaults::{DEFAULT_ERROR_BUDGET, DEFAULT_MAX_LINE_BYTES, DEFAULT_POLL_INTERVAL_MS};

/// Timeout applied when a client connects to its peer.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Limits and timings applied by a socket client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientSettings {
    error_budget: u32,
    poll_interval: Duration,
    max_line_bytes: usize,
    connect_timeout: Duration,
}

impl ClientSettings {
    /// Builds settings with the default connect timeout.
    #[must_use]
    pub const fn new(error_budget: u32, poll_interval: Duration, max_line_bytes: usize) -> Self {
        Self {
            error_budget,
            poll_interval,
            max_line_bytes,
            connect_timeout: CONNECT_TIMEOUT,
        }
    }

    /// Overrides the connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Failures tolerated before the client stops; the client stops once the
    /// error count exceeds this value.
    #[must_use]
    pub const fn error_budget(&self) -> u32 {
        self.error_budget
    }

    /// Read timeout of a single loop pass.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Longest accepted inbound line.
    #[must_use]
    pub const fn max_line_bytes(&self) -> usize {
        self.max_line_bytes
    }

    /// Timeout for establishing the connection.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self::new(
            DEFAULT_ERROR_BUDGET,
            Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            DEFAULT_MAX_LINE_BYTES,
        )
    }
}
