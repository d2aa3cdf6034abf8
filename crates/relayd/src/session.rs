//! Per-connection state handed to command callbacks.

use std::collections::VecDeque;

/// Connection handle seen by command callbacks.
///
/// Callbacks queue reply lines and may ask the transport to close the
/// connection once the current line has been handled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    peer: String,
    replies: VecDeque<String>,
    close_requested: bool,
}

impl Session {
    /// Creates a session for the named peer.
    #[must_use]
    pub fn new(peer: impl Into<String>) -> Self {
        Self {
            peer: peer.into(),
            replies: VecDeque::new(),
            close_requested: false,
        }
    }

    /// Description of the remote end, used in logs.
    #[must_use]
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Queues a reply line.
    pub fn reply(&mut self, line: impl Into<String>) {
        self.replies.push_back(line.into());
    }

    /// Removes and returns queued replies in the order they were queued.
    pub fn drain_replies(&mut self) -> Vec<String> {
        self.replies.drain(..).collect()
    }

    /// Number of queued replies.
    #[must_use]
    pub fn pending_replies(&self) -> usize {
        self.replies.len()
    }

    /// Asks the transport to close the connection.
    pub const fn request_close(&mut self) {
        self.close_requested = true;
    }

    /// Whether a callback asked for the connection to close.
    #[must_use]
    pub const fn close_requested(&self) -> bool {
        self.close_requested
    }
}
