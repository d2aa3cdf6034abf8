//! Socket listener for the daemon's line transport.
//!
//! The transport binds to the configured endpoint, accepts connections in a
//! background thread and hands each connection to a [`ConnectionHandler`] on
//! its own thread.

mod errors;
mod handler;
mod listener;
#[cfg(test)]
mod test_utils;

pub use self::errors::ListenerError;
pub use self::handler::{ConnectionHandler, ConnectionStream, LineConnectionHandler, SharedRouter};
pub use self::listener::{ListenerHandle, SocketListener};
#[cfg(test)]
pub(crate) use self::test_utils::{CountingHandler, wait_for_count};

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
