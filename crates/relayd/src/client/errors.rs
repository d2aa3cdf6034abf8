use std::io;

use thiserror::Error;

use super::ClientState;
use crate::router::RouteError;

/// Errors raised by [`SocketClient`](super::SocketClient).
#[derive(Debug, Error)]
pub enum ClientError {
    /// Host name resolution failed.
    #[error("cannot resolve {endpoint}: {source}")]
    Resolve {
        /// Endpoint as `host:port`.
        endpoint: String,
        /// Resolver error.
        #[source]
        source: io::Error,
    },
    /// Resolution produced no address.
    #[error("{endpoint} resolved to nothing")]
    ResolveEmpty {
        /// Endpoint as `host:port`.
        endpoint: String,
    },
    /// The stream socket could not be allocated.
    #[error("cannot allocate socket: {source}")]
    Allocate {
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// Connecting to the peer failed.
    #[error("cannot connect to {endpoint}: {source}")]
    Connect {
        /// Endpoint as `host:port`.
        endpoint: String,
        /// Connect error.
        #[source]
        source: io::Error,
    },
    /// Socket options could not be applied after connecting.
    #[error("cannot configure connected socket: {source}")]
    Configure {
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// `run` was called on a client that already ran or was closed.
    #[error("client cannot run from state {state}")]
    NotRunnable {
        /// State the client was in.
        state: ClientState,
    },
    /// A received line could not be routed; the connection was closed.
    #[error("routing failed: {source}")]
    Route {
        /// Routing failure.
        #[source]
        source: RouteError,
    },
}
