//! Line-oriented command and event relay.
//!
//! The relay listens on a TCP or Unix socket. Every received line is either a
//! command (its first token names an attached command, which replies on the
//! same connection) or an event trigger (the first token names an event group,
//! the second token is the sub-requirement it satisfies). Event groups fire
//! their callbacks through a [`relay_core::Dispatcher`] once every
//! sub-requirement has been met.
//!
//! [`SocketClient`] speaks the same line protocol from the other side: it
//! connects out, routes what the peer sends through the same [`LineRouter`],
//! and sends queued packets back.
//!
//! Bootstrap follows a fixed order: configuration, telemetry, socket
//! preparation, built-in commands, then the optional hook file. Each stage
//! reports to a [`HealthReporter`].

mod bootstrap;
pub mod builtin;
pub mod client;
mod health;
mod launch;
mod lines;
pub mod router;
pub mod session;
mod shutdown;
mod telemetry;
pub mod transport;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Daemon, ServeError, StaticConfigLoader, SystemConfigLoader,
    bootstrap_with,
};
pub use client::{ClientError, ClientExit, ClientState, ShutdownHandle, SocketClient};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use launch::{LaunchError, run_daemon};
pub use router::{CommandFailure, LineRouter, RouteError, RouteOutcome};
pub use session::Session;
pub use shutdown::{ShutdownError, ShutdownSignal, SystemShutdownSignal};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
