//! Command routing and gated event dispatch for the relay daemon.
//!
//! - [`command`]: named command table, one callback per name.
//! - [`event`]: event groups whose callbacks fire once every registered
//!   sub-requirement has been met.
//! - [`dispatch`]: destination grammar and the registry-backed dispatcher
//!   that invokes event callbacks.

pub mod command;
pub mod dispatch;
pub mod event;

pub use command::{CommandFn, CommandManager};
pub use dispatch::{Destination, Dispatch, DispatchError, Dispatcher, Registry};
pub use event::{EventGroup, EventManager, HookFile, HookFileError, MatchMode};

#[cfg(test)]
mod tests;
