//! Routes inbound text lines to commands or event groups.
//!
//! A line is split on whitespace. When the first token names a command the
//! command receives every token, including its own name. Otherwise the first
//! token is triggered as an event group: the second token, if present, is the
//! sub-requirement id and all tokens after the group name become the callback
//! arguments.

use relay_core::{CommandManager, DispatchError, Dispatcher, EventManager};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, trace};

use crate::builtin::AppContext;
use crate::session::Session;

pub(crate) const ROUTER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::router");

/// Value returned by command callbacks.
pub type CommandResult = Result<(), CommandFailure>;

/// Command table used by the daemon and its clients.
pub type RelayCommands = CommandManager<Session, CommandResult>;

/// Event manager used by the daemon and its clients.
pub type RelayEvents = EventManager<Dispatcher<AppContext>>;

/// Failure reported by a command callback.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("command '{command}' failed: {message}")]
pub struct CommandFailure {
    command: String,
    message: String,
}

impl CommandFailure {
    /// Creates a failure for `command`.
    #[must_use]
    pub fn new(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Command that failed.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Failure description.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors that end the connection a line arrived on.
#[derive(Debug, Error)]
pub enum RouteError {
    /// A command callback failed.
    #[error(transparent)]
    Command(#[from] CommandFailure),
    /// An event callback could not be dispatched.
    #[error("event group '{group}' failed: {source}")]
    Dispatch {
        /// Group that was triggered.
        group: String,
        /// Dispatch failure.
        #[source]
        source: DispatchError,
    },
}

/// What happened to a routed line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// The line held no tokens.
    Empty,
    /// A command handled the line.
    Command,
    /// The line was triggered as an event group.
    Event {
        /// Whether at least one group fired.
        fired: bool,
    },
}

/// Command table plus event manager, fed one line at a time.
#[derive(Debug)]
pub struct LineRouter {
    commands: RelayCommands,
    events: RelayEvents,
}

impl LineRouter {
    /// Creates a router from its two tables.
    #[must_use]
    pub const fn new(commands: RelayCommands, events: RelayEvents) -> Self {
        Self { commands, events }
    }

    /// Registered commands.
    #[must_use]
    pub const fn commands(&self) -> &RelayCommands {
        &self.commands
    }

    /// Mutable access to the command table.
    pub fn commands_mut(&mut self) -> &mut RelayCommands {
        &mut self.commands
    }

    /// Registered event groups.
    #[must_use]
    pub const fn events(&self) -> &RelayEvents {
        &self.events
    }

    /// Mutable access to the event manager.
    pub fn events_mut(&mut self) -> &mut RelayEvents {
        &mut self.events
    }

    /// Routes one line on behalf of `session`.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError`] when the command callback fails or an event
    /// callback cannot be dispatched.
    pub fn route_line(
        &mut self,
        session: &mut Session,
        line: &str,
    ) -> Result<RouteOutcome, RouteError> {
        let tokens: Vec<String> = line.split_whitespace().map(str::to_owned).collect();
        let Some(name) = tokens.first() else {
            return Ok(RouteOutcome::Empty);
        };

        if let Some(result) = self.commands.trigger(name, session, &tokens) {
            result?;
            trace!(target: ROUTER_TARGET, peer = session.peer(), command = %name, "command handled");
            return Ok(RouteOutcome::Command);
        }

        let sub_id = tokens.get(1).map_or("", String::as_str);
        let arguments: Vec<Value> = tokens.iter().skip(1).cloned().map(Value::String).collect();
        let data = (!arguments.is_empty()).then_some(Value::Array(arguments));
        let fired = self
            .events
            .trigger(name, sub_id, data)
            .map_err(|source| RouteError::Dispatch {
                group: name.clone(),
                source,
            })?;
        debug!(
            target: ROUTER_TARGET,
            peer = session.peer(),
            group = %name,
            sub_id,
            fired,
            "event triggered"
        );
        Ok(RouteOutcome::Event { fired })
    }
}
