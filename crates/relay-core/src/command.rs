//! Named command table.
//!
//! Each command name maps to exactly one callback together with the source
//! that registered it. Attaching a name again replaces the previous entry.

use std::collections::HashMap;
use std::fmt;

use tracing::debug;

const COMMAND_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::command");

/// Callback signature: connection handle plus the raw parameters.
pub type CommandFn<C, R> = dyn Fn(&mut C, &[String]) -> R + Send + Sync;

struct CommandEntry<C, R> {
    callback: Box<CommandFn<C, R>>,
    source: String,
}

/// Maps command names to callbacks.
///
/// `C` is the connection handle passed to callbacks, `R` the value callbacks
/// return.
pub struct CommandManager<C, R> {
    commands: HashMap<String, CommandEntry<C, R>>,
}

impl<C, R> CommandManager<C, R> {
    /// Creates an empty command table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            commands: HashMap::new(),
        }
    }

    /// Registers `callback` under `name`, replacing any existing entry.
    ///
    /// Returns `true` when an existing entry was replaced.
    pub fn attach<F>(
        &mut self,
        name: impl Into<String>,
        callback: F,
        source: impl Into<String>,
    ) -> bool
    where
        F: Fn(&mut C, &[String]) -> R + Send + Sync + 'static,
    {
        let name = name.into();
        let entry = CommandEntry {
            callback: Box::new(callback),
            source: source.into(),
        };
        debug!(
            target: COMMAND_TARGET,
            command = %name,
            source = %entry.source,
            "attaching command"
        );
        self.commands.insert(name, entry).is_some()
    }

    /// Removes the entry registered under `name`.
    ///
    /// `source` identifies the requester and is only logged; the entry is
    /// removed whoever registered it. Returns whether an entry was removed.
    pub fn detach(&mut self, name: &str, source: &str) -> bool {
        match self.commands.remove(name) {
            Some(entry) => {
                debug!(
                    target: COMMAND_TARGET,
                    command = name,
                    requester = source,
                    owner = %entry.source,
                    "detached command"
                );
                true
            }
            None => false,
        }
    }

    /// Invokes the callback registered under `name` exactly once.
    ///
    /// Returns `None` when no command of that name exists.
    pub fn trigger(&self, name: &str, connection: &mut C, parameters: &[String]) -> Option<R> {
        let entry = self.commands.get(name)?;
        debug!(
            target: COMMAND_TARGET,
            command = name,
            parameters = parameters.len(),
            "triggering command"
        );
        Some((entry.callback)(connection, parameters))
    }

    /// Number of registered command names.
    #[must_use]
    pub fn count(&self) -> usize {
        self.commands.len()
    }

    /// Whether no commands are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Whether `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Source recorded for `name`.
    #[must_use]
    pub fn source(&self, name: &str) -> Option<&str> {
        self.commands.get(name).map(|entry| entry.source.as_str())
    }

    /// Registered names in lexical order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl<C, R> Default for CommandManager<C, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C, R> fmt::Debug for CommandManager<C, R> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("CommandManager")
            .field("commands", &self.names())
            .finish()
    }
}
