//! Commands and dispatch targets every relay router starts with.

use relay_core::{DispatchError, Dispatcher, EventManager, Registry};
use serde_json::Value;
use tracing::info;

use crate::router::{LineRouter, RelayCommands};
use crate::session::Session;

const AUDIT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::audit");

/// Source recorded for built-in commands.
pub const BUILTIN_SOURCE: &str = "relayd";

/// Application context handed to controller factories and closures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppContext {
    label: String,
}

impl AppContext {
    /// Creates a context; `label` identifies the process in audit logs.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }

    /// Label used in audit logs.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Registers `ping`, `echo` and `quit`.
pub fn register_commands(commands: &mut RelayCommands) {
    commands.attach(
        "ping",
        |session: &mut Session, _: &[String]| {
            session.reply("pong");
            Ok(())
        },
        BUILTIN_SOURCE,
    );
    commands.attach(
        "echo",
        |session: &mut Session, tokens: &[String]| {
            session.reply(tokens.get(1..).unwrap_or_default().join(" "));
            Ok(())
        },
        BUILTIN_SOURCE,
    );
    commands.attach(
        "quit",
        |session: &mut Session, _: &[String]| {
            session.reply("bye");
            session.request_close();
            Ok(())
        },
        BUILTIN_SOURCE,
    );
}

/// Counts and logs the events routed to it.
#[derive(Debug)]
struct Audit {
    label: String,
    recorded: u64,
}

impl Audit {
    fn record(&mut self, arguments: &[Value]) -> Value {
        self.recorded += 1;
        let payload = Value::Array(arguments.to_vec());
        info!(
            target: AUDIT_TARGET,
            process = %self.label,
            recorded = self.recorded,
            arguments = %payload,
            "event recorded"
        );
        Value::from(self.recorded)
    }
}

/// Registry with `Relay\Audit:record` and `Relay\Log::info`.
#[must_use]
pub fn registry() -> Registry<AppContext> {
    let mut registry = Registry::new();
    registry
        .controller("Relay\\Audit", |app: &AppContext| Audit {
            label: app.label().to_owned(),
            recorded: 0,
        })
        .method("record", |audit: &mut Audit, arguments| Ok(audit.record(arguments)));
    registry.function("Relay\\Log", "info", log_info);
    registry
}

fn log_info(arguments: &[Value]) -> Result<Value, DispatchError> {
    let message = arguments
        .iter()
        .map(|value| match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ");
    info!(target: AUDIT_TARGET, message = %message, "event log");
    Ok(Value::Null)
}

/// Router with the built-in commands and dispatch targets registered.
#[must_use]
pub fn router(context: AppContext) -> LineRouter {
    let mut commands = RelayCommands::new();
    register_commands(&mut commands);
    let events = EventManager::new(Dispatcher::new(context, registry()));
    LineRouter::new(commands, events)
}
