//! Shared configuration for the relay daemon and its socket clients.
//!
//! Values are layered by `ortho_config`: built-in defaults, then an optional
//! configuration file (`--config-path` or the discovered `.relay.toml`), then
//! `RELAY_*` environment variables, then command-line flags. Later layers win.
//!
//! The daemon reads [`Config::listen_socket`] to bind its listener and
//! [`Config::client_settings`] to tune the polling loop of socket clients.

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

mod client;
mod defaults;
mod logging;
mod matching;
mod socket;

pub use client::ClientSettings;
pub use defaults::{
    DEFAULT_ERROR_BUDGET, DEFAULT_LOG_FILTER, DEFAULT_MAX_LINE_BYTES, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_TCP_PORT, default_error_budget, default_log_filter, default_log_filter_string,
    default_log_format, default_max_line_bytes, default_poll_interval_ms, default_socket_endpoint,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use matching::{GroupMatching, GroupMatchingParseError};
pub use socket::{SocketEndpoint, SocketParseError, SocketPreparationError};

/// Resolved relay configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "RELAY")]
pub struct Config {
    /// Socket the daemon listens on.
    #[serde(default = "default_socket_endpoint")]
    pub listen_socket: SocketEndpoint,
    /// `tracing` filter expression.
    #[serde(default = "default_log_filter_string")]
    pub log_filter: String,
    /// Output format of the log subscriber.
    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,
    /// JSON hook file imported into the event manager at startup.
    #[serde(default)]
    pub hooks_path: Option<Utf8PathBuf>,
    /// Resolution of event group names; `pattern` treats registered names as
    /// anchored patterns when no group matches a trigger exactly.
    #[serde(default)]
    pub group_matching: GroupMatching,
    /// Number of transport failures a client tolerates before disconnecting.
    #[serde(default = "default_error_budget")]
    pub error_budget: u32,
    /// Read timeout of one client loop pass, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Longest accepted inbound line, in bytes.
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_socket: default_socket_endpoint(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            hooks_path: None,
            group_matching: GroupMatching::Exact,
            error_budget: DEFAULT_ERROR_BUDGET,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
        }
    }
}

impl Config {
    /// Socket endpoint the daemon binds.
    #[must_use]
    pub const fn listen_socket(&self) -> &SocketEndpoint {
        &self.listen_socket
    }

    /// Log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Hook file to import, if configured.
    #[must_use]
    pub fn hooks_path(&self) -> Option<&camino::Utf8Path> {
        self.hooks_path.as_deref()
    }

    /// Resolution strategy for event group names.
    #[must_use]
    pub const fn group_matching(&self) -> GroupMatching {
        self.group_matching
    }

    /// Whether event groups fall back to pattern matching.
    #[must_use]
    pub const fn pattern_groups(&self) -> bool {
        self.group_matching.is_pattern()
    }

    /// Client loop tuning derived from this configuration.
    #[must_use]
    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings::new(
            self.error_budget,
            std::time::Duration::from_millis(self.poll_interval_ms),
            self.max_line_bytes,
        )
    }
}
