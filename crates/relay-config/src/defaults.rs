#[cfg(unix)]
use camino::Utf8PathBuf;
#[cfg(unix)]
use std::env;

#[cfg(unix)]
use libc::geteuid;

#[cfg(unix)]
use dirs::runtime_dir;

use crate::socket::SocketEndpoint;

/// TCP port used when Unix domain sockets are not available.
pub const DEFAULT_TCP_PORT: u16 = 9780;

/// Default log filter expression.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Transport failures a client tolerates before it gives up.
pub const DEFAULT_ERROR_BUDGET: u32 = 10;

/// Read timeout of one client loop pass.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Longest inbound line accepted by clients and connection handlers.
pub const DEFAULT_MAX_LINE_BYTES: usize = 64 * 1024;

/// Default log filter expression.
#[must_use]
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value for serde defaults.
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format.
#[must_use]
pub fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Json
}

/// Serde default for [`crate::Config::error_budget`].
#[must_use]
pub fn default_error_budget() -> u32 {
    DEFAULT_ERROR_BUDGET
}

/// Serde default for [`crate::Config::poll_interval_ms`].
#[must_use]
pub fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

/// Serde default for [`crate::Config::max_line_bytes`].
#[must_use]
pub fn default_max_line_bytes() -> usize {
    DEFAULT_MAX_LINE_BYTES
}

/// Computes the default listen socket for the daemon.
///
/// On Unix this is `relay/relayd.sock` under the user runtime directory, or a
/// per-user directory under the system temp dir when no runtime directory is
/// available.
#[must_use]
pub fn default_socket_endpoint() -> SocketEndpoint {
    default_socket_endpoint_inner()
}

#[cfg(unix)]
fn default_socket_endpoint_inner() -> SocketEndpoint {
    let runtime = runtime_dir().and_then(|dir| Utf8PathBuf::from_path_buf(dir).ok());
    let (mut base, namespaced) = match runtime {
        Some(dir) => (dir, false),
        None => (temp_base_directory(), true),
    };

    base.push("relay");
    if namespaced {
        // SAFETY: geteuid has no preconditions and cannot fail.
        let uid = unsafe { geteuid() };
        base.push(format!("uid-{uid}"));
    }

    SocketEndpoint::unix(base.join("relayd.sock"))
}

#[cfg(unix)]
fn temp_base_directory() -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(env::temp_dir()).unwrap_or_else(|_| Utf8PathBuf::from("/tmp"))
}

#[cfg(not(unix))]
fn default_socket_endpoint_inner() -> SocketEndpoint {
    SocketEndpoint::tcp("127.0.0.1", DEFAULT_TCP_PORT)
}
