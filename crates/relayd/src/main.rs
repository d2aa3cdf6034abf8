//! Relay daemon entry point.
//!
//! Loads configuration, serves the configured socket until a termination
//! signal arrives, then exits non-zero if bootstrap or serving failed.

use std::process::ExitCode;
use std::sync::Arc;

use relayd::{StructuredHealthReporter, SystemConfigLoader, SystemShutdownSignal, run_daemon};

fn main() -> ExitCode {
    match run_daemon(
        &SystemConfigLoader,
        Arc::new(StructuredHealthReporter::new()),
        &SystemShutdownSignal,
    ) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(target: "relayd", error = %error, "relay exited with an error");
            ExitCode::FAILURE
        }
    }
}
