//! Process entry point shared by the binary and integration tests.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::bootstrap::{BootstrapError, ConfigLoader, ServeError, bootstrap_with};
use crate::health::HealthReporter;
use crate::shutdown::ShutdownSignal;

const LAUNCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::launch");

/// Errors that end the relay process.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Bootstrapping the relay failed.
    #[error("relay bootstrap failed: {source}")]
    Bootstrap {
        /// Underlying bootstrap error.
        #[source]
        source: BootstrapError,
    },
    /// Serving connections failed.
    #[error("relay stopped with an error: {source}")]
    Serve {
        /// Underlying serve error.
        #[source]
        source: ServeError,
    },
}

impl From<BootstrapError> for LaunchError {
    fn from(source: BootstrapError) -> Self {
        Self::Bootstrap { source }
    }
}

impl From<ServeError> for LaunchError {
    fn from(source: ServeError) -> Self {
        Self::Serve { source }
    }
}

/// Bootstraps the relay and serves until `signal` fires.
///
/// # Errors
///
/// Returns [`LaunchError::Bootstrap`] or [`LaunchError::Serve`].
pub fn run_daemon(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    signal: &dyn ShutdownSignal,
) -> Result<(), LaunchError> {
    let daemon = bootstrap_with(loader, reporter)?;
    daemon.serve(signal)?;
    info!(target: LAUNCH_TARGET, "relay shut down cleanly");
    Ok(())
}
