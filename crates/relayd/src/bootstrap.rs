//! Relay bootstrap and serving.

use std::sync::{Arc, Mutex};

use ortho_config::{OrthoConfig, OrthoError};
use relay_config::{Config, SocketPreparationError};
use relay_core::{HookFileError, MatchMode};
use thiserror::Error;

use crate::builtin::{self, AppContext};
use crate::health::HealthReporter;
use crate::router::LineRouter;
use crate::shutdown::{ShutdownError, ShutdownSignal};
use crate::telemetry::{self, TelemetryError, TelemetryHandle};
use crate::transport::{LineConnectionHandler, ListenerError, SharedRouter, SocketListener};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the relay configuration.
    ///
    /// # Errors
    ///
    /// Returns the `ortho_config` error when a layer fails to parse.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader returning a configuration resolved ahead of time.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps an already resolved configuration.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// Socket preparation failed.
    #[error("failed to prepare listen socket: {source}")]
    Socket {
        /// Filesystem error reported while preparing the socket directory.
        #[source]
        source: SocketPreparationError,
    },
    /// The configured hook file could not be imported.
    #[error("failed to import event hooks: {source}")]
    Hooks {
        /// Underlying import error.
        #[source]
        source: HookFileError,
    },
}

/// Errors raised while serving connections.
#[derive(Debug, Error)]
pub enum ServeError {
    /// The listener could not be bound, started or joined.
    #[error(transparent)]
    Listener(#[from] ListenerError),
    /// Waiting for the shutdown signal failed.
    #[error(transparent)]
    Shutdown(#[from] ShutdownError),
}

/// Result of a successful bootstrap invocation.
pub struct Daemon {
    config: Config,
    router: SharedRouter,
    telemetry: TelemetryHandle,
    reporter: Arc<dyn HealthReporter>,
}

impl Daemon {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Router shared by every connection.
    #[must_use]
    pub fn router(&self) -> SharedRouter {
        Arc::clone(&self.router)
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub const fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Binds the configured socket and serves connections until `signal`
    /// fires.
    ///
    /// # Errors
    ///
    /// Returns [`ServeError::Listener`] when the socket cannot be bound or
    /// the accept loop panics, and [`ServeError::Shutdown`] when the signal
    /// source fails. The listener is stopped in both cases once it started.
    pub fn serve(&self, signal: &dyn ShutdownSignal) -> Result<(), ServeError> {
        let endpoint = self.config.listen_socket();
        let listener = SocketListener::bind(endpoint)?;
        let handler = LineConnectionHandler::new(
            self.router(),
            self.config.client_settings().max_line_bytes(),
        );
        let handle = listener.start(Arc::new(handler))?;
        self.reporter.listener_ready(endpoint);

        let waited = signal.wait();
        handle.shutdown();
        handle.join()?;
        self.reporter.listener_stopped(endpoint);
        waited.map_err(ServeError::from)
    }
}

impl std::fmt::Debug for Daemon {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Daemon")
            .field("config", &self.config)
            .field("telemetry", &self.telemetry)
            .finish_non_exhaustive()
    }
}

/// Bootstraps the relay using the supplied collaborators.
///
/// Loads configuration, installs telemetry, prepares the socket directory,
/// then builds the router with the built-in commands and imports the
/// configured hook file.
///
/// # Errors
///
/// Returns the first [`BootstrapError`] encountered; the reporter sees it
/// before it is returned.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
) -> Result<Daemon, BootstrapError> {
    reporter.bootstrap_starting();
    match assemble(loader, reporter.as_ref()) {
        Ok((config, router, telemetry)) => {
            reporter.bootstrap_succeeded(&config);
            Ok(Daemon {
                config,
                router: Arc::new(Mutex::new(router)),
                telemetry,
                reporter,
            })
        }
        Err(error) => {
            reporter.bootstrap_failed(&error);
            Err(error)
        }
    }
}

fn assemble(
    loader: &dyn ConfigLoader,
    reporter: &dyn HealthReporter,
) -> Result<(Config, LineRouter, TelemetryHandle), BootstrapError> {
    let config = loader
        .load()
        .map_err(|source| BootstrapError::Configuration { source })?;
    let telemetry =
        telemetry::initialise(&config).map_err(|source| BootstrapError::Telemetry { source })?;
    config
        .listen_socket()
        .prepare_filesystem()
        .map_err(|source| BootstrapError::Socket { source })?;

    let mut router = builtin::router(AppContext::new(env!("CARGO_PKG_NAME")));
    if config.pattern_groups() {
        router.events_mut().set_match_mode(MatchMode::Pattern);
    }
    if let Some(path) = config.hooks_path() {
        let attached = router
            .events_mut()
            .import_file(path)
            .map_err(|source| BootstrapError::Hooks { source })?;
        reporter.hooks_imported(path, attached);
    }
    Ok((config, router, telemetry))
}
