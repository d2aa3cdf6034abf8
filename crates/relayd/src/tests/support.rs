//! Test doubles shared by the daemon suites.

use std::ffi::OsString;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::{OrthoConfig, OrthoError};
use tempfile::TempDir;

use relay_config::{Config, GroupMatching, SocketEndpoint};

use crate::bootstrap::{BootstrapError, ConfigLoader};
use crate::health::HealthReporter;
use crate::shutdown::{ShutdownError, ShutdownSignal};

/// Lifecycle events captured by [`RecordingHealthReporter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    BootstrapStarting,
    BootstrapSucceeded,
    BootstrapFailed(String),
    HooksImported(usize),
    ListenerReady,
    ListenerStopped,
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn hooks_imported(&self, _path: &Utf8Path, callbacks: usize) {
        self.record(HealthEvent::HooksImported(callbacks));
    }

    fn listener_ready(&self, _endpoint: &SocketEndpoint) {
        self.record(HealthEvent::ListenerReady);
    }

    fn listener_stopped(&self, _endpoint: &SocketEndpoint) {
        self.record(HealthEvent::ListenerStopped);
    }
}

/// Loader placing the listen socket and hook file in a temporary directory.
pub struct TempConfigLoader {
    dir: TempDir,
    hooks: Option<Utf8PathBuf>,
    group_matching: GroupMatching,
}

impl TempConfigLoader {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temporary directory"),
            hooks: None,
            group_matching: GroupMatching::Exact,
        }
    }

    pub fn socket_path(&self) -> Utf8PathBuf {
        self.root().join("run").join("relayd.sock")
    }

    pub fn write_hooks(&mut self, contents: &str) {
        let path = self.root().join("hooks.json");
        fs::write(&path, contents).expect("write hook file");
        self.hooks = Some(path);
    }

    pub fn point_hooks_at_missing_file(&mut self) {
        self.hooks = Some(self.root().join("missing.json"));
    }

    pub const fn enable_pattern_groups(&mut self) {
        self.group_matching = GroupMatching::Pattern;
    }

    fn root(&self) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(self.dir.path().to_path_buf())
            .expect("temporary directory path is UTF-8")
    }
}

impl ConfigLoader for TempConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(Config {
            listen_socket: SocketEndpoint::unix(self.socket_path()),
            hooks_path: self.hooks.clone(),
            group_matching: self.group_matching,
            ..Config::default()
        })
    }
}

/// Loader that fails by passing an unsupported socket scheme.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load_from_iter([
            OsString::from("relayd"),
            OsString::from("--listen-socket"),
            OsString::from("invalid://socket"),
        ])
    }
}

/// Shutdown signal that talks to the running relay before releasing it.
///
/// `wait` connects to the Unix socket, sends `request`, collects replies
/// until the relay closes the connection, then returns.
pub struct ConversationSignal {
    socket: Utf8PathBuf,
    request: String,
    replies: Mutex<Vec<String>>,
}

impl ConversationSignal {
    pub fn new(socket: Utf8PathBuf, request: impl Into<String>) -> Self {
        Self {
            socket,
            request: request.into(),
            replies: Mutex::new(Vec::new()),
        }
    }

    pub fn replies(&self) -> Vec<String> {
        self.replies.lock().expect("replies mutex poisoned").clone()
    }

    fn connect(&self) -> UnixStream {
        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            match UnixStream::connect(&self.socket) {
                Ok(stream) => return stream,
                Err(error) if Instant::now() >= deadline => {
                    panic!("relay socket never became available: {error}")
                }
                Err(_) => std::thread::sleep(Duration::from_millis(10)),
            }
        }
    }
}

impl ShutdownSignal for ConversationSignal {
    fn wait(&self) -> Result<(), ShutdownError> {
        let mut stream = self.connect();
        stream
            .write_all(self.request.as_bytes())
            .expect("send request");
        let replies = BufReader::new(stream)
            .lines()
            .map(|line| line.expect("read reply"))
            .collect::<Vec<_>>();
        *self.replies.lock().expect("replies mutex poisoned") = replies;
        Ok(())
    }
}
