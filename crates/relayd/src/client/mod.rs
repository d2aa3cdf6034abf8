//! Blocking TCP client that feeds received lines into a [`LineRouter`].
//!
//! The client polls its socket: each pass flushes queued outbound packets,
//! then waits up to the poll interval for inbound bytes. Transport failures
//! are counted; once the count exceeds the error budget the client gives up.
//! A routing failure closes the connection immediately.

mod errors;
#[cfg(test)]
mod tests;

use std::collections::VecDeque;
use std::fmt;
use std::io::{self, Read, Write};
use std::mem;
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use relay_config::ClientSettings;
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use tracing::{debug, info, warn};

use crate::lines::LineBuffer;
use crate::router::LineRouter;
use crate::session::Session;

pub use self::errors::ClientError;

const CLIENT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::client");
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Lifecycle of a [`SocketClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// Socket allocated, not yet connected.
    Created,
    /// Connected, loop not yet entered.
    Connected,
    /// Inside the polling loop.
    Running,
    /// The peer closed the connection.
    Disconnected,
    /// Closed locally.
    Closed,
}

impl fmt::Display for ClientState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Created => "created",
            Self::Connected => "connected",
            Self::Running => "running",
            Self::Disconnected => "disconnected",
            Self::Closed => "closed",
        })
    }
}

/// Why [`SocketClient::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientExit {
    /// The peer closed the connection.
    Disconnected,
    /// Shutdown was requested.
    Shutdown,
    /// More transport failures than the error budget allows.
    ErrorBudgetExhausted,
}

/// Cloneable handle that stops a running client from another thread.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    stop: Arc<AtomicBool>,
}

impl ShutdownHandle {
    /// Asks the client to stop at the start of its next pass.
    pub fn shutdown(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Whether shutdown has been requested.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }
}

enum Handle {
    Allocated(Socket),
    Connected(TcpStream),
    Released,
}

/// Line-oriented TCP client.
pub struct SocketClient {
    host: String,
    port: u16,
    address: SocketAddr,
    settings: ClientSettings,
    handle: Handle,
    state: ClientState,
    stop: Arc<AtomicBool>,
    outbox: VecDeque<String>,
    errors: u32,
    lines: LineBuffer,
}

impl SocketClient {
    /// Resolves `host:port` and allocates the stream socket.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Resolve`], [`ClientError::ResolveEmpty`] or
    /// [`ClientError::Allocate`].
    pub fn create(
        host: impl Into<String>,
        port: u16,
        settings: ClientSettings,
    ) -> Result<Self, ClientError> {
        let host = host.into();
        let address = resolve(&host, port)?;
        let socket = Socket::new(Domain::for_address(address), Type::STREAM, Some(Protocol::TCP))
            .map_err(|source| ClientError::Allocate { source })?;
        debug!(target: CLIENT_TARGET, host = %host, port, %address, "socket allocated");
        Ok(Self {
            host,
            port,
            address,
            lines: LineBuffer::new(settings.max_line_bytes()),
            settings,
            handle: Handle::Allocated(socket),
            state: ClientState::Created,
            stop: Arc::new(AtomicBool::new(false)),
            outbox: VecDeque::new(),
            errors: 0,
        })
    }

    /// Connects and runs the polling loop until it ends.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Connect`] or [`ClientError::Configure`] when the
    /// connection cannot be established, [`ClientError::NotRunnable`] when
    /// the client already ran, and [`ClientError::Route`] when a received
    /// line fails to route.
    pub fn run(&mut self, router: &mut LineRouter) -> Result<ClientExit, ClientError> {
        let mut stream = self.connect()?;
        self.state = ClientState::Running;
        let mut session = Session::new(self.endpoint());
        let mut chunk = [0_u8; 4096];

        let exit = loop {
            if self.stop.load(Ordering::SeqCst) {
                break ClientExit::Shutdown;
            }
            if self.budget_exhausted() {
                break ClientExit::ErrorBudgetExhausted;
            }

            self.flush_outbox(&mut stream);

            let read = match stream.read(&mut chunk) {
                Ok(read) => read,
                Err(error) if is_poll_timeout(&error) => continue,
                Err(error) => {
                    self.record_error("read failed", &error);
                    continue;
                }
            };
            if read == 0 {
                if let Some(line) = self.lines.finish() {
                    self.route(router, &mut session, &line)?;
                    self.flush_outbox(&mut stream);
                }
                break ClientExit::Disconnected;
            }

            let batch = self.lines.push(chunk.get(..read).unwrap_or_default());
            for _ in 0..batch.oversized {
                self.record_error(
                    "line too long",
                    &io::Error::new(io::ErrorKind::InvalidData, "line exceeds limit"),
                );
            }
            for line in &batch.lines {
                self.route(router, &mut session, line)?;
                if session.close_requested() {
                    break;
                }
            }
            if session.close_requested() {
                self.flush_outbox(&mut stream);
                break ClientExit::Shutdown;
            }
        };

        info!(
            target: CLIENT_TARGET,
            endpoint = %self.endpoint(),
            ?exit,
            errors = self.errors,
            "client loop finished"
        );
        if exit == ClientExit::Disconnected {
            self.handle = Handle::Released;
            self.state = ClientState::Disconnected;
        } else {
            self.close();
        }
        Ok(exit)
    }

    /// Queues `packet` for sending; a newline is appended on the wire.
    pub fn add_packet(&mut self, packet: impl Into<String>) {
        self.outbox.push_back(packet.into());
    }

    /// Stops the loop and closes the socket. Repeated calls do nothing.
    pub fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        match mem::replace(&mut self.handle, Handle::Released) {
            Handle::Connected(stream) => {
                if let Err(error) = stream.shutdown(Shutdown::Both) {
                    debug!(target: CLIENT_TARGET, %error, "socket shutdown failed");
                }
                self.state = ClientState::Closed;
            }
            Handle::Allocated(_) => self.state = ClientState::Closed,
            Handle::Released => {
                if self.state != ClientState::Disconnected {
                    self.state = ClientState::Closed;
                }
            }
        }
    }

    /// Same as [`SocketClient::shutdown`].
    pub fn close(&mut self) {
        self.shutdown();
    }

    /// Handle that stops the loop from another thread.
    #[must_use]
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            stop: Arc::clone(&self.stop),
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ClientState {
        self.state
    }

    /// Transport failures counted so far.
    #[must_use]
    pub const fn error_count(&self) -> u32 {
        self.errors
    }

    /// Packets waiting to be sent.
    #[must_use]
    pub fn queued_packets(&self) -> usize {
        self.outbox.len()
    }

    /// Peer as `host:port`.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn connect(&mut self) -> Result<TcpStream, ClientError> {
        let socket = match mem::replace(&mut self.handle, Handle::Released) {
            Handle::Allocated(socket) => socket,
            other => {
                self.handle = other;
                return Err(ClientError::NotRunnable { state: self.state });
            }
        };
        if let Err(source) =
            socket.connect_timeout(&SockAddr::from(self.address), self.settings.connect_timeout())
        {
            self.state = ClientState::Closed;
            return Err(ClientError::Connect {
                endpoint: self.endpoint(),
                source,
            });
        }
        let stream: TcpStream = socket.into();
        let writer = match configure(&stream, self.settings.poll_interval()) {
            Ok(writer) => writer,
            Err(source) => {
                self.state = ClientState::Closed;
                return Err(ClientError::Configure { source });
            }
        };
        self.handle = Handle::Connected(stream);
        self.state = ClientState::Connected;
        info!(target: CLIENT_TARGET, endpoint = %self.endpoint(), "client connected");
        Ok(writer)
    }

    fn flush_outbox(&mut self, stream: &mut TcpStream) {
        while let Some(packet) = self.outbox.pop_front() {
            let written = stream
                .write_all(packet.as_bytes())
                .and_then(|()| stream.write_all(b"\n"))
                .and_then(|()| stream.flush());
            if let Err(error) = written {
                self.outbox.push_front(packet);
                self.record_error("write failed", &error);
                return;
            }
        }
    }

    fn route(
        &mut self,
        router: &mut LineRouter,
        session: &mut Session,
        line: &str,
    ) -> Result<(), ClientError> {
        let routed = router.route_line(session, line);
        self.outbox.extend(session.drain_replies());
        if let Err(source) = routed {
            warn!(
                target: CLIENT_TARGET,
                endpoint = %self.endpoint(),
                error = %source,
                "routing failed, closing connection"
            );
            self.close();
            return Err(ClientError::Route { source });
        }
        Ok(())
    }

    fn record_error(&mut self, context: &'static str, error: &io::Error) {
        self.errors = self.errors.saturating_add(1);
        warn!(
            target: CLIENT_TARGET,
            endpoint = %self.endpoint(),
            errors = self.errors,
            budget = self.settings.error_budget(),
            %error,
            "{context}"
        );
    }

    const fn budget_exhausted(&self) -> bool {
        self.errors > self.settings.error_budget()
    }
}

impl Drop for SocketClient {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for SocketClient {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SocketClient")
            .field("endpoint", &self.endpoint())
            .field("state", &self.state)
            .field("errors", &self.errors)
            .field("queued", &self.outbox.len())
            .finish_non_exhaustive()
    }
}

fn resolve(host: &str, port: u16) -> Result<SocketAddr, ClientError> {
    (host, port)
        .to_socket_addrs()
        .map_err(|source| ClientError::Resolve {
            endpoint: format!("{host}:{port}"),
            source,
        })?
        .next()
        .ok_or_else(|| ClientError::ResolveEmpty {
            endpoint: format!("{host}:{port}"),
        })
}

fn configure(stream: &TcpStream, poll_interval: Duration) -> io::Result<TcpStream> {
    stream.set_read_timeout(Some(poll_interval.max(MIN_POLL_INTERVAL)))?;
    stream.try_clone()
}

fn is_poll_timeout(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
    )
}
