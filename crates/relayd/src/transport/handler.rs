//! Connection handling for the line transport.

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, warn};

use super::LISTENER_TARGET;
use crate::lines::LineBuffer;
use crate::router::{LineRouter, RouteError};
use crate::session::Session;

#[cfg(unix)]
use std::os::unix::net::UnixStream;

/// Router shared by every connection of a listener.
pub type SharedRouter = Arc<Mutex<LineRouter>>;

/// Stream types accepted by the listener.
#[derive(Debug)]
pub enum ConnectionStream {
    /// TCP connection.
    Tcp(TcpStream),
    /// Unix domain socket connection.
    #[cfg(unix)]
    Unix(UnixStream),
}

impl ConnectionStream {
    /// Description of the remote end for logs and sessions.
    #[must_use]
    pub fn peer_label(&self) -> String {
        match self {
            Self::Tcp(stream) => stream
                .peer_addr()
                .map_or_else(|_| "tcp://unknown".to_owned(), |addr| format!("tcp://{addr}")),
            #[cfg(unix)]
            Self::Unix(_) => "unix".to_owned(),
        }
    }
}

impl Read for ConnectionStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            Self::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for ConnectionStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            Self::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            Self::Unix(stream) => stream.flush(),
        }
    }
}

/// Handles accepted socket connections.
pub trait ConnectionHandler: Send + Sync + 'static {
    /// Handles a single connection. Implementations should avoid panicking.
    fn handle(&self, stream: ConnectionStream);
}

/// Reads lines from a connection and routes each one through a shared
/// [`LineRouter`].
///
/// Replies queued by commands are written back after every line. The
/// connection closes when the peer hangs up, a command asks for it, a line is
/// too long, or routing fails; routing failures are reported to the peer as
/// an `error: <message>` line first.
#[derive(Debug, Clone)]
pub struct LineConnectionHandler {
    router: SharedRouter,
    max_line_bytes: usize,
}

enum Flow {
    Continue,
    Close,
}

impl LineConnectionHandler {
    /// Creates a handler routing through `router`.
    #[must_use]
    pub const fn new(router: SharedRouter, max_line_bytes: usize) -> Self {
        Self {
            router,
            max_line_bytes,
        }
    }

    fn serve(&self, stream: &mut ConnectionStream, session: &mut Session) -> io::Result<()> {
        let mut buffer = LineBuffer::new(self.max_line_bytes);
        let mut chunk = [0_u8; 1024];
        loop {
            let read = read_chunk_with_retry(stream, &mut chunk)?;
            if read == 0 {
                if let Some(line) = buffer.finish() {
                    self.route(stream, session, &line)?;
                }
                debug!(target: LISTENER_TARGET, peer = session.peer(), "peer closed connection");
                return Ok(());
            }

            let batch = buffer.push(chunk.get(..read).unwrap_or_default());
            for line in &batch.lines {
                if matches!(self.route(stream, session, line)?, Flow::Close) {
                    return Ok(());
                }
            }
            if batch.oversized > 0 {
                write_line(
                    stream,
                    &format!("error: line exceeds {} bytes", self.max_line_bytes),
                )?;
                return Ok(());
            }
        }
    }

    fn route(
        &self,
        stream: &mut ConnectionStream,
        session: &mut Session,
        line: &str,
    ) -> io::Result<Flow> {
        let outcome = {
            let mut router = self.router.lock().unwrap_or_else(PoisonError::into_inner);
            router.route_line(session, line)
        };
        for reply in session.drain_replies() {
            write_line(stream, &reply)?;
        }
        match outcome {
            Ok(_) if session.close_requested() => Ok(Flow::Close),
            Ok(_) => Ok(Flow::Continue),
            Err(error) => {
                report_route_error(session, &error);
                write_line(stream, &format!("error: {error}"))?;
                Ok(Flow::Close)
            }
        }
    }
}

impl ConnectionHandler for LineConnectionHandler {
    fn handle(&self, mut stream: ConnectionStream) {
        let mut session = Session::new(stream.peer_label());
        debug!(target: LISTENER_TARGET, peer = session.peer(), "connection opened");
        if let Err(error) = self.serve(&mut stream, &mut session) {
            warn!(
                target: LISTENER_TARGET,
                peer = session.peer(),
                error = %error,
                "connection handler error"
            );
        }
    }
}

fn report_route_error(session: &Session, error: &RouteError) {
    let unresolved = matches!(
        error,
        RouteError::Dispatch { source, .. } if source.is_resolution_error()
    );
    warn!(
        target: LISTENER_TARGET,
        peer = session.peer(),
        error = %error,
        unresolved,
        "routing failed, closing connection"
    );
}

fn write_line(stream: &mut ConnectionStream, line: &str) -> io::Result<()> {
    stream.write_all(line.as_bytes())?;
    stream.write_all(b"\n")?;
    stream.flush()
}

fn read_chunk_with_retry(stream: &mut ConnectionStream, chunk: &mut [u8]) -> io::Result<usize> {
    loop {
        match stream.read(chunk) {
            Ok(read) => return Ok(read),
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) => return Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader};
    use std::net::TcpListener;
    use std::thread;

    use rstest::{fixture, rstest};

    use super::*;
    use crate::builtin::{self, AppContext};
    use crate::router::CommandFailure;

    #[fixture]
    fn shared_router() -> SharedRouter {
        let mut router = builtin::router(AppContext::new("tests"));
        router.commands_mut().attach(
            "fail",
            |_: &mut Session, _: &[String]| Err(CommandFailure::new("fail", "refused")),
            "tests",
        );
        Arc::new(Mutex::new(router))
    }

    fn converse(router: SharedRouter, max_line_bytes: usize, request: &[u8]) -> Vec<String> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind listener");
        let addr = listener.local_addr().expect("listener address");
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().expect("accept connection");
            LineConnectionHandler::new(router, max_line_bytes).handle(ConnectionStream::Tcp(stream));
        });

        let mut client = TcpStream::connect(addr).expect("connect client");
        client.write_all(request).expect("write request");
        let reader = BufReader::new(client);
        let replies = reader
            .lines()
            .map(|line| line.expect("read reply"))
            .collect();
        server.join().expect("join server");
        replies
    }

    #[rstest]
    fn replies_until_quit(shared_router: SharedRouter) {
        let replies = converse(shared_router, 1024, b"ping\necho a b\nquit\nping\n");
        assert_eq!(replies, vec!["pong", "a b", "bye"]);
    }

    #[rstest]
    fn routing_failures_close_with_an_error_line(shared_router: SharedRouter) {
        let replies = converse(shared_router, 1024, b"fail\nping\n");
        assert_eq!(replies, vec!["error: command 'fail' failed: refused"]);
    }

    #[rstest]
    fn oversized_lines_close_the_connection(shared_router: SharedRouter) {
        let replies = converse(shared_router, 8, b"ping\nthis line is too long\n");
        assert_eq!(replies, vec!["pong", "error: line exceeds 8 bytes"]);
    }
}
