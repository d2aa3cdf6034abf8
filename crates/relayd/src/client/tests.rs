use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use relay_config::ClientSettings;
use rstest::{fixture, rstest};

use super::*;
use crate::builtin::{self, AppContext};
use crate::router::{CommandFailure, LineRouter, RouteError};

type Peer = Box<dyn FnOnce(TcpStream) -> Vec<String> + Send>;

/// Accepts one connection and runs `script` against it on a thread.
fn spawn_peer(script: Peer) -> (u16, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind peer");
    let port = listener.local_addr().expect("peer address").port();
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept client");
        script(stream)
    });
    (port, handle)
}

fn read_lines(stream: &TcpStream, count: usize) -> Vec<String> {
    let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
    (0..count)
        .map(|_| {
            let mut line = String::new();
            reader.read_line(&mut line).expect("read line");
            line.trim_end().to_owned()
        })
        .collect()
}

#[fixture]
fn settings() -> ClientSettings {
    ClientSettings::new(10, Duration::from_millis(10), 64)
}

#[fixture]
fn router() -> LineRouter {
    let mut router = builtin::router(AppContext::new("tests"));
    router.commands_mut().attach(
        "fail",
        |_: &mut Session, _: &[String]| Err(CommandFailure::new("fail", "refused")),
        "tests",
    );
    router
}

#[rstest]
fn create_allocates_without_connecting(settings: ClientSettings) {
    let client = SocketClient::create("127.0.0.1", 9, settings).expect("create");
    assert_eq!(client.state(), ClientState::Created);
    assert_eq!(client.endpoint(), "127.0.0.1:9");
    assert_eq!(client.error_count(), 0);
}

#[rstest]
fn routes_peer_lines_and_sends_replies(settings: ClientSettings, mut router: LineRouter) {
    let (port, peer) = spawn_peer(Box::new(|mut stream: TcpStream| {
        stream.write_all(b"ping\necho hi there\n").expect("send commands");
        read_lines(&stream, 2)
    }));
    let mut client = SocketClient::create("127.0.0.1", port, settings).expect("create");

    let exit = client.run(&mut router).expect("run");

    assert_eq!(exit, ClientExit::Disconnected);
    assert_eq!(client.state(), ClientState::Disconnected);
    assert_eq!(peer.join().expect("peer"), vec!["pong", "hi there"]);
}

#[rstest]
fn flushes_queued_packets_in_order(settings: ClientSettings, mut router: LineRouter) {
    let (port, peer) = spawn_peer(Box::new(|stream: TcpStream| read_lines(&stream, 2)));
    let mut client = SocketClient::create("127.0.0.1", port, settings).expect("create");
    client.add_packet("first");
    client.add_packet("second");
    assert_eq!(client.queued_packets(), 2);

    let exit = client.run(&mut router).expect("run");

    assert_eq!(exit, ClientExit::Disconnected);
    assert_eq!(client.queued_packets(), 0);
    assert_eq!(peer.join().expect("peer"), vec!["first", "second"]);
}

#[rstest]
fn stops_once_the_error_budget_is_spent(mut router: LineRouter) {
    let settings = ClientSettings::new(1, Duration::from_millis(10), 4);
    let (port, peer) = spawn_peer(Box::new(|mut stream: TcpStream| {
        stream
            .write_all(b"overlong-one\noverlong-two\n")
            .expect("send oversized lines");
        let mut rest = Vec::new();
        let _ = std::io::Read::read_to_end(&mut stream, &mut rest);
        Vec::new()
    }));
    let mut client = SocketClient::create("127.0.0.1", port, settings).expect("create");

    let exit = client.run(&mut router).expect("run");

    assert_eq!(exit, ClientExit::ErrorBudgetExhausted);
    assert_eq!(client.error_count(), 2);
    assert_eq!(client.state(), ClientState::Closed);
    peer.join().expect("peer");
}

#[rstest]
fn routing_failures_close_the_connection(settings: ClientSettings, mut router: LineRouter) {
    let (port, peer) = spawn_peer(Box::new(|mut stream: TcpStream| {
        stream.write_all(b"fail\n").expect("send failing command");
        let mut rest = Vec::new();
        let _ = std::io::Read::read_to_end(&mut stream, &mut rest);
        Vec::new()
    }));
    let mut client = SocketClient::create("127.0.0.1", port, settings).expect("create");

    let error = client.run(&mut router).expect_err("routing failure");

    assert!(matches!(
        error,
        ClientError::Route {
            source: RouteError::Command(_)
        }
    ));
    assert_eq!(client.state(), ClientState::Closed);
    peer.join().expect("peer");
}

#[rstest]
fn quit_ends_the_batch_it_arrives_in(settings: ClientSettings, mut router: LineRouter) {
    let (port, peer) = spawn_peer(Box::new(|mut stream: TcpStream| {
        stream
            .write_all(b"ping\nquit\nfail\n")
            .expect("send commands");
        BufReader::new(stream)
            .lines()
            .map(|line| line.expect("read reply"))
            .collect()
    }));
    let mut client = SocketClient::create("127.0.0.1", port, settings).expect("create");

    let exit = client.run(&mut router).expect("quit stops before the failing line");

    assert_eq!(exit, ClientExit::Shutdown);
    assert_eq!(client.state(), ClientState::Closed);
    assert_eq!(peer.join().expect("peer"), vec!["pong", "bye"]);
}

#[rstest]
fn shutdown_handle_stops_a_running_client(settings: ClientSettings, mut router: LineRouter) {
    let (port, peer) = spawn_peer(Box::new(|mut stream: TcpStream| {
        let mut rest = Vec::new();
        let _ = std::io::Read::read_to_end(&mut stream, &mut rest);
        Vec::new()
    }));
    let mut client = SocketClient::create("127.0.0.1", port, settings).expect("create");
    let handle = client.shutdown_handle();
    let observer = client.shutdown_handle();
    assert!(!observer.is_shutdown());
    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        handle.shutdown();
    });

    let exit = client.run(&mut router).expect("run");

    assert_eq!(exit, ClientExit::Shutdown);
    assert!(observer.is_shutdown());
    assert_eq!(client.state(), ClientState::Closed);
    stopper.join().expect("stopper");
    peer.join().expect("peer");
}

#[rstest]
fn close_is_idempotent(settings: ClientSettings, mut router: LineRouter) {
    let mut client = SocketClient::create("127.0.0.1", 9, settings).expect("create");
    client.close();
    client.close();
    client.shutdown();
    assert_eq!(client.state(), ClientState::Closed);

    let error = client.run(&mut router).expect_err("closed clients cannot run");
    assert!(matches!(
        error,
        ClientError::NotRunnable {
            state: ClientState::Closed
        }
    ));
}

#[rstest]
fn connection_refusals_are_reported(settings: ClientSettings, mut router: LineRouter) {
    let port = {
        let probe = TcpListener::bind(("127.0.0.1", 0)).expect("probe");
        probe.local_addr().expect("probe address").port()
    };
    let mut client = SocketClient::create("127.0.0.1", port, settings).expect("create");
    let error = client.run(&mut router).expect_err("nothing listens");
    assert!(matches!(error, ClientError::Connect { .. }));
    assert_eq!(client.state(), ClientState::Closed);

    let retry = client.run(&mut router).expect_err("failed clients cannot run");
    assert!(matches!(
        retry,
        ClientError::NotRunnable {
            state: ClientState::Closed
        }
    ));
}
