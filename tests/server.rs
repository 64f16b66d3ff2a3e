//! End-to-end: a real TCP client talking to the command server and worker.

use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpStream};
use std::thread;
use std::time::{Duration, Instant};

use embedded_graphics::prelude::Size;
use oled_display_server::device::RecordingDisplay;
use oled_display_server::protocol::{Reply, Status};
use oled_display_server::render::{Layout, Renderer};
use oled_display_server::server::CommandServer;
use oled_display_server::styles::FontChoice;
use oled_display_server::tasks::{RenderHandle, RenderWorker, WorkerOptions};
use oled_display_server::transport::{TcpOptions, TcpTransport};

const SIZE: Size = Size::new(128, 64);
const TIMEOUT: Duration = Duration::from_secs(5);

struct Harness {
    addr: SocketAddr,
    handle: RenderHandle,
    recorder: RecordingDisplay,
}

/// Worker on a recording display plus a server on an ephemeral port.
///
/// The server thread is left running; it dies with the test process.
fn start() -> Harness { start_with(TcpOptions::default()) }

fn start_with(options: TcpOptions) -> Harness {
    let recorder = RecordingDisplay::new(SIZE);
    let worker = RenderWorker::spawn(
        Box::new(recorder.clone()),
        WorkerOptions {
            wake_poll: Duration::from_millis(50),
            ..WorkerOptions::default()
        },
    )
    .unwrap();
    let handle = worker.handle();

    let transport = TcpTransport::bind("127.0.0.1:0", options).unwrap();
    let addr = transport.local_addr();
    let server_handle = handle.clone();
    thread::spawn(move || {
        let _worker = worker;
        CommandServer::new(transport, server_handle).run()
    });

    Harness {
        addr,
        handle,
        recorder,
    }
}

struct Client {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl Client {
    fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).unwrap();
        stream.set_read_timeout(Some(TIMEOUT)).unwrap();
        Self {
            writer: stream.try_clone().unwrap(),
            reader: BufReader::new(stream),
        }
    }

    fn request(
        &mut self,
        body: &str,
    ) -> Reply {
        self.writer.write_all(body.as_bytes()).unwrap();
        self.writer.write_all(b"\n").unwrap();
        let mut line = String::new();
        self.reader.read_line(&mut line).unwrap();
        serde_json::from_str(&line).unwrap()
    }
}

fn frame_of(lines: &[&str]) -> oled_display_server::framebuffer::Framebuffer {
    Renderer::new(FontChoice::default(), SIZE)
        .compose(&Layout::from_lines(lines))
        .clone()
}

fn wait_until(condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + TIMEOUT;
    while Instant::now() < deadline && !condition() {
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

#[test]
fn test_ping() {
    let harness = start();
    let mut client = Client::connect(harness.addr);
    let reply = client.request(r#"{"command":"ping"}"#);
    assert_eq!(reply, Reply::ok("responding to a ping"));
}

#[test]
fn test_display_renders_lines() {
    let harness = start();
    let mut client = Client::connect(harness.addr);

    let reply = client.request(r#"{"command":"display","option":{"message":"Hello\nWorld"}}"#);
    assert_eq!(reply, Reply::ok("Message displayed"));
    assert!(wait_until(|| harness.recorder.frame_count() == 1));
    assert_eq!(harness.recorder.last_frame().unwrap(), frame_of(&["Hello", "World"]));
}

#[test]
fn test_long_and_many_lines_are_cut() {
    let harness = start();
    let mut client = Client::connect(harness.addr);

    let long = "x".repeat(40);
    let lines: Vec<String> = (0..10).map(|i| format!("{i} {long}")).collect();
    let body = serde_json::json!({"command": "display", "option": {"message": lines}}).to_string();
    assert_eq!(client.request(&body).status, Status::Ok);

    let expected: Vec<String> = lines.iter().take(8).map(|l| l.chars().take(32).collect()).collect();
    assert!(wait_until(|| harness.recorder.frame_count() == 1));
    assert_eq!(harness.recorder.last_frame().unwrap(), frame_of(&expected.iter().map(String::as_str).collect::<Vec<_>>()));
}

#[test]
fn test_error_replies_keep_connection_open() {
    let harness = start();
    let mut client = Client::connect(harness.addr);

    assert_eq!(client.request(r#"{"command":"bogus"}"#), Reply::error("invalid command 'bogus'"));
    assert_eq!(client.request(r#"{"option":{}}"#), Reply::error("invalid command"));
    assert_eq!(
        client.request(r#"{"command":"display"}"#),
        Reply::error("'message' option not found for 'display' command")
    );
    let malformed = client.request("{not json");
    assert_eq!(malformed.status, Status::Error);
    assert!(malformed.message.starts_with("malformed request"));

    assert_eq!(client.request(r#"{"command":"ping"}"#), Reply::ok("responding to a ping"));
    assert_eq!(harness.recorder.frame_count(), 0);
}

#[test]
fn test_clear_after_display() {
    let harness = start();
    let mut client = Client::connect(harness.addr);

    client.request(r#"{"command":"display","option":{"message":["a","b","c"]}}"#);
    assert!(wait_until(|| harness.recorder.frame_count() == 1));

    assert_eq!(client.request(r#"{"command":"clear"}"#), Reply::ok("Display cleared"));
    assert_eq!(harness.recorder.clear_count(), 2);
    assert!(harness.handle.pending().is_empty());
    assert!(!harness.handle.is_dirty());
}

#[test]
fn test_stop_then_display_is_never_rendered() {
    let harness = start();
    let mut client = Client::connect(harness.addr);

    assert_eq!(client.request(r#"{"command":"stop"}"#), Reply::ok("Display server thread stopped"));
    assert!(wait_until(|| !harness.handle.is_running()));
    assert!(harness.recorder.is_released());

    let reply = client.request(r#"{"command":"display","option":{"message":"late"}}"#);
    assert_eq!(reply, Reply::ok("Message displayed"));
    thread::sleep(Duration::from_millis(200));
    assert_eq!(harness.recorder.frame_count(), 0);

    assert_eq!(client.request(r#"{"command":"ping"}"#), Reply::ok("responding to a ping"));
}

#[test]
fn test_next_client_is_served_after_disconnect() {
    let harness = start();

    let mut first = Client::connect(harness.addr);
    assert!(first.request(r#"{"command":"ping"}"#).is_ok());
    drop(first);

    let mut second = Client::connect(harness.addr);
    assert!(second.request(r#"{"command":"ping"}"#).is_ok());
}

#[test]
fn test_idle_client_does_not_block_second_client() {
    let harness = start();

    // Connected, half a request written, then silence
    let mut idle = TcpStream::connect(harness.addr).unwrap();
    idle.write_all(br#"{"command":"#).unwrap();

    let mut active = Client::connect(harness.addr);
    assert!(active.request(r#"{"command":"ping"}"#).is_ok());
    let reply = active.request(r#"{"command":"display","option":{"message":"still here"}}"#);
    assert_eq!(reply, Reply::ok("Message displayed"));
    assert!(wait_until(|| harness.recorder.frame_count() == 1));
}

#[test]
fn test_oversized_request_is_rejected() {
    let harness = start_with(TcpOptions {
        max_request_bytes: 256,
        ..TcpOptions::default()
    });
    let mut client = Client::connect(harness.addr);

    let message = "x".repeat(1000);
    let body = serde_json::json!({"command": "display", "option": {"message": message}}).to_string();
    assert_eq!(client.request(&body), Reply::error("malformed request: request larger than 256 bytes"));
    assert_eq!(client.request(r#"{"command":"ping"}"#), Reply::ok("responding to a ping"));
    assert!(harness.handle.pending().is_empty());
}
