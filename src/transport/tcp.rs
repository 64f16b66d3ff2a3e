//! Newline-delimited JSON over TCP.
//!
//! ```text
//! client -> {"command":"ping"}\n
//! server <- {"message":"responding to a ping","status":"ok"}\n
//! ```
//!
//! An acceptor thread hands every connection to its own reader thread. A reader
//! parks each complete line in a shared queue together with a reply slot and
//! waits for the answer before reading the client's next line. The server side
//! ([`TcpTransport`]) drains that queue one request at a time, the way a
//! ZeroMQ REP socket would.
//!
//! Per connection limits:
//! - a line longer than [`TcpOptions::max_request_bytes`] is skipped and
//!   answered with an error
//! - a client that sends nothing for [`TcpOptions::idle_timeout`] is dropped

use std::io::{self, BufRead, BufReader, ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};

use super::{Transport, TransportError};
use crate::config::{ACCEPT_BACKOFF, CLIENT_IDLE_TIMEOUT, MAX_REQUEST_BYTES};

/// Connection limits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TcpOptions {
    /// Drop a client after this much silence. `None` waits forever.
    pub idle_timeout: Option<Duration>,
    /// Longest accepted request line, newline excluded.
    pub max_request_bytes: usize,
}

impl Default for TcpOptions {
    fn default() -> Self {
        Self {
            idle_timeout: Some(CLIENT_IDLE_TIMEOUT),
            max_request_bytes: MAX_REQUEST_BYTES,
        }
    }
}

/// One queued request. `body` is `None` when the line was over the limit.
struct Request {
    peer: SocketAddr,
    body: Option<Vec<u8>>,
    reply: Sender<Vec<u8>>,
}

/// Server end of the TCP transport.
pub struct TcpTransport {
    local_addr: SocketAddr,
    options: TcpOptions,
    requests: Receiver<Request>,
    pending: Option<Sender<Vec<u8>>>,
}

impl TcpTransport {
    /// Listen on `addr` (`host:port`; port 0 picks a free one).
    ///
    /// The acceptor thread lives for the rest of the process.
    pub fn bind(
        addr: &str,
        options: TcpOptions,
    ) -> Result<Self, TransportError> {
        let bind_error = |source| TransportError::Bind {
            addr: addr.to_owned(),
            source,
        };
        let listener = TcpListener::bind(addr).map_err(bind_error)?;
        let local_addr = listener.local_addr().map_err(bind_error)?;

        let (queue, requests) = mpsc::channel();
        thread::Builder::new()
            .name("tcp-accept".into())
            .spawn(move || accept_loop(&listener, &queue, options))
            .map_err(bind_error)?;

        Ok(Self {
            local_addr,
            options,
            requests,
            pending: None,
        })
    }

    /// Address actually bound.
    pub const fn local_addr(&self) -> SocketAddr { self.local_addr }
}

impl Transport for TcpTransport {
    fn recv(&mut self) -> Result<Vec<u8>, TransportError> {
        let request = self.requests.recv().map_err(|_| TransportError::Closed)?;
        self.pending = Some(request.reply);

        match request.body {
            Some(body) => {
                debug!("Request from {}: {} bytes", request.peer, body.len());
                Ok(body)
            }
            None => Err(TransportError::TooLarge {
                limit: self.options.max_request_bytes,
            }),
        }
    }

    fn send(
        &mut self,
        reply: &[u8],
    ) -> Result<(), TransportError> {
        let pending = self.pending.take().ok_or(TransportError::NoPeer)?;
        pending.send(reply.to_vec()).map_err(|_| TransportError::NoPeer)
    }
}

// =============================================================================
// Connection threads
// =============================================================================

fn accept_loop(
    listener: &TcpListener,
    queue: &Sender<Request>,
    options: TcpOptions,
) {
    for stream in listener.incoming() {
        match stream {
            Ok(stream) => spawn_connection(stream, queue.clone(), options),
            Err(e) => {
                warn!("Accepting a connection failed: {e}");
                thread::sleep(ACCEPT_BACKOFF);
            }
        }
    }
}

fn spawn_connection(
    stream: TcpStream,
    queue: Sender<Request>,
    options: TcpOptions,
) {
    let peer = match stream.peer_addr() {
        Ok(peer) => peer,
        Err(e) => {
            warn!("Dropping connection without peer address: {e}");
            return;
        }
    };
    if let Err(e) = stream.set_read_timeout(options.idle_timeout) {
        warn!("Cannot set idle timeout for {peer}: {e}");
    }
    stream.set_nodelay(true).ok();

    let spawned = thread::Builder::new()
        .name(format!("client-{peer}"))
        .spawn(move || serve_connection(stream, peer, &queue, options));
    if let Err(e) = spawned {
        warn!("Cannot start a thread for {peer}: {e}");
    }
}

/// What the next line of a connection turned out to be.
#[derive(Debug, PartialEq, Eq)]
enum Frame {
    Request(Vec<u8>),
    TooLarge,
    Closed,
}

fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    queue: &Sender<Request>,
    options: TcpOptions,
) {
    let mut writer = match stream.try_clone() {
        Ok(writer) => writer,
        Err(e) => {
            warn!("Cannot use connection from {peer}: {e}");
            return;
        }
    };
    let mut reader = BufReader::new(stream);
    info!("Client connected from {peer}");

    loop {
        let body = match read_frame(&mut reader, options.max_request_bytes) {
            Ok(Frame::Request(body)) => Some(body),
            Ok(Frame::TooLarge) => None,
            Ok(Frame::Closed) => break,
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                info!("Client {peer} idle, closing");
                break;
            }
            Err(e) => {
                warn!("Connection to {peer} failed: {e}");
                break;
            }
        };

        let (reply, answer) = mpsc::channel();
        if queue.send(Request { peer, body, reply }).is_err() {
            break;
        }
        let Ok(answer) = answer.recv() else {
            break;
        };

        let written = writer
            .write_all(&answer)
            .and_then(|()| writer.write_all(b"\n"))
            .and_then(|()| writer.flush());
        if let Err(e) = written {
            warn!("Reply to {peer} not delivered: {e}");
            break;
        }
    }

    info!("Client {peer} disconnected");
}

/// Read the next non-blank line, at most `limit` bytes long.
///
/// An oversized line is consumed up to its newline and reported as
/// [`Frame::TooLarge`].
fn read_frame<R: BufRead>(
    reader: &mut R,
    limit: usize,
) -> io::Result<Frame> {
    loop {
        let mut line = Vec::new();
        let read = reader
            .by_ref()
            .take(limit as u64 + 1)
            .read_until(b'\n', &mut line)?;
        if read == 0 {
            return Ok(Frame::Closed);
        }

        if line.last() != Some(&b'\n') && line.len() > limit {
            reader.skip_until(b'\n')?;
            return Ok(Frame::TooLarge);
        }

        while line.last().is_some_and(|b| matches!(b, b'\n' | b'\r')) {
            line.pop();
        }
        if !line.iter().all(u8::is_ascii_whitespace) {
            return Ok(Frame::Request(line));
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
