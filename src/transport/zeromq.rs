//! ZeroMQ REP socket, for clients that speak ZeroMQ REQ.
//!
//! One message per request, one per reply. libzmq queues requests from every
//! connected peer and enforces the alternation, so this is a thin wrapper.
//! Oversized messages are dropped by libzmq itself (`ZMQ_MAXMSGSIZE`).

use log::{debug, info};

use super::{Transport, TransportError};

/// Server end of a ZeroMQ REQ/REP pair.
pub struct ZmqTransport {
    // Declared before the context so it closes first
    socket: zmq::Socket,
    _context: zmq::Context,
    endpoint: String,
}

impl ZmqTransport {
    /// Bind a REP socket to `endpoint`, e.g. `tcp://127.0.0.1:10010`.
    pub fn bind(
        endpoint: &str,
        max_request_bytes: usize,
    ) -> Result<Self, TransportError> {
        let bind_error = |source| TransportError::ZmqBind {
            endpoint: endpoint.to_owned(),
            source,
        };
        let context = zmq::Context::new();
        let socket = context.socket(zmq::REP).map_err(bind_error)?;
        socket
            .set_maxmsgsize(i64::try_from(max_request_bytes).unwrap_or(i64::MAX))
            .map_err(bind_error)?;
        socket.bind(endpoint).map_err(bind_error)?;

        let endpoint = match socket.get_last_endpoint() {
            Ok(Ok(bound)) => bound,
            _ => endpoint.to_owned(),
        };
        info!("ZeroMQ REP socket bound to {endpoint}");

        Ok(Self {
            socket,
            _context: context,
            endpoint,
        })
    }

    /// Endpoint actually bound (wildcard ports resolved).
    pub fn endpoint(&self) -> &str { &self.endpoint }
}

impl Transport for ZmqTransport {
    fn recv(&mut self) -> Result<Vec<u8>, TransportError> {
        loop {
            match self.socket.recv_bytes(0) {
                Ok(body) => {
                    debug!("Request: {} bytes", body.len());
                    return Ok(body);
                }
                // Interrupted by a signal; the handler decides whether we exit
                Err(zmq::Error::EINTR) => {}
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn send(
        &mut self,
        reply: &[u8],
    ) -> Result<(), TransportError> {
        self.socket.send(reply, 0)?;
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
