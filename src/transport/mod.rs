//! Request/reply channels.
//!
//! The server only needs "give me the next request" and "send this reply", in
//! strict alternation. Implementations:
//!
//! - [`TcpTransport`]: newline-delimited JSON over TCP, any number of clients
//! - `ZmqTransport`: ZeroMQ REP socket (`zmq` feature)
//!
//! Both queue requests from every connected client and hand them to the
//! server one at a time, so a silent client never holds up the others.

mod tcp;
#[cfg(feature = "zmq")]
mod zeromq;

use std::io;

use thiserror::Error;

pub use tcp::{TcpOptions, TcpTransport};
#[cfg(feature = "zmq")]
pub use zeromq::ZmqTransport;

/// Transport failures. Only [`TransportError::is_fatal`] ones stop the server.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("cannot listen on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[cfg(feature = "zmq")]
    #[error("cannot bind ZeroMQ socket to {endpoint}: {source}")]
    ZmqBind {
        endpoint: String,
        #[source]
        source: ::zmq::Error,
    },

    #[cfg(feature = "zmq")]
    #[error("ZeroMQ socket error: {0}")]
    Zmq(#[from] ::zmq::Error),

    /// The request was cut off at the size limit. It still needs a reply.
    #[error("request larger than {limit} bytes")]
    TooLarge { limit: usize },

    #[error("no client is waiting for a reply")]
    NoPeer,

    #[error("transport closed")]
    Closed,
}

impl TransportError {
    /// True if the transport cannot be used any more.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Bind { .. } | Self::Closed => true,
            #[cfg(feature = "zmq")]
            Self::ZmqBind { .. } => true,
            #[cfg(feature = "zmq")]
            Self::Zmq(e) => matches!(e, ::zmq::Error::ETERM),
            Self::TooLarge { .. } | Self::NoPeer => false,
        }
    }
}

/// Strictly alternating request/reply channel.
pub trait Transport {
    /// Block until the next request arrives and return its body.
    ///
    /// [`TransportError::TooLarge`] still expects a [`Transport::send`].
    fn recv(&mut self) -> Result<Vec<u8>, TransportError>;

    /// Answer the request returned by the last [`Transport::recv`].
    fn send(
        &mut self,
        reply: &[u8],
    ) -> Result<(), TransportError>;
}
