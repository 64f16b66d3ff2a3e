//! Command server: the synchronous request/reply loop.
//!
//! Reads one request, turns it into at most one render worker call, answers,
//! and only then reads the next. Nothing here renders or waits for a render;
//! `display` returns as soon as the lines are in the mailbox.
//!
//! Every request gets exactly one reply, errors included, and the loop keeps
//! going after `stop`: only the render worker stops.

use std::thread;

use log::{debug, error, info, warn};

use crate::config::ACCEPT_BACKOFF;
use crate::protocol::{
    Command,
    DISPLAY_CLEARED,
    MESSAGE_DISPLAYED,
    PING_RESPONSE,
    ProtocolError,
    Reply,
    WORKER_STOPPED,
};
use crate::tasks::RenderHandle;
use crate::transport::{Transport, TransportError};

pub struct CommandServer<T> {
    transport: T,
    render: RenderHandle,
}

impl<T: Transport> CommandServer<T> {
    pub const fn new(
        transport: T,
        render: RenderHandle,
    ) -> Self {
        Self { transport, render }
    }

    /// Serve until the transport fails for good.
    pub fn run(&mut self) -> Result<(), TransportError> {
        info!("Command server ready");
        loop {
            if let Err(e) = self.serve_one() {
                if e.is_fatal() {
                    return Err(e);
                }
                warn!("{e}");
                thread::sleep(ACCEPT_BACKOFF);
            }
        }
    }

    /// Handle exactly one request/reply exchange.
    pub fn serve_one(&mut self) -> Result<(), TransportError> {
        let reply = match self.transport.recv() {
            Ok(request) => handle_request(&self.render, &request),
            Err(e @ TransportError::TooLarge { .. }) => {
                warn!("Rejected request: {e}");
                ProtocolError::Malformed(e.to_string()).into()
            }
            Err(e) => return Err(e),
        };
        self.transport.send(&reply.to_bytes())
    }

    pub fn into_transport(self) -> T { self.transport }
}

/// Decode a raw request and dispatch it.
pub fn handle_request(
    render: &RenderHandle,
    request: &[u8],
) -> Reply {
    match Command::from_slice(request) {
        Ok(command) => {
            debug!("Command '{}'", command.name());
            dispatch(render, command)
        }
        Err(e) => {
            warn!("Rejected request: {e}");
            e.into()
        }
    }
}

/// Carry out a parsed command.
pub fn dispatch(
    render: &RenderHandle,
    command: Command,
) -> Reply {
    match command {
        Command::Display(lines) => {
            render.submit(lines);
            Reply::ok(MESSAGE_DISPLAYED)
        }
        Command::Clear => {
            if let Err(e) = render.request_clear() {
                error!("Display clear failed: {e}");
            }
            Reply::ok(DISPLAY_CLEARED)
        }
        Command::Stop => {
            render.request_stop();
            info!("Render worker stop requested by client");
            Reply::ok(WORKER_STOPPED)
        }
        Command::Ping => Reply::ok(PING_RESPONSE),
        Command::Unknown(name) => {
            warn!("Unknown command '{name}'");
            Reply::invalid_command(&name)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
