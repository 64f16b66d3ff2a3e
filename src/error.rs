//! Top-level error type for startup and the serve loop.
//!
//! Request-level problems never surface here: they become error replies
//! (see [`crate::protocol::ProtocolError`]). These errors end the process.

use thiserror::Error;

use crate::config::ConfigError;
use crate::device::DeviceError;
use crate::transport::TransportError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("display device: {0}")]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("cannot start render worker thread: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    #[error("cannot install interrupt handler: {0}")]
    Signal(#[from] ctrlc::Error),
}

pub type Result<T> = core::result::Result<T, Error>;
