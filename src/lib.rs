//! OLED display server library.
//!
//! Clients send short JSON commands (`display`, `clear`, `stop`, `ping`) over a
//! request/reply channel; a dedicated render worker draws the requested lines
//! onto a slow 128x64 monochrome panel. The binary (`main.rs`) wires these
//! modules together; everything here is testable on the host with
//! [`device::RecordingDisplay`] standing in for real hardware.
//!
//! # Threads
//!
//! ```text
//! main thread                         render-worker thread
//! CommandServer ── submit ──> Mailbox ──> Renderer ──> DisplayDevice
//!               ── clear ───────────────────────────>  (device lock)
//! ```

// Crate-level lints
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]

// Configuration
pub mod config;
pub mod error;

// Rendering
pub mod device;
pub mod framebuffer;
pub mod render;
pub mod styles;

// Worker and coordination
pub mod mailbox;
pub mod profiling;
pub mod tasks;

// Serving
pub mod protocol;
pub mod server;
pub mod transport;

pub use error::{Error, Result};
