//! Display device abstraction.
//!
//! The render worker drives the panel only through [`DisplayDevice`]. Calls
//! are synchronous and may be slow (a real I2C/SPI panel takes tens to
//! hundreds of milliseconds per frame), which is why only the worker thread
//! and the clear path ever touch a device.
//!
//! Implementations:
//! - [`ConsoleDisplay`]: prints frames as text art on stdout
//! - [`PngDisplay`]: headless simulator display writing frames as PNG files
//! - [`RecordingDisplay`]: in-memory recorder with failure injection
//!
//! [`SlowBus`] wraps any device to add a fixed per-call bus latency.

mod console;
mod png;
mod recording;

use std::thread;
use std::time::Duration;

use embedded_graphics::prelude::{OriginDimensions, Size};
use thiserror::Error;

pub use console::ConsoleDisplay;
pub use png::PngDisplay;
pub use recording::RecordingDisplay;

use crate::config::{DeviceKind, DeviceSettings};
use crate::framebuffer::Framebuffer;

/// Errors reported by a display device.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("display initialization failed: {0}")]
    Init(String),

    #[error("display bus error: {0}")]
    Bus(String),

    #[error("frame is {actual_width}x{actual_height}, display is {width}x{height}")]
    FrameSize {
        width: u32,
        height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("display I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A slow, stateful monochrome display.
pub trait DisplayDevice: Send {
    /// Bring the panel up. Called exactly once, before any other call.
    fn initialize(&mut self) -> Result<(), DeviceError>;

    /// Push a complete frame to the panel.
    fn push_frame(
        &mut self,
        frame: &Framebuffer,
    ) -> Result<(), DeviceError>;

    /// Blank the panel.
    fn clear(&mut self) -> Result<(), DeviceError>;

    /// Release the panel on shutdown. Best effort.
    fn release(&mut self) -> Result<(), DeviceError> { Ok(()) }
}

impl<D: DisplayDevice + ?Sized> DisplayDevice for Box<D> {
    fn initialize(&mut self) -> Result<(), DeviceError> { (**self).initialize() }

    fn push_frame(
        &mut self,
        frame: &Framebuffer,
    ) -> Result<(), DeviceError> {
        (**self).push_frame(frame)
    }

    fn clear(&mut self) -> Result<(), DeviceError> { (**self).clear() }

    fn release(&mut self) -> Result<(), DeviceError> { (**self).release() }
}

/// Reject frames whose size does not match the panel.
pub(crate) fn check_frame_size(
    expected: Size,
    frame: &Framebuffer,
) -> Result<(), DeviceError> {
    let actual = frame.size();
    if actual == expected {
        return Ok(());
    }
    Err(DeviceError::FrameSize {
        width: expected.width,
        height: expected.height,
        actual_width: actual.width,
        actual_height: actual.height,
    })
}

// =============================================================================
// Bus latency
// =============================================================================

/// Adds a fixed delay before every frame push and clear.
pub struct SlowBus<D> {
    inner: D,
    latency: Duration,
}

impl<D> SlowBus<D> {
    /// Wrap `inner`, delaying each bus transfer by `latency`.
    pub const fn new(
        inner: D,
        latency: Duration,
    ) -> Self {
        Self { inner, latency }
    }
}

impl<D: DisplayDevice> DisplayDevice for SlowBus<D> {
    fn initialize(&mut self) -> Result<(), DeviceError> { self.inner.initialize() }

    fn push_frame(
        &mut self,
        frame: &Framebuffer,
    ) -> Result<(), DeviceError> {
        thread::sleep(self.latency);
        self.inner.push_frame(frame)
    }

    fn clear(&mut self) -> Result<(), DeviceError> {
        thread::sleep(self.latency);
        self.inner.clear()
    }

    fn release(&mut self) -> Result<(), DeviceError> { self.inner.release() }
}

// =============================================================================
// Construction from settings
// =============================================================================

/// Build the configured device. It is not initialized yet; the worker does that.
pub fn open(
    settings: &DeviceSettings,
    size: Size,
) -> Box<dyn DisplayDevice> {
    let device: Box<dyn DisplayDevice> = match settings.kind {
        DeviceKind::Console => Box::new(ConsoleDisplay::stdout(size)),
        DeviceKind::Png => Box::new(PngDisplay::new(&settings.output_dir, size, settings.keep_history)),
    };

    if settings.latency_ms == 0 {
        device
    } else {
        Box::new(SlowBus::new(device, Duration::from_millis(settings.latency_ms)))
    }
}

// =============================================================================
// Tests
// =============================================================================
