//! Display, layout and timing constants.
//!
//! The panel is an SSD1306-class 128x64 monochrome OLED. Text layout is fixed:
//! at most [`MAX_LINES`] lines, each at most [`LINE_WIDTH`] characters. Anything
//! beyond either limit is dropped without error.

use std::time::Duration;

// =============================================================================
// Display Configuration
// =============================================================================

/// Display width in pixels (SSD1306 128x64).
pub const SCREEN_WIDTH: u32 = 128;

/// Display height in pixels.
pub const SCREEN_HEIGHT: u32 = 64;

/// Rows of pixels packed into one framebuffer byte (SSD1306 page layout).
pub const PAGE_HEIGHT: u32 = 8;

/// Largest configurable panel width or height in pixels.
pub const MAX_DISPLAY_DIMENSION: u32 = 1024;

// =============================================================================
// Text Layout
// =============================================================================

/// Maximum number of lines laid out per render pass. Lines past this are dropped.
pub const MAX_LINES: usize = 8;

/// Maximum characters per line, counted in `char`s rather than pixels.
pub const LINE_WIDTH: usize = 32;

/// Byte capacity of one laid-out line. A `char` is at most 4 bytes of UTF-8,
/// so a full line of [`LINE_WIDTH`] characters always fits.
pub const LINE_CAPACITY: usize = LINE_WIDTH * 4;

// =============================================================================
// Timing Configuration
// =============================================================================

/// Bounded wait of the render worker. The stop flag is re-checked at least this often.
pub const WAKE_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Pause after a non-fatal transport error before accepting again.
pub const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

// =============================================================================
// Network Defaults
// =============================================================================

/// Default listen address. The server is meant for local clients only.
pub const DEFAULT_BIND: &str = "127.0.0.1";

/// Default TCP port of the display server.
pub const DEFAULT_PORT: u16 = 10010;

/// A TCP client that sends nothing for this long is disconnected.
pub const CLIENT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Largest accepted request body. Longer requests get a `malformed request` reply.
pub const MAX_REQUEST_BYTES: usize = 64 * 1024;
