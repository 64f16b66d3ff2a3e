//! Application configuration.
//!
//! - `layout`: Display dimensions, text layout limits and timing constants
//! - `file`: Runtime settings loaded from TOML and overridden from the CLI

pub mod file;
pub mod layout;

// Re-export layout constants at config level for convenience
pub use file::{
    ConfigError,
    DeviceKind,
    DeviceSettings,
    DisplaySettings,
    ServerSettings,
    Settings,
    TransportKind,
    WorkerSettings,
};
pub use layout::{
    ACCEPT_BACKOFF,
    CLIENT_IDLE_TIMEOUT,
    DEFAULT_BIND,
    DEFAULT_PORT,
    LINE_CAPACITY,
    LINE_WIDTH,
    MAX_DISPLAY_DIMENSION,
    MAX_LINES,
    MAX_REQUEST_BYTES,
    PAGE_HEIGHT,
    SCREEN_HEIGHT,
    SCREEN_WIDTH,
    WAKE_POLL_INTERVAL,
};
