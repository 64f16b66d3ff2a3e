//! Runtime settings.
//!
//! Loaded from an optional TOML file; every key has a default, so an empty
//! file (or no file at all) gives a server on `127.0.0.1:10010` driving the
//! console display.
//!
//! ```toml
//! [server]
//! transport = "tcp"
//! bind = "127.0.0.1"
//! port = 10010
//! idle_timeout_ms = 60000
//! greeting = true
//!
//! [display]
//! width = 128
//! height = 64
//! font = "5x8"
//!
//! [device]
//! kind = "png"
//! output_dir = "frames"
//! keep_history = false
//! latency_ms = 0
//!
//! [worker]
//! wake_poll_ms = 500
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use embedded_graphics::prelude::Size;
use serde::Deserialize;
use thiserror::Error;

use super::layout::{
    CLIENT_IDLE_TIMEOUT,
    DEFAULT_BIND,
    DEFAULT_PORT,
    MAX_DISPLAY_DIMENSION,
    SCREEN_HEIGHT,
    SCREEN_WIDTH,
    WAKE_POLL_INTERVAL,
};
use crate::styles::FontChoice;

/// Errors while loading or validating settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// =============================================================================
// Sections
// =============================================================================

/// All runtime settings.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub server: ServerSettings,
    pub display: DisplaySettings,
    pub device: DeviceSettings,
    pub worker: WorkerSettings,
}

/// `[server]`: where to listen.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSettings {
    pub transport: TransportKind,
    pub bind: String,
    pub port: u16,
    /// TCP only: disconnect a silent client after this long. 0 keeps it forever.
    pub idle_timeout_ms: u64,
    /// Show the "Waiting for a client" screen at startup.
    pub greeting: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            transport: TransportKind::default(),
            bind: DEFAULT_BIND.to_owned(),
            port: DEFAULT_PORT,
            idle_timeout_ms: CLIENT_IDLE_TIMEOUT.as_millis() as u64,
            greeting: true,
        }
    }
}

/// `[display]`: panel geometry and font.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct DisplaySettings {
    pub width: u32,
    pub height: u32,
    pub font: FontChoice,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            width: SCREEN_WIDTH,
            height: SCREEN_HEIGHT,
            font: FontChoice::default(),
        }
    }
}

/// `[device]`: which display backend to drive.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct DeviceSettings {
    pub kind: DeviceKind,
    /// Where the PNG device writes its frames.
    pub output_dir: PathBuf,
    /// PNG device: keep every frame as a numbered file.
    pub keep_history: bool,
    /// Artificial bus latency added to every push and clear.
    pub latency_ms: u64,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            kind: DeviceKind::default(),
            output_dir: PathBuf::from("frames"),
            keep_history: false,
            latency_ms: 0,
        }
    }
}

/// `[worker]`: render worker timing.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct WorkerSettings {
    pub wake_poll_ms: u64,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            wake_poll_ms: WAKE_POLL_INTERVAL.as_millis() as u64,
        }
    }
}

/// Display backends.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// Text art on stdout.
    #[default]
    Console,
    /// PNG files written by the headless simulator display.
    Png,
}

impl fmt::Display for DeviceKind {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(match self {
            Self::Console => "console",
            Self::Png => "png",
        })
    }
}

impl FromStr for DeviceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "console" => Ok(Self::Console),
            "png" => Ok(Self::Png),
            other => Err(format!("unknown device '{other}' (expected console or png)")),
        }
    }
}

/// Request/reply channels.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Newline-delimited JSON over plain TCP.
    #[default]
    Tcp,
    /// ZeroMQ REP socket (needs the `zmq` feature).
    Zmq,
}

impl TransportKind {
    /// True if this build can serve the transport.
    pub const fn is_available(self) -> bool {
        match self {
            Self::Tcp => true,
            Self::Zmq => cfg!(feature = "zmq"),
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(match self {
            Self::Tcp => "tcp",
            Self::Zmq => "zmq",
        })
    }
}

impl FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tcp" => Ok(Self::Tcp),
            "zmq" => Ok(Self::Zmq),
            other => Err(format!("unknown transport '{other}' (expected tcp or zmq)")),
        }
    }
}

// =============================================================================
// Loading
// =============================================================================

impl Settings {
    /// Read and validate a TOML settings file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Parse and validate settings from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let settings: Self = toml::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker.wake_poll_ms == 0 {
            return Err(ConfigError::Invalid("worker.wake_poll_ms must be greater than zero".into()));
        }

        if self.display.width > MAX_DISPLAY_DIMENSION || self.display.height > MAX_DISPLAY_DIMENSION {
            return Err(ConfigError::Invalid(format!(
                "display {}x{} is larger than {MAX_DISPLAY_DIMENSION}x{MAX_DISPLAY_DIMENSION}",
                self.display.width, self.display.height
            )));
        }

        let glyph = self.display.font.glyph_height();
        if self.display.width == 0 || self.display.height < glyph {
            return Err(ConfigError::Invalid(format!(
                "display {}x{} cannot fit one line of the {} font",
                self.display.width, self.display.height, self.display.font
            )));
        }

        if self.server.bind.trim().is_empty() {
            return Err(ConfigError::Invalid("server.bind must not be empty".into()));
        }

        if !self.server.transport.is_available() {
            return Err(ConfigError::Invalid(format!(
                "transport '{}' is not compiled in (build with --features zmq)",
                self.server.transport
            )));
        }

        Ok(())
    }

    /// Render worker wake-poll interval.
    pub fn wake_poll(&self) -> Duration { Duration::from_millis(self.worker.wake_poll_ms) }

    /// `host:port` to listen on.
    pub fn bind_addr(&self) -> String { format!("{}:{}", self.server.bind, self.server.port) }

    /// ZeroMQ endpoint to bind, `tcp://host:port`.
    pub fn zmq_endpoint(&self) -> String { format!("tcp://{}", self.bind_addr()) }

    /// Idle limit for TCP clients, `None` when disabled.
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.server.idle_timeout_ms > 0).then(|| Duration::from_millis(self.server.idle_timeout_ms))
    }

    /// Panel size in pixels.
    pub const fn size(&self) -> Size { Size::new(self.display.width, self.display.height) }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let settings = Settings::from_toml_str("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.bind_addr(), "127.0.0.1:10010");
        assert_eq!(settings.wake_poll(), Duration::from_millis(500));
        assert_eq!(settings.size(), Size::new(128, 64));
        assert_eq!(settings.device.kind, DeviceKind::Console);
        assert_eq!(settings.server.transport, TransportKind::Tcp);
        assert_eq!(settings.idle_timeout(), Some(Duration::from_secs(60)));
        assert_eq!(settings.zmq_endpoint(), "tcp://127.0.0.1:10010");
        assert!(settings.server.greeting);
    }

    #[test]
    fn test_partial_sections() {
        let settings = Settings::from_toml_str(
            r#"
            [server]
            port = 5555

            [display]
            font = "profont7"

            [device]
            kind = "png"
            output_dir = "/tmp/oled"
            "#,
        )
        .unwrap();

        assert_eq!(settings.server.port, 5555);
        assert_eq!(settings.server.bind, "127.0.0.1");
        assert_eq!(settings.display.font, FontChoice::ProFont7);
        assert_eq!(settings.device.kind, DeviceKind::Png);
        assert_eq!(settings.device.output_dir, PathBuf::from("/tmp/oled"));
        assert_eq!(settings.device.latency_ms, 0);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = Settings::from_toml_str("[server]\nprot = 1\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_zero_wake_poll_rejected() {
        let err = Settings::from_toml_str("[worker]\nwake_poll_ms = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_display_too_small_rejected() {
        let err = Settings::from_toml_str("[display]\nheight = 4\n").unwrap_err();
        assert!(err.to_string().contains("cannot fit"));
    }

    #[test]
    fn test_oversized_display_rejected() {
        let err = Settings::from_toml_str("[display]\nwidth = 100000\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(err.to_string().contains("larger than"));

        let err = Settings::from_toml_str("[display]\nheight = 4294967295\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let settings = Settings::from_toml_str("[display]\nwidth = 1024\nheight = 1024\n").unwrap();
        assert_eq!(settings.size(), Size::new(1024, 1024));
    }

    #[test]
    fn test_zero_idle_timeout_disables_it() {
        let settings = Settings::from_toml_str("[server]\nidle_timeout_ms = 0\n").unwrap();
        assert_eq!(settings.idle_timeout(), None);
    }

    #[test]
    fn test_transport_kind() {
        assert_eq!("ZMQ".parse::<TransportKind>(), Ok(TransportKind::Zmq));
        assert!("ipc".parse::<TransportKind>().is_err());
        assert!(TransportKind::Tcp.is_available());

        let result = Settings::from_toml_str("[server]\ntransport = \"zmq\"\n");
        assert_eq!(result.is_ok(), cfg!(feature = "zmq"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("display.toml");
        fs::write(&path, "[worker]\nwake_poll_ms = 50\n").unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.wake_poll(), Duration::from_millis(50));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_device_kind_from_str() {
        assert_eq!("PNG".parse::<DeviceKind>(), Ok(DeviceKind::Png));
        assert_eq!("console".parse::<DeviceKind>(), Ok(DeviceKind::Console));
        assert!("null".parse::<DeviceKind>().is_err());
        assert_eq!(DeviceKind::Png.to_string(), "png");
    }
}
