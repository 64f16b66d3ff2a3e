//! Wire protocol: JSON requests in, JSON replies out.
//!
//! # Requests
//!
//! ```json
//! {"command": "display", "option": {"message": ["line 1", "line 2"]}}
//! {"command": "display", "option": {"message": "line 1\nline 2"}}
//! {"command": "clear"}
//! {"command": "stop"}
//! {"command": "ping"}
//! ```
//!
//! Unknown extra fields are ignored.
//!
//! # Replies
//!
//! ```json
//! {"status": "ok", "message": "Message displayed"}
//! {"status": "error", "message": "invalid command 'bogus'"}
//! ```

use std::fmt;

use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;

// =============================================================================
// Reply Messages
// =============================================================================

pub const MESSAGE_DISPLAYED: &str = "Message displayed";
pub const DISPLAY_CLEARED: &str = "Display cleared";
pub const WORKER_STOPPED: &str = "Display server thread stopped";
pub const PING_RESPONSE: &str = "responding to a ping";

// =============================================================================
// Commands
// =============================================================================

/// A parsed request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Show these lines, replacing whatever was requested before.
    Display(Vec<String>),
    Clear,
    Stop,
    Ping,
    /// Well-formed request naming a command the server does not know.
    Unknown(String),
}

/// Request problems. The `Display` text is the reply message sent to the client.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("malformed request: {0}")]
    Malformed(String),

    #[error("invalid command")]
    MissingCommand,

    #[error("'message' option not found for 'display' command")]
    MissingMessage,
}

impl Command {
    /// Parse a raw request body.
    pub fn from_slice(request: &[u8]) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_slice(request).map_err(|e| ProtocolError::Malformed(e.to_string()))?;
        Self::parse(&value)
    }

    /// Parse a decoded request object.
    ///
    /// A request that is not an object, or has no `command` key, is a
    /// [`ProtocolError::MissingCommand`]. A non-string command is named by its
    /// JSON text.
    pub fn parse(request: &Value) -> Result<Self, ProtocolError> {
        let name = match request.get("command") {
            None => return Err(ProtocolError::MissingCommand),
            Some(Value::String(name)) => name.clone(),
            Some(other) => other.to_string(),
        };

        Ok(match name.as_str() {
            "display" => {
                let message = request
                    .get("option")
                    .and_then(|option| option.get("message"))
                    // An explicit null is treated as no message
                    .filter(|message| !message.is_null())
                    .ok_or(ProtocolError::MissingMessage)?;
                Self::Display(message_lines(message))
            }
            "clear" => Self::Clear,
            "stop" => Self::Stop,
            "ping" => Self::Ping,
            _ => Self::Unknown(name),
        })
    }

    /// Command name for logs.
    pub fn name(&self) -> &str {
        match self {
            Self::Display(_) => "display",
            Self::Clear => "clear",
            Self::Stop => "stop",
            Self::Ping => "ping",
            Self::Unknown(name) => name,
        }
    }
}

/// Turn `option.message` into display lines.
///
/// A list is taken element by element. Anything else becomes one string that
/// is split on newlines.
fn message_lines(message: &Value) -> Vec<String> {
    match message {
        Value::Array(items) => items.iter().map(value_text).collect(),
        other => value_text(other).split('\n').map(str::to_owned).collect(),
    }
}

/// Strings verbatim, every other value as its JSON text.
fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

// =============================================================================
// Replies
// =============================================================================

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Error,
}

impl Status {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
        }
    }
}

/// Exactly one per request.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct Reply {
    pub status: Status,
    pub message: String,
}

impl Reply {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: Status::Ok,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            message: message.into(),
        }
    }

    /// Reply for a command name the server does not know.
    pub fn invalid_command(name: &str) -> Self { Self::error(format!("invalid command '{name}'")) }

    #[inline]
    pub const fn is_ok(&self) -> bool { matches!(self.status, Status::Ok) }

    /// Encoded reply body.
    pub fn to_bytes(&self) -> Vec<u8> { self.to_string().into_bytes() }
}

impl From<ProtocolError> for Reply {
    fn from(err: ProtocolError) -> Self { Self::error(err.to_string()) }
}

impl fmt::Display for Reply {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let body = json!({
            "status": self.status.as_str(),
            "message": self.message,
        });
        write!(f, "{body}")
    }
}

// =============================================================================
// Tests
// =============================================================================
