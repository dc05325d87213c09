//! Unified error types for the MakeSense monitor.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! service layer's error handling uniform.  Malformed notification text is
//! deliberately *not* represented here: the decoder turns it into a status
//! message instead of failing.

use core::fmt;

use crate::protocol::ChannelId;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the client funnels into this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The wireless transport failed.
    Transport(TransportError),
    /// A link request was made in a state that does not allow it.
    Link(LinkError),
    /// Configuration is invalid or could not be parsed.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Link(e) => write!(f, "link: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

/// Failures reported by a [`Transport`](crate::app::ports::Transport).
///
/// All of them are recoverable by retrying `connect()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// No device matching the filter was found.
    DeviceNotFound,
    /// The user dismissed the device chooser.
    Cancelled,
    /// GATT connection could not be established.
    ConnectFailed,
    /// The primary service is not exposed by the device.
    ServiceNotFound,
    /// A required characteristic is missing.
    CharacteristicNotFound(ChannelId),
    /// Starting notifications on the status channel failed.
    NotifyFailed,
    /// Writing a command byte failed.
    WriteFailed,
    /// The link dropped while an operation was in flight.
    LinkLost,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeviceNotFound => write!(f, "no matching device found"),
            Self::Cancelled => write!(f, "device selection cancelled"),
            Self::ConnectFailed => write!(f, "GATT connect failed"),
            Self::ServiceNotFound => write!(f, "primary service not found"),
            Self::CharacteristicNotFound(id) => {
                write!(f, "characteristic {} not found", crate::protocol::format_uuid(*id))
            }
            Self::NotifyFailed => write!(f, "failed to start notifications"),
            Self::WriteFailed => write!(f, "command write failed"),
            Self::LinkLost => write!(f, "link lost"),
        }
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

// ---------------------------------------------------------------------------
// Link errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// A command was issued while the link is down.
    NotConnected,
    /// A connect is already in flight, or the link is already up.
    Busy,
    /// The connect attempt was overtaken by an explicit disconnect.
    Superseded,
    /// The transport failed during the request.
    Transport(TransportError),
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "not connected"),
            Self::Busy => write!(f, "link is transitioning"),
            Self::Superseded => write!(f, "connect superseded by disconnect"),
            Self::Transport(e) => write!(f, "{e}"),
        }
    }
}

impl From<TransportError> for LinkError {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

impl From<LinkError> for Error {
    fn from(e: LinkError) -> Self {
        match e {
            LinkError::Transport(t) => Self::Transport(t),
            other => Self::Link(other),
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// The configuration document could not be parsed.
    Parse(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
            Self::Parse(msg) => write!(f, "parse error: {msg}"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
