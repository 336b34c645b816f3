//! Unified error types for the observatory sequencer.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! top-level command dispatch uniform.  Scheduling tools that drive the
//! library match on the variant instead of scraping the log file.

use core::fmt;

use crate::fsm::IllegalTransition;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the sequencer funnels into this type.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// The name resolver has no object by this name.
    TargetNotFound(String),
    /// The altitude gate declined to proceed.
    LowAltitude { altitude_deg: f64 },
    /// A guider call failed or returned a non-OK status.
    Guiding(GuideError),
    /// The name resolver could not be reached or replied with garbage.
    Resolver(ResolverError),
    /// The device transport failed or a property went to `Alert`.
    Device(DeviceError),
    /// A device did not leave `Busy` within its timeout.
    Timeout {
        device: String,
        property: &'static str,
    },
    /// Filter identifier is not in the wheel table.
    UnknownFilter(String),
    /// Exposure plan failed validation.
    InvalidPlan(&'static str),
    /// Command name or parameters could not be mapped to an operation.
    Command(CommandError),
    /// Directory creation or image lookup failed.
    Filesystem(String),
    /// The cancellation token was tripped mid-sequence.
    Cancelled,
    /// The sequence engine asked for a phase change the table forbids.
    Phase(IllegalTransition),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TargetNotFound(name) => write!(f, "target not found: {name}"),
            Self::LowAltitude { altitude_deg } => {
                write!(f, "aborted, low altitude ({altitude_deg:.2} deg)")
            }
            Self::Guiding(e) => write!(f, "guiding: {e}"),
            Self::Resolver(e) => write!(f, "resolver: {e}"),
            Self::Device(e) => write!(f, "device: {e}"),
            Self::Timeout { device, property } => {
                write!(f, "timed out waiting for {device} {property}")
            }
            Self::UnknownFilter(id) => write!(f, "unknown filter: {id}"),
            Self::InvalidPlan(msg) => write!(f, "invalid plan: {msg}"),
            Self::Command(e) => write!(f, "command: {e}"),
            Self::Filesystem(msg) => write!(f, "filesystem: {msg}"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Phase(e) => write!(f, "sequence engine: {e}"),
        }
    }
}

impl std::error::Error for Error {}
impl std::error::Error for GuideError {}
impl std::error::Error for ResolverError {}
impl std::error::Error for DeviceError {}
impl std::error::Error for CommandError {}

impl From<IllegalTransition> for Error {
    fn from(e: IllegalTransition) -> Self {
        Self::Phase(e)
    }
}

// ---------------------------------------------------------------------------
// Guider errors
// ---------------------------------------------------------------------------

/// Which guider call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuideStage {
    EnableMultiStar,
    Start,
    Stop,
}

impl fmt::Display for GuideStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EnableMultiStar => write!(f, "enable multi-star"),
            Self::Start => write!(f, "start guiding"),
            Self::Stop => write!(f, "stop guiding"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuideError {
    /// The guider answered, but not with `OK`.
    Rejected { stage: GuideStage, status: String },
    /// The HTTP call itself failed.
    Transport { stage: GuideStage, message: String },
}

impl GuideError {
    pub fn stage(&self) -> GuideStage {
        match self {
            Self::Rejected { stage, .. } | Self::Transport { stage, .. } => *stage,
        }
    }
}

impl fmt::Display for GuideError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected { stage, status } => write!(f, "{stage} returned {status:?}"),
            Self::Transport { stage, message } => write!(f, "{stage} failed: {message}"),
        }
    }
}

impl From<GuideError> for Error {
    fn from(e: GuideError) -> Self {
        Self::Guiding(e)
    }
}

// ---------------------------------------------------------------------------
// Resolver errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolverError {
    /// HTTP request failed.
    Transport(String),
    /// Reply carried a coordinate line that would not parse.
    Malformed(String),
}

impl fmt::Display for ResolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(msg) => write!(f, "request failed: {msg}"),
            Self::Malformed(line) => write!(f, "malformed reply: {line}"),
        }
    }
}

impl From<ResolverError> for Error {
    fn from(e: ResolverError) -> Self {
        Self::Resolver(e)
    }
}

// ---------------------------------------------------------------------------
// Device errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// Socket connect/read/write failed.
    Io(String),
    /// The server closed the connection.
    Disconnected,
    /// The requested property or element was never reported.
    UnknownProperty { device: String, property: String },
    /// The driver flagged the property as `Alert`.
    Alert { device: String, property: String },
    /// An element value could not be parsed as a number.
    BadValue(String),
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "I/O error: {msg}"),
            Self::Disconnected => write!(f, "server disconnected"),
            Self::UnknownProperty { device, property } => {
                write!(f, "{device} does not report {property}")
            }
            Self::Alert { device, property } => write!(f, "{device} {property} in alert"),
            Self::BadValue(raw) => write!(f, "unparseable value {raw:?}"),
        }
    }
}

impl From<DeviceError> for Error {
    fn from(e: DeviceError) -> Self {
        Self::Device(e)
    }
}

impl From<std::io::Error> for DeviceError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Command errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Command name is not in the dispatch table.
    Unknown(String),
    /// A required named parameter was not supplied.
    MissingParameter {
        command: &'static str,
        name: &'static str,
    },
    /// A parameter was supplied but could not be parsed.
    InvalidParameter { name: String, value: String },
    /// A `key=value` token had no `=`.
    MalformedArgument(String),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(name) => write!(f, "unknown command: {name}"),
            Self::MissingParameter { command, name } => {
                write!(f, "{command}: missing parameter {name}")
            }
            Self::InvalidParameter { name, value } => {
                write!(f, "invalid value {value:?} for {name}")
            }
            Self::MalformedArgument(arg) => write!(f, "expected key=value, got {arg:?}"),
        }
    }
}

impl From<CommandError> for Error {
    fn from(e: CommandError) -> Self {
        Self::Command(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
