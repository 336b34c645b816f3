//! Port traits: the hexagonal boundary between the sequencer and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Observatory (domain)
//! ```
//!
//! Driven adapters (INDI client, guider HTTP client, name resolver, clock,
//! event sinks, config file) implement these traits.  The
//! [`Observatory`](super::service::Observatory) consumes them via generics,
//! so the sequencing logic never touches a socket directly.
//!
//! ## Error conventions
//!
//! - Writes are fire-and-forget: `Ok(())` means the command left the
//!   process, not that the device obeyed.  Confirmation comes from polling
//!   [`DevicePort::property_state`].
//! - Guider calls return `Ok(())` only for an exact `"OK"` status.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::config::ObservatoryConfig;
use crate::error::{DeviceError, GuideError, ResolverError};
use crate::sky::{EquatorialCoords, Site};

// ───────────────────────────────────────────────────────────────
// Device port (driven adapter: domain ↔ INDI drivers)
// ───────────────────────────────────────────────────────────────

/// Driver-reported state of a property vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyState {
    Idle,
    Ok,
    Busy,
    Alert,
}

impl PropertyState {
    /// Parse the INDI `state` attribute.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "Idle" => Some(Self::Idle),
            "Ok" => Some(Self::Ok),
            "Busy" => Some(Self::Busy),
            "Alert" => Some(Self::Alert),
            _ => None,
        }
    }
}

/// Property writes and reads against named devices.
pub trait DevicePort {
    /// Turn switch `element` of `device/property` on or off.
    fn set_switch(
        &mut self,
        device: &str,
        property: &str,
        element: &str,
        on: bool,
    ) -> Result<(), DeviceError>;

    /// Write one or more number elements of `device/property` in a single vector.
    fn set_number(
        &mut self,
        device: &str,
        property: &str,
        values: &[(&str, f64)],
    ) -> Result<(), DeviceError>;

    /// Write text `element` of `device/property`.
    fn set_text(
        &mut self,
        device: &str,
        property: &str,
        element: &str,
        value: &str,
    ) -> Result<(), DeviceError>;

    /// Current state of `device/property`.
    fn property_state(&mut self, device: &str, property: &str)
    -> Result<PropertyState, DeviceError>;

    /// Current value of number `element` of `device/property`.
    fn number(&mut self, device: &str, property: &str, element: &str) -> Result<f64, DeviceError>;
}

// ───────────────────────────────────────────────────────────────
// Ephemeris port (driven adapter: domain → name resolver)
// ───────────────────────────────────────────────────────────────

/// Target name resolution and horizon geometry.
pub trait EphemerisPort {
    /// J2000 coordinates for `name`; `Ok(None)` when the object is unknown.
    fn resolve(&mut self, name: &str) -> Result<Option<EquatorialCoords>, ResolverError>;

    /// Altitude of `coords` above the horizon at `site` and `at`.
    fn altitude_deg(&self, coords: &EquatorialCoords, site: &Site, at: DateTime<Utc>) -> f64;
}

// ───────────────────────────────────────────────────────────────
// Guider port (driven adapter: domain → autoguiding daemon)
// ───────────────────────────────────────────────────────────────

pub trait GuiderPort {
    /// Switch declination guiding to multi-star mode.
    fn enable_multi_star(&mut self) -> Result<(), GuideError>;

    /// Start the guide loop.
    fn start_guiding(&mut self) -> Result<(), GuideError>;

    /// Stop guide-camera capture (ends guiding).
    fn stop_guiding(&mut self) -> Result<(), GuideError>;
}

// ───────────────────────────────────────────────────────────────
// Clock port (driven adapter: domain → wall clock)
// ───────────────────────────────────────────────────────────────

/// Every wait in the sequencer goes through this port, so tests can run a
/// multi-hour sequence against a virtual clock.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    fn sleep(&mut self, duration: Duration);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Operator policy (driven adapter: domain → human or scheduler)
// ───────────────────────────────────────────────────────────────

/// Decides whether to image a target below the altitude threshold.
///
/// Only consulted when the target is below the threshold.
pub trait LowAltitudePolicy {
    fn allow_low_altitude(&mut self, altitude_deg: f64) -> bool;
}

impl<F> LowAltitudePolicy for F
where
    F: FnMut(f64) -> bool,
{
    fn allow_low_altitude(&mut self, altitude_deg: f64) -> bool {
        self(altitude_deg)
    }
}

// ───────────────────────────────────────────────────────────────
// Image viewer (driven adapter: domain → FITS viewer)
// ───────────────────────────────────────────────────────────────

pub trait ImageViewer {
    /// Open `path` without waiting for the viewer to exit.
    fn open(&mut self, path: &Path) -> std::io::Result<()>;
}

impl<F> ImageViewer for F
where
    F: FnMut(&Path) -> std::io::Result<()>,
{
    fn open(&mut self, path: &Path) -> std::io::Result<()> {
        self(path)
    }
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists observatory configuration.
///
/// Implementations MUST validate before accepting or persisting a config
/// (see [`ObservatoryConfig::validate`]); invalid ranges are rejected with
/// [`ConfigError::ValidationFailed`], never silently clamped.
pub trait ConfigPort {
    /// Load configuration.  Returns [`ObservatoryConfig::default()`] if no
    /// stored config exists.
    fn load(&self) -> Result<ObservatoryConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &ObservatoryConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug)]
pub enum ConfigError {
    /// Stored config failed to deserialize.
    Corrupted(String),
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError(std::io::Error),
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted(msg) => write!(f, "config corrupted: {}", msg),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}
