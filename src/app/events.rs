//! Outbound application events.
//!
//! The [`Observatory`](super::service::Observatory) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: write the log file, feed a
//! scheduler, or record them in a test.

use std::path::PathBuf;

use crate::fsm::StateId;
use crate::sky::EquatorialCoords;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The sequence moved between phases.
    StateChanged { from: StateId, to: StateId },

    /// A target name resolved to coordinates.
    TargetResolved { name: String, coords: EquatorialCoords },

    /// The resolver has no such object.
    TargetNotFound(String),

    /// Altitude measured for the gate.
    AltitudeChecked { altitude_deg: f64, threshold_deg: f64 },

    /// A session directory was created.
    DirectoryCreated(PathBuf),

    /// The mount accepted a slew and reported arrival.
    Slewed(EquatorialCoords),

    /// The guide loop is running.
    GuidingStarted,

    /// Guiding could not be started; `proceeding` is true when the
    /// sequence continues unguided.
    GuidingFailed { reason: String, proceeding: bool },

    /// The guide loop was stopped.
    GuidingStopped,

    /// A dither move completed before exposure `before_exposure`.
    Dithered { before_exposure: u32 },

    /// A frame was saved.
    FrameCaptured { index: u32, path: PathBuf },

    /// The sequence finished successfully.
    SequenceComplete { directory: PathBuf, frames: usize },

    /// The sequence ended early; `reason` is the error's display text.
    SequenceAborted { state: StateId, reason: String },

    /// A switch property was written.
    DeviceSet {
        device: String,
        property: &'static str,
        value: String,
    },

    /// The focuser was nudged.
    FocusNudged { direction: &'static str, millis: u64 },
}
