//! Per-run state threaded through the sequence engine.
//!
//! `SequenceRun` is created when a sequence starts, mutated frame by frame,
//! and folded into a [`SequenceReport`] at the end.  Nothing here is
//! persisted: only the frames on disk and the log lines survive a run.

use std::path::PathBuf;

use crate::sky::EquatorialCoords;

/// Mutable bookkeeping for the in-flight sequence.
#[derive(Debug, Clone, Default)]
pub struct SequenceRun {
    /// Target name as requested.
    pub target: String,
    /// Resolved J2000 coordinates, once known.
    pub coords: Option<EquatorialCoords>,
    /// Altitude measured at the gate.
    pub altitude_deg: Option<f64>,
    /// Session directory, once created.
    pub directory: Option<PathBuf>,
    /// Frames saved so far, in capture order.
    pub frames: Vec<PathBuf>,
    /// 1-based index of the exposure in progress (0 before the first).
    pub exposure_index: u32,
    /// Dither moves performed.
    pub dithers: u32,
    /// The guide loop is running.
    pub guiding_active: bool,
    /// The guide loop was started for this run.
    pub guided: bool,
    /// Set when the final guide stop failed after every retry.
    pub guide_stop_failed: bool,
}

impl SequenceRun {
    pub fn new(target: &str) -> Self {
        Self {
            target: target.to_owned(),
            ..Self::default()
        }
    }

    /// Close the run and hand back what the caller needs.
    pub fn into_report(self) -> SequenceReport {
        SequenceReport {
            target: self.target,
            directory: self.directory.unwrap_or_default(),
            frames: self.frames,
            dithers: self.dithers,
            guided: self.guided,
            guide_stop_failed: self.guide_stop_failed,
        }
    }
}

/// Outcome of a completed sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceReport {
    pub target: String,
    pub directory: PathBuf,
    pub frames: Vec<PathBuf>,
    pub dithers: u32,
    /// Frames were taken with the guide loop running.
    pub guided: bool,
    pub guide_stop_failed: bool,
}
