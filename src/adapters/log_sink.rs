//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing each application event as one
//! structured line to the `log` facade (the session log file in
//! production).  A scheduler or web dashboard would implement the same
//! trait.

use log::{error, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::StateChanged { from, to } => {
                info!("STATE | {:?} -> {:?}", from, to);
            }
            AppEvent::TargetResolved { name, coords } => {
                info!(
                    "TARGET | {} | ra={:.5} dec={:.5}",
                    name, coords.ra_deg, coords.dec_deg
                );
            }
            AppEvent::TargetNotFound(name) => {
                error!("TARGET | {} | not found", name);
            }
            AppEvent::AltitudeChecked {
                altitude_deg,
                threshold_deg,
            } => {
                info!("ALT | {:.2} deg (limit {:.1})", altitude_deg, threshold_deg);
            }
            AppEvent::DirectoryCreated(dir) => {
                info!("DIR | {}", dir.display());
            }
            AppEvent::Slewed(coords) => {
                info!("SLEW | ra={:.4}h dec={:.4}", coords.ra_hours(), coords.dec_deg);
            }
            AppEvent::GuidingStarted => info!("GUIDE | started"),
            AppEvent::GuidingFailed { reason, proceeding } => {
                if *proceeding {
                    warn!("GUIDE | failed ({}) | continuing unguided", reason);
                } else {
                    error!("GUIDE | failed ({})", reason);
                }
            }
            AppEvent::GuidingStopped => info!("GUIDE | stopped"),
            AppEvent::Dithered { before_exposure } => {
                info!("DITHER | before exposure {}", before_exposure);
            }
            AppEvent::FrameCaptured { index, path } => {
                info!("FRAME | {:04} | {}", index, path.display());
            }
            AppEvent::SequenceComplete { directory, frames } => {
                info!("DONE | {} frames | {}", frames, directory.display());
            }
            AppEvent::SequenceAborted { state, reason } => {
                error!("ABORT | {:?} | {}", state, reason);
            }
            AppEvent::DeviceSet {
                device,
                property,
                value,
            } => {
                info!("SET | {} {}={}", device, property, value);
            }
            AppEvent::FocusNudged { direction, millis } => {
                info!("FOCUS | {} for {} ms", direction, millis);
            }
        }
    }
}
