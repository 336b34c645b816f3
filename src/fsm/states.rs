//! Sequence phase table.
//!
//! ```text
//!  IDLE ─▶ RESOLVING ─▶ ALTITUDE_CHECK ─▶ DIRECTORY_READY ─▶ SLEWING
//!              │              │                 │               │
//!              └──▶ ABORTED ◀─┘                 └──────┬────────┘
//!                                                      ▼
//!                   GUIDE_FAILED ◀── GUIDE_STARTING ◀──┘
//!                                          │
//!                                          ▼
//!                    ┌──────────────── IMAGING ◀──────────┐
//!                    │                  │   │             │
//!                    │          DITHERING ─▶ CAPTURING ───┘
//!                    ▼
//!              GUIDE_STOPPING ─▶ COMPLETE | ABORTED | FAILED
//! ```

use super::{StateDescriptor, StateId};

const IDLE_NEXT: &[StateId] = &[StateId::Resolving];
const RESOLVING_NEXT: &[StateId] = &[StateId::AltitudeCheck, StateId::Aborted];
// Directory creation happens on the way into DirectoryReady; a failure there
// ends the run in Failed.
const ALTITUDE_NEXT: &[StateId] = &[StateId::DirectoryReady, StateId::Aborted, StateId::Failed];
const DIRECTORY_NEXT: &[StateId] = &[StateId::Slewing, StateId::GuideStarting, StateId::Aborted];
const SLEWING_NEXT: &[StateId] = &[StateId::GuideStarting, StateId::Failed, StateId::Aborted];
const GUIDE_STARTING_NEXT: &[StateId] = &[StateId::Imaging, StateId::GuideFailed];
const IMAGING_NEXT: &[StateId] = &[StateId::Dithering, StateId::Capturing, StateId::GuideStopping];
const DITHERING_NEXT: &[StateId] = &[StateId::Capturing, StateId::GuideStopping];
const CAPTURING_NEXT: &[StateId] = &[StateId::Imaging, StateId::GuideStopping];
const GUIDE_STOPPING_NEXT: &[StateId] = &[StateId::Complete, StateId::Aborted, StateId::Failed];
const TERMINAL: &[StateId] = &[];

/// Build the static state table.  Row `i` describes `StateId::from_index(i)`.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        row(StateId::Idle, "Idle", IDLE_NEXT),
        row(StateId::Resolving, "Resolving", RESOLVING_NEXT),
        row(StateId::AltitudeCheck, "AltitudeCheck", ALTITUDE_NEXT),
        row(StateId::DirectoryReady, "DirectoryReady", DIRECTORY_NEXT),
        row(StateId::Slewing, "Slewing", SLEWING_NEXT),
        row(StateId::GuideStarting, "GuideStarting", GUIDE_STARTING_NEXT),
        row(StateId::Imaging, "Imaging", IMAGING_NEXT),
        row(StateId::Dithering, "Dithering", DITHERING_NEXT),
        row(StateId::Capturing, "Capturing", CAPTURING_NEXT),
        row(StateId::GuideStopping, "GuideStopping", GUIDE_STOPPING_NEXT),
        row(StateId::Complete, "Complete", TERMINAL),
        row(StateId::Aborted, "Aborted", TERMINAL),
        row(StateId::GuideFailed, "GuideFailed", TERMINAL),
        row(StateId::Failed, "Failed", TERMINAL),
    ]
}

fn row(id: StateId, name: &'static str, successors: &'static [StateId]) -> StateDescriptor {
    StateDescriptor {
        id,
        name,
        terminal: successors.is_empty(),
        successors,
    }
}
