//! Table-driven sequence phase machine.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  StateTable                                                  │
//! │  ┌───────────────┬──────────┬──────────────────────────────┐ │
//! │  │ StateId       │ terminal │ successors                   │ │
//! │  ├───────────────┼──────────┼──────────────────────────────┤ │
//! │  │ Idle          │          │ Resolving                    │ │
//! │  │ Resolving     │          │ AltitudeCheck, Aborted       │ │
//! │  │ ...           │          │ ...                          │ │
//! │  │ Complete      │ yes      │ (none)                       │ │
//! │  └───────────────┴──────────┴──────────────────────────────┘ │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The sequence engine does the I/O; this machine only records where the
//! run is and refuses any move the table does not list.  Terminal states
//! absorb: once a run is `Complete`, `Aborted`, `GuideFailed` or `Failed`
//! nothing moves it again.

pub mod context;
pub mod states;

use core::fmt;

use log::{error, info};

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Every phase a sequence run can be in.
/// Must stay in sync with the state table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StateId {
    Idle = 0,
    Resolving = 1,
    AltitudeCheck = 2,
    DirectoryReady = 3,
    Slewing = 4,
    GuideStarting = 5,
    Imaging = 6,
    Dithering = 7,
    Capturing = 8,
    GuideStopping = 9,
    Complete = 10,
    Aborted = 11,
    GuideFailed = 12,
    Failed = 13,
}

impl StateId {
    /// Total number of states, used to size the table array.
    pub const COUNT: usize = 14;

    /// Convert an index back to `StateId`.  Panics on out-of-range in
    /// debug builds; returns `Failed` in release.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Idle,
            1 => Self::Resolving,
            2 => Self::AltitudeCheck,
            3 => Self::DirectoryReady,
            4 => Self::Slewing,
            5 => Self::GuideStarting,
            6 => Self::Imaging,
            7 => Self::Dithering,
            8 => Self::Capturing,
            9 => Self::GuideStopping,
            10 => Self::Complete,
            11 => Self::Aborted,
            12 => Self::GuideFailed,
            13 => Self::Failed,
            _ => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::Failed
            }
        }
    }
}

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single phase.
pub struct StateDescriptor {
    pub id: StateId,
    pub name: &'static str,
    /// No successors; the run is over.
    pub terminal: bool,
    /// Phases reachable in one step.
    pub successors: &'static [StateId],
}

/// A move the table does not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IllegalTransition {
    pub from: StateId,
    pub to: StateId,
}

impl fmt::Display for IllegalTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "illegal transition {:?} -> {:?}", self.from, self.to)
    }
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// The phase machine for one sequence run.
pub struct Fsm {
    /// Fixed-size table indexed by `StateId as usize`.
    table: [StateDescriptor; StateId::COUNT],
    /// Index of the current phase.
    current: usize,
    /// Number of accepted transitions.
    transitions: u32,
}

impl Fsm {
    /// Construct a new FSM with the given state table, starting in `initial`.
    pub fn new(table: [StateDescriptor; StateId::COUNT], initial: StateId) -> Self {
        Self {
            table,
            current: initial as usize,
            transitions: 0,
        }
    }

    /// Log the starting phase.  Call once before the first transition.
    pub fn start(&self) {
        info!("FSM starting in state: {}", self.table[self.current].name);
    }

    /// Move to `next` if the table lists it as a successor of the current phase.
    pub fn transition(&mut self, next: StateId) -> Result<(), IllegalTransition> {
        let from = self.current_state();
        if !self.table[self.current].successors.contains(&next) {
            error!(
                "FSM rejected transition: {} -> {}",
                self.table[self.current].name,
                self.table[next as usize].name
            );
            return Err(IllegalTransition { from, to: next });
        }

        info!(
            "FSM transition: {} -> {}",
            self.table[self.current].name, self.table[next as usize].name
        );
        self.current = next as usize;
        self.transitions += 1;
        Ok(())
    }

    /// The current phase.
    pub fn current_state(&self) -> StateId {
        StateId::from_index(self.current)
    }

    /// Display name of the current phase.
    pub fn current_name(&self) -> &'static str {
        self.table[self.current].name
    }

    /// True once the run has reached a terminal phase.
    pub fn is_terminal(&self) -> bool {
        self.table[self.current].terminal
    }

    /// Accepted transitions so far.
    pub fn transitions(&self) -> u32 {
        self.transitions
    }
}

impl Default for Fsm {
    fn default() -> Self {
        Self::new(states::build_state_table(), StateId::Idle)
    }
}
