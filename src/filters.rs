//! Filter wheel slot table.
//!
//! Fixed capacity: a wheel has a fixed number of slots, so the table is a
//! `heapless::Vec` and never allocates.  Lookups are exact and
//! case-sensitive; a miss is an error, never a default slot.

use heapless::{String, Vec};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Largest wheel the table can describe.
pub const MAX_SLOTS: usize = 8;
/// Longest filter identifier (e.g. `"Ha"`, `"OIII"`).
pub const MAX_ID_LEN: usize = 8;

/// One filter position in the wheel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSlot {
    pub id: String<MAX_ID_LEN>,
    /// 1-based wheel position as reported by `FILTER_SLOT`.
    pub position: u8,
}

/// Filter identifier → wheel position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterTable {
    slots: Vec<FilterSlot, MAX_SLOTS>,
}

impl FilterTable {
    /// An empty table.
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Add a slot.  Fails when the position is 0, the identifier is too
    /// long or already present, or the table is full.
    pub fn insert(&mut self, id: &str, position: u8) -> core::result::Result<(), &'static str> {
        if position == 0 {
            return Err("filter positions start at 1");
        }
        if self.position(id).is_some() {
            return Err("duplicate filter identifier");
        }
        let mut name = String::new();
        name.push_str(id).map_err(|()| "filter identifier too long")?;
        self.slots
            .push(FilterSlot { id: name, position })
            .map_err(|_| "filter table full")
    }

    /// Wheel position for `id`, if the table has it.
    pub fn position(&self, id: &str) -> Option<u8> {
        self.slots
            .iter()
            .find(|slot| slot.id.as_str() == id)
            .map(|slot| slot.position)
    }

    /// Wheel position for `id`, or [`Error::UnknownFilter`].
    pub fn lookup(&self, id: &str) -> Result<u8> {
        self.position(id)
            .ok_or_else(|| Error::UnknownFilter(id.to_owned()))
    }

    /// Re-check the rules [`insert`](Self::insert) enforces.  A table read
    /// from JSON bypasses `insert`, so config validation calls this.
    pub fn check(&self) -> core::result::Result<(), &'static str> {
        for (i, slot) in self.slots.iter().enumerate() {
            if slot.position == 0 {
                return Err("filter positions start at 1");
            }
            if self.slots[..i].iter().any(|earlier| earlier.id == slot.id) {
                return Err("duplicate filter identifier");
            }
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &FilterSlot> {
        self.slots.iter()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl Default for FilterTable {
    /// Six-position LRGB + narrowband wheel.
    fn default() -> Self {
        let mut table = Self::new();
        for (id, position) in [("L", 1), ("R", 2), ("G", 3), ("B", 4), ("H", 5), ("O", 6)] {
            // Static entries always fit.
            let _ = table.insert(id, position);
        }
        table
    }
}
