//! Wall-clock adapter.
//!
//! Implements [`Clock`] with `chrono::Utc::now()` and a blocking
//! `std::thread::sleep`.  Tests substitute a virtual clock instead.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::app::ports::Clock;

/// Real time for the production sequencer.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&mut self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}
