//! Exposure plan: what one sequence will shoot.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::filters::FilterTable;

/// Longest single exposure a plan may ask for (24 h).
pub const MAX_EXPOSURE_SECS: f64 = 86_400.0;

/// Filter, exposure length, frame count and output base directory.
/// Immutable once a sequence starts.
#[derive(Debug, Clone, PartialEq)]
pub struct ExposurePlan {
    pub filter: String,
    pub exposure_secs: f64,
    pub count: u32,
    pub base_directory: PathBuf,
}

impl ExposurePlan {
    pub fn new(
        filter: impl Into<String>,
        exposure_secs: f64,
        count: u32,
        base_directory: impl Into<PathBuf>,
    ) -> Self {
        Self {
            filter: filter.into(),
            exposure_secs,
            count,
            base_directory: base_directory.into(),
        }
    }

    /// Exposure length as a `Duration`.  Only meaningful after
    /// [`validate`](Self::validate); an unrepresentable length is zero.
    pub fn exposure(&self) -> Duration {
        Duration::try_from_secs_f64(self.exposure_secs).unwrap_or_default()
    }

    /// Check the plan against the wheel and return the filter's slot.
    pub fn validate(&self, filters: &FilterTable) -> Result<u8> {
        if self.count == 0 {
            return Err(Error::InvalidPlan("exposure_count must be at least 1"));
        }
        if !self.exposure_secs.is_finite() || self.exposure_secs <= 0.0 {
            return Err(Error::InvalidPlan("exposure_time must be a positive number of seconds"));
        }
        if self.exposure_secs > MAX_EXPOSURE_SECS {
            return Err(Error::InvalidPlan("exposure_time must not exceed 86400 seconds"));
        }
        filters.lookup(&self.filter)
    }
}
