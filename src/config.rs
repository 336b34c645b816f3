//! Observatory configuration parameters
//!
//! All tunable parameters for the sequencer: where the collaborators live,
//! what the devices are called, safety thresholds and timing.
//! Values are loaded from a JSON file through the
//! [`ConfigPort`](crate::app::ports::ConfigPort); anything absent falls back
//! to [`ObservatoryConfig::default()`].

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::filters::FilterTable;
use crate::sky::Site;

/// Names of the INDI devices the sequencer drives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceNames {
    pub roof: String,
    pub cover: String,
    pub light: String,
    pub mount: String,
    pub filter_wheel: String,
    pub camera: String,
    pub focuser: String,
}

impl Default for DeviceNames {
    fn default() -> Self {
        Self {
            roof: "Observatory Roof".into(),
            cover: "Telescope Cover".into(),
            light: "Red Light".into(),
            mount: "iOptron IEQ Pro".into(),
            filter_wheel: "ZWO EFW".into(),
            camera: "ZWO CCD ASI183MM Pro".into(),
            focuser: "ZWO EAF".into(),
        }
    }
}

/// What to do when a target sits below `min_altitude_deg`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LowAltitudeMode {
    /// Ask the operator on the terminal.
    Prompt,
    /// Unattended: never image below the threshold.
    Never,
    /// Unattended: always proceed (testing rigs, flats).
    Always,
}

/// What to do when the guider cannot be started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuideFailurePolicy {
    /// Stop the sequence in `GuideFailed`.
    Abort,
    /// Log a warning and take unguided frames.
    ProceedUnguided,
}

/// Core sequencer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservatoryConfig {
    // --- Collaborators ---
    /// INDI server host
    pub indi_host: String,
    /// INDI server port
    pub indi_port: u16,
    /// Socket read timeout for INDI replies (milliseconds)
    pub indi_timeout_ms: u32,
    /// Guider HTTP API base URL
    pub guider_url: String,
    /// Sesame name resolver base URL
    pub resolver_url: String,
    /// Program launched by `showimage`
    pub viewer: String,

    // --- Equipment ---
    pub devices: DeviceNames,
    pub filters: FilterTable,
    /// Used when the mount does not report GEOGRAPHIC_COORD
    pub site: Site,

    // --- Safety ---
    /// Minimum altitude (degrees) before the operator policy is consulted
    pub min_altitude_deg: f64,
    pub low_altitude_policy: LowAltitudeMode,
    pub guide_failure_policy: GuideFailurePolicy,
    /// Attempts for guider calls and frame saves (1 = no retry)
    pub retry_attempts: u8,
    /// Pause between attempts (milliseconds)
    pub retry_delay_ms: u32,

    // --- Timing ---
    /// Device state polling interval (milliseconds)
    pub poll_interval_ms: u32,
    /// Upper bound on a slew (milliseconds)
    pub slew_timeout_ms: u32,
    /// Minimum wait after a filter change (milliseconds)
    pub filter_settle_ms: u32,
    /// Upper bound on a filter change (milliseconds)
    pub filter_timeout_ms: u32,
    /// Added to the exposure time before polling the camera (milliseconds)
    pub readout_margin_ms: u32,
    /// Upper bound on camera readout after exposure + margin (milliseconds)
    pub exposure_timeout_ms: u32,
    /// Duration of each dither axis pulse (milliseconds)
    pub dither_pulse_ms: u32,
    /// Wait after a dither before the next exposure (milliseconds)
    pub dither_settle_ms: u32,
    /// Default focuser nudge (milliseconds)
    pub focus_pulse_ms: u32,
    /// Slew to the target before guiding starts
    pub slew_before_sequence: bool,

    // --- Logging ---
    pub log_path: String,
    /// `error` | `warn` | `info` | `debug` | `trace`
    pub log_level: String,
}

impl Default for ObservatoryConfig {
    fn default() -> Self {
        Self {
            // Collaborators
            indi_host: "localhost".into(),
            indi_port: 7624,
            indi_timeout_ms: 5_000,
            guider_url: "http://localhost:4400".into(),
            resolver_url: "https://cds.unistra.fr/cgi-bin/nph-sesame".into(),
            viewer: "ds9".into(),

            // Equipment
            devices: DeviceNames::default(),
            filters: FilterTable::default(),
            site: Site::default(),

            // Safety
            min_altitude_deg: 20.0,
            low_altitude_policy: LowAltitudeMode::Prompt,
            guide_failure_policy: GuideFailurePolicy::Abort,
            retry_attempts: 2,
            retry_delay_ms: 2_000,

            // Timing
            poll_interval_ms: 500,
            slew_timeout_ms: 180_000, // 3 min covers a meridian-to-horizon slew
            filter_settle_ms: 2_000,
            filter_timeout_ms: 30_000,
            readout_margin_ms: 2_000,
            exposure_timeout_ms: 60_000,
            dither_pulse_ms: 1_000,
            dither_settle_ms: 2_000,
            focus_pulse_ms: 2_000,
            slew_before_sequence: true,

            // Logging
            log_path: "/var/log/observatory_control.log".into(),
            log_level: "info".into(),
        }
    }
}

impl ObservatoryConfig {
    pub fn poll_interval(&self) -> Duration {
        ms(self.poll_interval_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        ms(self.retry_delay_ms)
    }

    pub fn slew_timeout(&self) -> Duration {
        ms(self.slew_timeout_ms)
    }

    pub fn filter_settle(&self) -> Duration {
        ms(self.filter_settle_ms)
    }

    pub fn filter_timeout(&self) -> Duration {
        ms(self.filter_timeout_ms)
    }

    pub fn readout_margin(&self) -> Duration {
        ms(self.readout_margin_ms)
    }

    pub fn exposure_timeout(&self) -> Duration {
        ms(self.exposure_timeout_ms)
    }

    pub fn dither_pulse(&self) -> Duration {
        ms(self.dither_pulse_ms)
    }

    pub fn dither_settle(&self) -> Duration {
        ms(self.dither_settle_ms)
    }

    pub fn focus_pulse(&self) -> Duration {
        ms(self.focus_pulse_ms)
    }

    pub fn indi_timeout(&self) -> Duration {
        ms(self.indi_timeout_ms)
    }

    /// Range-check every field.  Rejects rather than clamps.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(-10.0..=60.0).contains(&self.min_altitude_deg) {
            return Err(ConfigError::ValidationFailed(
                "min_altitude_deg must be -10.0–60.0",
            ));
        }
        if !(1..=10).contains(&self.retry_attempts) {
            return Err(ConfigError::ValidationFailed("retry_attempts must be 1–10"));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("poll_interval_ms must be > 0"));
        }
        if self.slew_timeout_ms < self.poll_interval_ms
            || self.filter_timeout_ms < self.poll_interval_ms
            || self.exposure_timeout_ms < self.poll_interval_ms
        {
            return Err(ConfigError::ValidationFailed(
                "timeouts must be at least one poll interval",
            ));
        }
        if self.filter_settle_ms > self.filter_timeout_ms {
            return Err(ConfigError::ValidationFailed(
                "filter_settle_ms must not exceed filter_timeout_ms",
            ));
        }
        if self.filters.is_empty() {
            return Err(ConfigError::ValidationFailed("filter table is empty"));
        }
        self.filters.check().map_err(ConfigError::ValidationFailed)?;
        if !(-90.0..=90.0).contains(&self.site.latitude_deg)
            || !(-180.0..=360.0).contains(&self.site.longitude_deg)
        {
            return Err(ConfigError::ValidationFailed("site coordinates out of range"));
        }
        if self.guider_url.is_empty() || self.resolver_url.is_empty() {
            return Err(ConfigError::ValidationFailed("collaborator URLs must be set"));
        }
        Ok(())
    }
}

fn ms(value: u32) -> Duration {
    Duration::from_millis(u64::from(value))
}
