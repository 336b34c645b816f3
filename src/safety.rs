//! Altitude gate.
//!
//! Runs before any slew or capture.  A target at or above the configured
//! minimum altitude passes without consulting anyone; below it, the
//! injected [`LowAltitudePolicy`] decides.  A non-finite altitude is
//! treated as below the threshold.
//!
//! ## Policies
//!
//! | Policy                | Below threshold         |
//! |-----------------------|-------------------------|
//! | [`NeverBelowThreshold`] | always declines       |
//! | [`AlwaysProceed`]       | always proceeds       |
//! | `TerminalPrompt` (adapter) | asks the operator  |
//! | any `FnMut(f64) -> bool` | caller decides       |

use log::{info, warn};

use crate::app::ports::LowAltitudePolicy;
use crate::config::ObservatoryConfig;
use crate::error::{Error, Result};

/// Result of running the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// At or above the threshold; policy not consulted.
    Clear,
    /// Below the threshold, but the policy allowed it.
    ConfirmedLow,
    /// Below the threshold and the policy declined.
    Declined,
}

/// Minimum-altitude safety gate.
pub struct AltitudeGate {
    min_altitude_deg: f64,
}

impl AltitudeGate {
    pub fn new(config: &ObservatoryConfig) -> Self {
        Self {
            min_altitude_deg: config.min_altitude_deg,
        }
    }

    pub fn threshold_deg(&self) -> f64 {
        self.min_altitude_deg
    }

    /// Classify `altitude_deg`, consulting `policy` only when below threshold.
    pub fn evaluate(&self, altitude_deg: f64, policy: &mut dyn LowAltitudePolicy) -> GateDecision {
        if altitude_deg >= self.min_altitude_deg {
            return GateDecision::Clear;
        }
        warn!(
            "Target at {:.2} deg, below the {:.1} deg limit",
            altitude_deg, self.min_altitude_deg
        );
        if policy.allow_low_altitude(altitude_deg) {
            info!("Low-altitude target accepted by policy");
            GateDecision::ConfirmedLow
        } else {
            GateDecision::Declined
        }
    }

    /// Like [`evaluate`](Self::evaluate) but a decline is an
    /// [`Error::LowAltitude`].
    pub fn check(&self, altitude_deg: f64, policy: &mut dyn LowAltitudePolicy) -> Result<GateDecision> {
        match self.evaluate(altitude_deg, policy) {
            GateDecision::Declined => Err(Error::LowAltitude { altitude_deg }),
            decision => Ok(decision),
        }
    }
}

/// Unattended policy: never image below the threshold.
pub struct NeverBelowThreshold;

impl LowAltitudePolicy for NeverBelowThreshold {
    fn allow_low_altitude(&mut self, _altitude_deg: f64) -> bool {
        false
    }
}

/// Unattended policy: image regardless of altitude.
pub struct AlwaysProceed;

impl LowAltitudePolicy for AlwaysProceed {
    fn allow_low_altitude(&mut self, _altitude_deg: f64) -> bool {
        true
    }
}
