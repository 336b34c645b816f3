//! Bounded waits and retries.
//!
//! Replaces fixed settle sleeps: wait a minimum time, then poll the
//! property state until the driver stops reporting `Busy` or the timeout
//! runs out.  Elapsed time is the sum of requested sleeps, so a virtual
//! clock gives deterministic timeouts in tests.

use core::fmt::Display;
use std::time::Duration;

use log::warn;

use crate::error::{DeviceError, Error, Result};

use super::ports::{Clock, DevicePort, PropertyState};

/// Timing for one [`wait_while_busy`] call.
#[derive(Debug, Clone, Copy)]
pub struct SettleTiming {
    /// Always wait at least this long before the first poll.
    pub min_wait: Duration,
    /// Give up once this much time has passed in total.
    pub timeout: Duration,
    /// Time between polls.
    pub poll: Duration,
}

/// Wait until `device/property` leaves `Busy`.
///
/// `Alert` is a device error; still `Busy` at the deadline is
/// [`Error::Timeout`].
pub fn wait_while_busy(
    devices: &mut impl DevicePort,
    clock: &mut impl Clock,
    device: &str,
    property: &'static str,
    timing: SettleTiming,
) -> Result<()> {
    clock.sleep(timing.min_wait);
    let mut waited = timing.min_wait;

    loop {
        match devices.property_state(device, property)? {
            PropertyState::Idle | PropertyState::Ok => return Ok(()),
            PropertyState::Alert => {
                return Err(DeviceError::Alert {
                    device: device.to_owned(),
                    property: property.to_owned(),
                }
                .into());
            }
            PropertyState::Busy => {}
        }
        if waited >= timing.timeout {
            return Err(Error::Timeout {
                device: device.to_owned(),
                property,
            });
        }
        let step = timing.poll.min(timing.timeout - waited).max(Duration::from_millis(1));
        clock.sleep(step);
        waited += step;
    }
}

/// Run `op` up to `attempts` times (at least once), sleeping `delay`
/// between failures.  Returns the last error if every attempt fails.
pub fn retry<T, E: Display>(
    what: &str,
    attempts: u8,
    delay: Duration,
    clock: &mut impl Clock,
    mut op: impl FnMut() -> core::result::Result<T, E>,
) -> core::result::Result<T, E> {
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts => {
                warn!("{what} failed (attempt {attempt}/{attempts}): {e}; retrying");
                clock.sleep(delay);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
