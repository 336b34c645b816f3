//! Sky geometry used by the altitude gate.
//!
//! Only what the gate needs: J2000 equatorial coordinates, an observing
//! site, Greenwich mean sidereal time and the hour-angle altitude formula.
//! Precession, nutation and refraction are ignored; the error is well
//! under a degree, which is far finer than the 20° safety threshold.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Julian date of the J2000.0 epoch.
const J2000_JD: f64 = 2_451_545.0;
/// Julian date of the Unix epoch.
const UNIX_EPOCH_JD: f64 = 2_440_587.5;
const SECS_PER_DAY: f64 = 86_400.0;

/// Right ascension and declination, both in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquatorialCoords {
    pub ra_deg: f64,
    pub dec_deg: f64,
}

impl EquatorialCoords {
    pub fn new(ra_deg: f64, dec_deg: f64) -> Self {
        Self { ra_deg, dec_deg }
    }

    /// Right ascension in hours, the unit INDI mounts expect.
    pub fn ra_hours(&self) -> f64 {
        self.ra_deg / 15.0
    }
}

/// Geographic location of the observatory.  Longitude is east-positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub elevation_m: f64,
}

impl Default for Site {
    fn default() -> Self {
        // Greenwich; replaced by the mount's GEOGRAPHIC_COORD when available.
        Self {
            latitude_deg: 51.4769,
            longitude_deg: 0.0,
            elevation_m: 46.0,
        }
    }
}

/// Julian date for a UTC instant.
pub fn julian_date(at: DateTime<Utc>) -> f64 {
    let secs = at.timestamp() as f64 + f64::from(at.timestamp_subsec_millis()) / 1000.0;
    secs / SECS_PER_DAY + UNIX_EPOCH_JD
}

/// Greenwich mean sidereal time in degrees, normalised to `[0, 360)`.
pub fn gmst_deg(at: DateTime<Utc>) -> f64 {
    let d = julian_date(at) - J2000_JD;
    let t = d / 36_525.0;
    let gmst = 280.460_618_37 + 360.985_647_366_29 * d + 0.000_387_933 * t * t
        - t * t * t / 38_710_000.0;
    gmst.rem_euclid(360.0)
}

/// Local hour angle of `coords` in degrees, normalised to `(-180, 180]`.
pub fn hour_angle_deg(coords: &EquatorialCoords, site: &Site, at: DateTime<Utc>) -> f64 {
    let lst = gmst_deg(at) + site.longitude_deg;
    let ha = (lst - coords.ra_deg).rem_euclid(360.0);
    if ha > 180.0 { ha - 360.0 } else { ha }
}

/// Geometric altitude above the horizon in degrees.
pub fn altitude_deg(coords: &EquatorialCoords, site: &Site, at: DateTime<Utc>) -> f64 {
    let ha = hour_angle_deg(coords, site, at).to_radians();
    let dec = coords.dec_deg.to_radians();
    let lat = site.latitude_deg.to_radians();
    let sin_alt = lat.sin() * dec.sin() + lat.cos() * dec.cos() * ha.cos();
    sin_alt.clamp(-1.0, 1.0).asin().to_degrees()
}
