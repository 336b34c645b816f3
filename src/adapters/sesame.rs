//! Name resolver adapter: CDS Sesame.
//!
//! `GET {base}/-oI/A?{name}` returns a plain-text record.  The `%J` line
//! carries J2000 RA and Dec in decimal degrees:
//!
//! ```text
//! %J 83.82208 -05.39111 = 05 35 17.30 -05 23 28.0
//! ```
//!
//! No `%J` line means the object is unknown.  Altitude comes from the
//! local sidereal-time model in [`sky`](crate::sky).

use std::time::Duration;

use chrono::{DateTime, Utc};
use log::debug;
use ureq::Agent;

use crate::app::ports::EphemerisPort;
use crate::error::ResolverError;
use crate::sky::{self, EquatorialCoords, Site};

pub struct SesameResolver {
    base_url: String,
    agent: Agent,
}

impl SesameResolver {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent,
        }
    }
}

impl EphemerisPort for SesameResolver {
    fn resolve(&mut self, name: &str) -> Result<Option<EquatorialCoords>, ResolverError> {
        let url = format!("{}/-oI/A?{}", self.base_url, encode_query(name.trim()));
        debug!("Sesame GET {url}");
        let body = self
            .agent
            .get(&url)
            .call()
            .map_err(|e| ResolverError::Transport(e.to_string()))?
            .into_body()
            .read_to_string()
            .map_err(|e| ResolverError::Transport(e.to_string()))?;
        parse_record(&body)
    }

    fn altitude_deg(&self, coords: &EquatorialCoords, site: &Site, at: DateTime<Utc>) -> f64 {
        sky::altitude_deg(coords, site, at)
    }
}

/// Coordinates from the first `%J` line, `None` if there is none.
pub fn parse_record(body: &str) -> Result<Option<EquatorialCoords>, ResolverError> {
    let Some(line) = body.lines().find_map(|l| l.trim_start().strip_prefix("%J")) else {
        return Ok(None);
    };
    let mut fields = line.split_whitespace();
    let mut next = |what: &str| -> Result<f64, ResolverError> {
        fields
            .next()
            .and_then(|f| f.parse().ok())
            .ok_or_else(|| ResolverError::Malformed(format!("bad {what} in %J{line}")))
    };
    let ra_deg = next("RA")?;
    let dec_deg = next("Dec")?;
    if !(0.0..360.0).contains(&ra_deg) || !(-90.0..=90.0).contains(&dec_deg) {
        return Err(ResolverError::Malformed(format!(
            "coordinates out of range in %J{line}"
        )));
    }
    Ok(Some(EquatorialCoords::new(ra_deg, dec_deg)))
}

/// Percent-encode everything outside the URL unreserved set.
fn encode_query(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for b in raw.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~') {
            out.push(char::from(b));
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}
