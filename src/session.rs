//! Session directory manager.
//!
//! One directory per target per run, named `{target}_{YYYYMMDD_HHMMUT}`
//! under the plan's base directory.  Two runs started in the same minute
//! get `_2`, `_3`, ... suffixes instead of sharing a directory.  Frame
//! names inside follow `{filter}_{YYYYMMDD_HHMMUT}_{NNNN}.fits`.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::info;

use crate::error::{Error, Result};

/// `strftime` pattern shared by directory and frame names.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%MUT";

/// Give up looking for a free directory name after this many suffixes.
const MAX_SUFFIX: u32 = 99;

/// UTC timestamp token, e.g. `20240807_2230UT`.
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Deterministic frame filename: filter, UTC timestamp, 4-digit 1-based index.
pub fn frame_filename(filter: &str, at: DateTime<Utc>, index: u32) -> String {
    format!("{}_{}_{:04}.fits", filter, timestamp(at), index)
}

/// Replace path separators and whitespace so a catalogue name like
/// `"NGC 7000"` is a single path component.
pub fn sanitize_target(target: &str) -> String {
    target
        .trim()
        .chars()
        .map(|c| {
            if c.is_whitespace() || c == '/' || c == '\\' {
                '_'
            } else {
                c
            }
        })
        .collect()
}

/// Create a fresh session directory for `target` under `base`.
pub fn create_session_dir(base: &Path, target: &str, at: DateTime<Utc>) -> Result<PathBuf> {
    fs::create_dir_all(base)
        .map_err(|e| Error::Filesystem(format!("cannot create {}: {e}", base.display())))?;

    let stem = format!("{}_{}", sanitize_target(target), timestamp(at));
    for n in 1..=MAX_SUFFIX {
        let name = if n == 1 {
            stem.clone()
        } else {
            format!("{stem}_{n}")
        };
        let candidate = base.join(name);
        match fs::create_dir(&candidate) {
            Ok(()) => {
                info!("Session directory {}", candidate.display());
                return Ok(candidate);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => {
                return Err(Error::Filesystem(format!(
                    "cannot create {}: {e}",
                    candidate.display()
                )));
            }
        }
    }
    Err(Error::Filesystem(format!(
        "no free session directory for {stem} in {}",
        base.display()
    )))
}
