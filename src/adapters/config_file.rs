//! JSON configuration file adapter.
//!
//! Implements [`ConfigPort`] on a single JSON file.  Missing fields take
//! their defaults, so a config file only needs the keys that differ from
//! a stock rig.
//!
//! - Validation: every load and save goes through
//!   [`ObservatoryConfig::validate`].
//! - Atomic writes: the file is written to `<path>.tmp` and renamed over
//!   the original.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::info;

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::ObservatoryConfig;

pub struct JsonConfigFile {
    path: PathBuf,
}

impl JsonConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigPort for JsonConfigFile {
    fn load(&self) -> Result<ObservatoryConfig, ConfigError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No config at {}, using defaults", self.path.display());
                return Ok(ObservatoryConfig::default());
            }
            Err(e) => return Err(ConfigError::IoError(e)),
        };
        let config: ObservatoryConfig =
            serde_json::from_str(&text).map_err(|e| ConfigError::Corrupted(e.to_string()))?;
        config.validate()?;
        info!("Loaded config from {}", self.path.display());
        Ok(config)
    }

    fn save(&self, config: &ObservatoryConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let json = serde_json::to_string_pretty(config)
            .map_err(|e| ConfigError::Corrupted(e.to_string()))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(ConfigError::IoError)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(ConfigError::IoError)?;
        fs::rename(&tmp, &self.path).map_err(ConfigError::IoError)?;
        info!("Config saved to {}", self.path.display());
        Ok(())
    }
}
