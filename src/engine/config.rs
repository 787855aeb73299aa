//! Config - Application configuration loaded from JSON
//!
//! Every field has a default, so a config file only needs the values it
//! changes. Track geometry is validated while parsing.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::engine::camera::CameraConfig;
use crate::engine::error::ConfigError;
use crate::engine::race::RaceConfig;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub race: RaceConfig,
    pub camera: CameraConfig,
}

impl AppConfig {
    /// Read and validate a JSON config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.camera.validate()?;
        self.race.countdown.validate()
    }
}
