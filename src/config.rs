// SPDX-License-Identifier: GPL-3.0-only

use crate::camera::types::Facing;
use crate::constants::camera_defaults;
use crate::errors::{BoothError, BoothResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Directory name under the user config directory
const CONFIG_DIR: &str = "photobooth";

/// Config file name
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoothConfig {
    /// Preferred capture width (ideal, the closest supported size wins)
    pub ideal_width: u32,
    /// Preferred capture height (ideal, the closest supported size wins)
    pub ideal_height: u32,
    /// Camera facing preference when several devices are present
    pub facing: Facing,
    /// Pinned camera device path, overrides the facing preference
    pub camera_path: Option<String>,
    /// Export directory override (default: pictures directory subfolder)
    pub export_dir: Option<PathBuf>,
    /// Mirror camera preview horizontally (selfie mode)
    pub mirror_preview: bool,
}

impl Default for BoothConfig {
    fn default() -> Self {
        Self {
            ideal_width: camera_defaults::IDEAL_WIDTH,
            ideal_height: camera_defaults::IDEAL_HEIGHT,
            facing: Facing::default(), // Front, matching the selfie use case
            camera_path: None,
            export_dir: None,
            mirror_preview: true, // Default to mirrored (selfie mode)
        }
    }
}

impl BoothConfig {
    /// Path of the persisted config file, if a config directory exists
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Load the persisted config, falling back to defaults
    ///
    /// A missing file is the normal first-run case. An unreadable or
    /// unparsable file logs a warning and yields defaults rather than
    /// failing startup.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            warn!("No config directory available, using defaults");
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => config,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Failed to load config, using defaults");
                Self::default()
            }
        }
    }

    /// Load the config from an explicit path
    pub fn load_from(path: &Path) -> BoothResult<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| BoothError::Config(format!("read {}: {}", path.display(), e)))?;
        serde_json::from_str(&raw)
            .map_err(|e| BoothError::Config(format!("parse {}: {}", path.display(), e)))
    }

    /// Persist the config to the default location
    pub fn save(&self) -> BoothResult<()> {
        let Some(path) = Self::config_path() else {
            return Err(BoothError::Config(
                "no config directory available".to_string(),
            ));
        };
        self.save_to(&path)
    }

    /// Persist the config to an explicit path
    pub fn save_to(&self, path: &Path) -> BoothResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| BoothError::Config(format!("create {}: {}", parent.display(), e)))?;
        }
        let raw = serde_json::to_string_pretty(self)
            .map_err(|e| BoothError::Config(format!("serialize config: {}", e)))?;
        std::fs::write(path, raw)
            .map_err(|e| BoothError::Config(format!("write {}: {}", path.display(), e)))?;
        Ok(())
    }
}
