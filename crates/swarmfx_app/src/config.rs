// SPDX-License-Identifier: MIT OR Apache-2.0
//! Host configuration.
//!
//! Stored as RON next to the show files. A missing file means defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use swarmfx_graph::template::DEFAULT_TEMPLATE_MARGIN;

/// Current configuration format version
pub const CONFIG_FORMAT_VERSION: u32 = 1;

/// Configuration file looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "swarmfx.ron";

/// Host settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Format version
    pub version: u32,
    /// Template catalogue directory
    pub template_dir: PathBuf,
    /// Gap left of imported templates
    pub template_margin: f32,
    /// First frame of a run
    pub frame_start: i32,
    /// Last frame of a run, inclusive
    pub frame_end: i32,
    /// Default log filter when `RUST_LOG` is unset
    pub log_filter: String,
    /// Fixed environment samples for the headless scene
    pub scene: Vec<SceneSampleConfig>,
}

/// Environment sample returned for nodes referencing `resource`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneSampleConfig {
    /// Collection or object name
    pub resource: String,
    /// Scalar sample
    #[serde(default)]
    pub value: f32,
    /// Color sample
    #[serde(default = "opaque_black")]
    pub color: [f32; 4],
}

fn opaque_black() -> [f32; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_FORMAT_VERSION,
            template_dir: PathBuf::from("templates"),
            template_margin: DEFAULT_TEMPLATE_MARGIN,
            frame_start: 1,
            frame_end: 24,
            log_filter: "swarmfx_graph=info,swarmfx_app=info".to_string(),
            scene: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = ron::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;

        if config.version > CONFIG_FORMAT_VERSION {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!(
                    "Config version {} is newer than supported version {}",
                    config.version, CONFIG_FORMAT_VERSION
                ),
            ));
        }

        Ok(config)
    }

    /// Load from `path`, or from the working directory when `None`.
    /// A missing file yields the defaults.
    pub fn load_or_default(path: Option<&Path>) -> std::io::Result<Self> {
        let path = path.unwrap_or(Path::new(CONFIG_FILE_NAME));
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let config = ron::ser::PrettyConfig::default().struct_names(true);
        let content = ron::ser::to_string_pretty(self, config)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)
    }

    /// Frames covered by a run
    pub fn frames(&self) -> std::ops::RangeInclusive<i32> {
        self.frame_start..=self.frame_end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        let config = AppConfig {
            template_dir: PathBuf::from("shows/templates"),
            frame_end: 48,
            ..Default::default()
        };
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.frames().count(), 48);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: AppConfig =
            ron::from_str("(frame_start: 10, scene: [(resource: \"Hull\", value: 0.5)])").unwrap();
        assert_eq!(config.frame_start, 10);
        assert_eq!(config.scene[0].color, [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(config.frame_end, 24);
        assert_eq!(config.template_margin, DEFAULT_TEMPLATE_MARGIN);
    }

    #[test]
    fn test_newer_version_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "(version: 99)").unwrap();
        assert!(AppConfig::load(&path).is_err());
        assert!(AppConfig::load_or_default(Some(&dir.path().join("missing.ron"))).is_ok());
    }
}
