// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editor configuration, stored as a RON file.

use crate::codec::Format;
use crate::history::DEFAULT_HISTORY_LIMIT;
use crate::layout::LayoutConfig;
use crate::style::StyleDefaults;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Editor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Snapshots kept per document
    pub history_limit: usize,
    /// Global style defaults
    pub style: StyleDefaults,
    /// Layout metrics
    pub layout: LayoutConfig,
    /// Encoding used when saving
    pub default_format: Format,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            style: StyleDefaults::default(),
            layout: LayoutConfig::default(),
            default_format: Format::Ron,
        }
    }
}

impl EditorConfig {
    /// Load a configuration file, falling back to defaults if it does not exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: EditorConfig = ron::from_str(&content)?;
        if config.history_limit == 0 {
            return Err(ConfigError::Invalid("history_limit must be at least 1".to_string()));
        }
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Save the configuration
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let pretty = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        let content = ron::ser::to_string_pretty(self, pretty)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Error when loading or saving configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File access failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// RON parsing failed
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// RON encoding failed
    #[error("Encoding error: {0}")]
    Encode(#[from] ron::Error),

    /// A value is out of range
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let path = std::env::temp_dir().join("nodenote_config_does_not_exist.ron");
        let config = EditorConfig::load(&path).unwrap();
        assert_eq!(config, EditorConfig::default());
        assert_eq!(config.history_limit, 50);
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("nodenote_config_{}.ron", std::process::id()));
        let mut config = EditorConfig::default();
        config.history_limit = 12;
        config.layout.cell_spacing = 4.0;
        config.default_format = Format::Binary;
        config.save(&path).unwrap();

        let loaded = EditorConfig::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: EditorConfig = ron::from_str("(history_limit: 7)").unwrap();
        assert_eq!(config.history_limit, 7);
        assert_eq!(config.layout, LayoutConfig::default());
    }
}
