//! Renderer configuration
//!
//! Capacity limits and feature toggles loaded from TOML at startup. Every
//! field has a default, so an empty file (or no file) yields a working
//! configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The TOML text did not parse or did not match the schema.
    #[error("invalid renderer configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level renderer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// Buffer capacity limits.
    pub limits: Limits,
    /// Mesh-shading preference when the device supports it.
    pub prefer_mesh_shading: bool,
}

/// Buffer capacity limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Limits {
    /// Material records allocated in the materials buffer.
    pub max_materials: usize,
    /// Model records allocated in the models buffer.
    pub max_models: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            prefer_mesh_shading: false,
        }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_materials: 2048,
            max_models: 4096,
        }
    }
}

impl RenderConfig {
    /// Parses a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_yields_defaults() {
        let config = RenderConfig::from_toml_str("").unwrap();
        assert_eq!(config, RenderConfig::default());
    }

    #[test]
    fn partial_overrides_keep_remaining_defaults() {
        let config = RenderConfig::from_toml_str(
            "prefer_mesh_shading = true\n\n[limits]\nmax_materials = 64\n",
        )
        .unwrap();

        assert!(config.prefer_mesh_shading);
        assert_eq!(config.limits.max_materials, 64);
        assert_eq!(config.limits.max_models, Limits::default().max_models);
    }

    #[test]
    fn unknown_fields_are_rejected()  {
        assert!(RenderConfig::from_toml_str("unknown_key = 1\n").is_err());
    }
}
