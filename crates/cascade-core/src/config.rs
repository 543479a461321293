//! Engine configuration
//!
//! ```toml
//! hook_mode = "listeners"
//! language_folder = "lang/validation"
//! ```

use crate::errors::{CascadeError, Result};
use serde::Deserialize;
use std::path::Path;

/// How record hooks are dispatched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookMode {
    /// The engine calls each declared hook itself
    #[default]
    Direct,
    /// Hooks are bound to lifecycle events and only fire through them
    Listeners,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    #[serde(default)]
    pub hook_mode: HookMode,
    /// Prefix of message catalog keys
    #[serde(default = "default_language_folder")]
    pub language_folder: String,
}

fn default_language_folder() -> String {
    "validation".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            hook_mode: HookMode::default(),
            language_folder: default_language_folder(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| CascadeError::Configuration {
            message: format!("cannot read {}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&source)
    }

    pub fn with_hook_mode(mut self, mode: HookMode) -> Self {
        self.hook_mode = mode;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_document_gives_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.language_folder, "validation");
        assert_eq!(config.hook_mode, HookMode::Direct);
    }

    #[test]
    fn test_listener_mode_parses() {
        let config =
            EngineConfig::from_toml_str("hook_mode = \"listeners\"\nlanguage_folder = \"lang\"")
                .unwrap();
        assert_eq!(config.hook_mode, HookMode::Listeners);
        assert_eq!(config.language_folder, "lang");
    }

    #[test]
    fn test_unknown_key_is_configuration_error() {
        let err = EngineConfig::from_toml_str("hook_mod = \"direct\"").unwrap_err();
        assert!(matches!(err, CascadeError::Configuration { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "hook_mode = \"listeners\"").unwrap();

        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.hook_mode, HookMode::Listeners);
    }

    #[test]
    fn test_load_missing_file() {
        let err = EngineConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, CascadeError::Configuration { .. }));
    }
}
