//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/treecap/treecap.toml`
//! 3. Environment variables: `TREECAP_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;

/// Unified configuration for treecap.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Tree snapshot the CLI operates on (default: ./tree.json)
    pub store_path: PathBuf,
    /// Fail a clone when a payload's internal structure cannot be
    /// regenerated, instead of persisting the plain text rewrite
    pub strict_rewrite: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("tree.json"),
            strict_rewrite: false,
        }
    }
}

/// Raw settings for intermediate parsing (fields are Option to detect
/// "not specified" while merging layers).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    store_path: Option<PathBuf>,
    strict_rewrite: Option<bool>,
}

/// Get the XDG config directory for treecap.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "treecap").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("treecap.toml"))
}

fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            store_path: overlay
                .store_path
                .clone()
                .unwrap_or_else(|| self.store_path.clone()),
            strict_rewrite: overlay.strict_rewrite.unwrap_or(self.strict_rewrite),
        }
    }

    /// Load settings with layered precedence.
    pub fn load() -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.merge_with(&raw);
            }
        }

        current = Self::apply_env_overrides(current)?;
        Ok(current)
    }

    /// Apply TREECAP_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let builder =
            Config::builder().add_source(Environment::with_prefix("TREECAP").separator("__"));
        let config = builder.build().map_err(config_err)?;

        if let Ok(val) = config.get_string("store_path") {
            settings.store_path = PathBuf::from(val);
        }
        if let Ok(val) = config.get_bool("strict_rewrite") {
            settings.strict_rewrite = val;
        }

        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# treecap configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/treecap/treecap.toml
#   Env:    TREECAP_* environment variables (explicit overrides)

# Tree snapshot the CLI operates on
# store_path = "tree.json"

# Fail clones on payloads whose internal structure cannot be regenerated,
# instead of persisting the plain text rewrite
# strict_rewrite = false
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
