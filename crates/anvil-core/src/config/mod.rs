//! # Module system configuration
//!
//! [`ModuleSystemConfig`] carries the search paths, the process-module toggle,
//! the enforcement-mode switch and whitelist extras. It can be read from JSON,
//! YAML (`yaml-config` feature) or TOML (`toml-config` feature) files, with the
//! format picked from the file extension.
pub mod error;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::kernel::constants::{DEFAULT_MODULES_DIR, MODULE_PATHS_ENV};

pub use error::ConfigError;

/// Supported configuration formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// JSON format (.json)
    Json,
    /// YAML format (.yaml, .yml) - requires "yaml-config" feature
    #[cfg(feature = "yaml-config")]
    Yaml,
    /// TOML format (.toml) - requires "toml-config" feature
    #[cfg(feature = "toml-config")]
    Toml,
}

impl ConfigFormat {
    pub fn name(&self) -> &'static str {
        match self {
            ConfigFormat::Json => "JSON",
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => "YAML",
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => "TOML",
        }
    }

    /// Determine format from file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_lowercase().as_str() {
                "json" => Some(ConfigFormat::Json),
                #[cfg(feature = "yaml-config")]
                "yaml" | "yml" => Some(ConfigFormat::Yaml),
                #[cfg(feature = "toml-config")]
                "toml" => Some(ConfigFormat::Toml),
                _ => None,
            })
    }
}

/// Settings for discovery and the sandbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleSystemConfig {
    /// Directories scanned for on-disk modules, in order
    pub module_paths: Vec<PathBuf>,
    /// Process property consulted when neither an argument nor the
    /// environment decides whether in-process units are scanned
    pub load_process_modules: Option<bool>,
    /// Process property selecting warn-only enforcement
    pub permissive_security: Option<bool>,
    /// Classes added to the engine API whitelist
    pub extra_api_classes: Vec<String>,
    /// Packages added to the engine API whitelist
    pub extra_api_packages: Vec<String>,
}

impl Default for ModuleSystemConfig {
    fn default() -> Self {
        Self {
            module_paths: vec![PathBuf::from(DEFAULT_MODULES_DIR)],
            load_process_modules: None,
            permissive_security: None,
            extra_api_classes: Vec::new(),
            extra_api_packages: Vec::new(),
        }
    }
}

impl ModuleSystemConfig {
    /// Parse configuration text in the given format
    pub fn parse(data: &str, format: ConfigFormat) -> Result<Self, ConfigError> {
        let parse_error = |message: String| ConfigError::Parse {
            format: format.name(),
            message,
        };
        match format {
            ConfigFormat::Json => serde_json::from_str(data).map_err(|e| parse_error(e.to_string())),
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => serde_yaml::from_str(data).map_err(|e| parse_error(e.to_string())),
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => toml::from_str(data).map_err(|e| parse_error(e.to_string())),
        }
    }

    /// Load configuration from a file, choosing the format by extension
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let format = ConfigFormat::from_path(path).ok_or_else(|| ConfigError::UnsupportedFormat(path.to_path_buf()))?;
        let data = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ConfigError::io(e, "read_config", path.to_path_buf()))?;
        let config = Self::parse(&data, format)?;
        log::debug!("Loaded module system configuration from {}", path.display());
        Ok(config)
    }

    /// Appends the directories listed in `ANVIL_MODULE_PATHS`.
    pub fn with_env_overrides(self) -> Self {
        let value = std::env::var_os(MODULE_PATHS_ENV);
        self.with_module_path_list(value.as_deref())
    }

    /// Appends directories from a platform path list (`a:b` on Unix).
    pub fn with_module_path_list(mut self, list: Option<&std::ffi::OsStr>) -> Self {
        if let Some(list) = list {
            for path in std::env::split_paths(list) {
                if !path.as_os_str().is_empty() && !self.module_paths.contains(&path) {
                    self.module_paths.push(path);
                }
            }
        }
        self
    }

    /// Add a module search path
    pub fn add_module_path<P: AsRef<Path>>(&mut self, path: P) {
        self.module_paths.push(path.as_ref().to_path_buf());
    }
}

/// Parses a boolean toggle the way process properties are read: only `true`
/// (any case) is true.
pub fn parse_flag(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

/// Resolves a toggle: explicit argument, then environment value, then
/// process property, then `false`.
pub fn resolve_toggle(name: &str, argument: Option<bool>, env_value: Option<&str>, property: Option<bool>) -> bool {
    let (value, source) = match (argument, env_value, property) {
        (Some(value), _, _) => (value, "argument"),
        (None, Some(raw), _) => (parse_flag(raw), "environment"),
        (None, None, Some(value)) => (value, "property"),
        (None, None, None) => (false, "default"),
    };
    log::debug!("{} = {} (from {})", name, value, source);
    value
}
