//! # Anvil Core Errors
//!
//! [`Error`] is the crate-level error. Each subsystem keeps its own typed
//! error enum and converts into this one with `?`.
use std::result::Result as StdResult;

use thiserror::Error as ThisError;

use crate::config::ConfigError;
use crate::module_system::dependency::DependencyError;
use crate::module_system::error::{MetadataError, ModuleLoadError, ModuleSystemError};
use crate::sandbox::error::SandboxError;

#[derive(Debug, ThisError)]
pub enum Error {
    /// Specific, typed module system error
    #[error("Module system error: {0}")]
    ModuleSystem(#[from] ModuleSystemError),

    #[error("Module load error: {0}")]
    ModuleLoad(#[from] ModuleLoadError),

    #[error("Module metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("Dependency error: {0}")]
    Dependency(#[from] DependencyError),

    #[error("Sandbox error: {0}")]
    Sandbox(#[from] SandboxError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Generic error with message
    #[error("Error: {0}")]
    Other(String),
}

/// Shorthand for Result with our Error type
pub type Result<T> = StdResult<T, Error>;

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}
