//! # Anvil Module System Errors
//!
//! Defines error types specific to the module system.
//!
//! [`MetadataError`] covers descriptor parsing, [`ModuleLoadError`] covers the
//! mandatory load contract, and [`ModuleSystemError`] is the umbrella used by
//! the manager and the environment builder. Recoverable problems never show up
//! here: the optimistic load contract reports them through
//! [`LoadOutcome`](crate::module_system::loader::LoadOutcome) instead.
use std::path::PathBuf;

use crate::module_system::dependency::DependencyError;
use crate::sandbox::error::SandboxError;

#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("Descriptor is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Descriptor must be a JSON object")]
    NotAnObject,

    #[error("Descriptor is missing required field '{0}'")]
    MissingField(&'static str),

    #[error("Field '{field}' has the wrong type: expected {expected}")]
    FieldType {
        field: String,
        expected: &'static str,
    },

    #[error("Invalid module id '{0}': ids are non-empty and use only ASCII letters, digits, '-', '_' and '.'")]
    InvalidModuleId(String),

    #[error("Invalid version '{value}' in field '{field}': {source}")]
    InvalidVersion {
        field: String,
        value: String,
        #[source]
        source: semver::Error,
    },

    #[error("Dependency on '{id}' has an empty range: min {min} is not below max {max}")]
    EmptyRange { id: String, min: String, max: String },

    #[error("Extension '{key}' expects a value of type {expected}")]
    ExtensionType {
        key: String,
        expected: &'static str,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ModuleLoadError {
    #[error("I/O error during '{operation}' on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("No module descriptor found at {location}")]
    MissingDescriptor { location: String },

    #[error("Malformed module descriptor at {location}: {source}")]
    Malformed {
        location: String,
        #[source]
        source: MetadataError,
    },

    #[error("Malformed code manifest at '{}': {message}", path.display())]
    CodeManifest { path: PathBuf, message: String },
}

impl ModuleLoadError {
    pub fn io(source: std::io::Error, operation: impl Into<String>, path: PathBuf) -> Self {
        ModuleLoadError::Io {
            source,
            operation: operation.into(),
            path,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ModuleSystemError {
    #[error("Module load failed: {0}")]
    Load(#[from] ModuleLoadError),

    #[error("Failed to load the engine module from '{resource}': {source}")]
    EngineModule {
        resource: String,
        #[source]
        source: ModuleLoadError,
    },

    #[error("Dependency resolution failed: {0}")]
    Dependency(#[from] DependencyError),

    #[error("Sandbox rejected the operation: {0}")]
    Sandbox(#[from] SandboxError),

    #[error("Module '{0}' is not part of this environment")]
    NotInEnvironment(String),

    #[error("Module '{0}' has no native library")]
    NoLibrary(String),

    #[error("Failed to open native library '{}' of module '{module}': {source}", path.display())]
    Library {
        module: String,
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    #[error("Install manager failed: {0}")]
    InstallManager(String),
}
