//! # Anvil Module System
//!
//! Discovers modules, registers them, and composes them into environments.
//!
//! Startup runs strictly in this order, driven by [`ModuleManager`]:
//! - **Metadata** (`metadata`, `extension`): parses `module.json` descriptors
//!   through a [`MetadataReader`] with typed extension fields.
//! - **Loading** (`loader`): turns a directory or an in-process unit into a
//!   [`Module`], either optimistically ([`LoadOutcome`]) or as a hard requirement.
//! - **Registry** (`registry`): deduplicates modules by id and version.
//! - **Discovery** (`discovery`): feeds module paths and process units through
//!   the loader into the registry.
//! - **Dependencies** (`dependency`): makes the engine the root of every
//!   dependency graph, resolves versions and orders modules.
//! - **Environments** (`environment`): capability-bounded module sets built
//!   on the [`Sandbox`](crate::sandbox::Sandbox).
pub mod dependency;
pub mod discovery;
pub mod environment;
pub mod error;
pub mod extension;
pub mod install;
pub mod loader;
pub mod manager;
pub mod metadata;
pub mod module;
pub mod registry;
pub mod version;

pub use dependency::{dependency_order, ensure_depend_on_engine, DependencyError, DependencyInfo, DependencyResolver};
pub use discovery::{resolve_load_process_modules, ModulePathScanner, ProcessModuleScanner, ScanSummary};
pub use environment::{Environment, EnvironmentBuilder};
pub use error::{MetadataError, ModuleLoadError, ModuleSystemError};
pub use extension::{ExtensionType, ExtensionValue, ExtraDataModuleExtension, ModuleExtension, StandardModuleExtension};
pub use install::InstallManager;
pub use loader::{LoadOutcome, ModuleLoader};
pub use manager::{ModuleManager, ModuleManagerBuilder};
pub use metadata::{MetadataReader, ModuleMetadata};
pub use module::{CodeLocation, CodeManifest, CodeSource, Module, ModuleCode, ModuleId, ModuleKey, ProcessModule};
pub use registry::ModuleRegistry;
pub use version::{ModuleVersion, VersionRange};

#[cfg(test)]
pub(crate) mod tests;
