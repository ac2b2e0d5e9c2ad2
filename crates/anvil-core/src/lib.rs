pub mod config;
pub mod kernel;
pub mod module_system;
pub mod sandbox;
pub mod utils;

// Re-export key public types for the binary and for statically linked module units
pub use kernel::error::{Error, Result};
pub use config::ModuleSystemConfig;
pub use module_system::{
    Environment, LoadOutcome, Module, ModuleId, ModuleManager, ModuleMetadata, ModuleRegistry,
    ModuleVersion, ProcessModule,
};
pub use sandbox::{EnforcementMode, PermissionProvider, Sandbox};

#[cfg(test)]
mod tests;
