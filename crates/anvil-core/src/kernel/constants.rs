/// Engine name
pub const ENGINE_NAME: &str = "Anvil";

/// Descriptor file expected inside every on-disk module directory
pub const MODULE_INFO_FILENAME: &str = "module.json";

/// Optional code manifest next to the descriptor; absent for asset-only modules
pub const MODULE_CODE_FILENAME: &str = "module-code.json";

/// Embedded descriptor of the engine module
pub const ENGINE_MODULE_DESCRIPTOR: &str = include_str!("../../resources/engine-module.json");

/// Resource name used when reporting errors about the embedded engine descriptor
pub const ENGINE_MODULE_RESOURCE: &str = "engine-module.json";

/// Set to "true" to also load modules statically linked into the running process
pub const LOAD_PROCESS_MODULES_ENV: &str = "ANVIL_LOAD_PROCESS_MODULES";

/// Config property consulted when neither an argument nor the env var decides
pub const LOAD_PROCESS_MODULES_PROPERTY: &str = "load_process_modules";

/// Set to "true" to log sandbox violations instead of denying them
pub const PERMISSIVE_SECURITY_ENV: &str = "ANVIL_PERMISSIVE_SECURITY";

/// Config property for the permissive security switch
pub const PERMISSIVE_SECURITY_PROPERTY: &str = "permissive_security";

/// Extra module search paths, in the platform's path-list syntax
pub const MODULE_PATHS_ENV: &str = "ANVIL_MODULE_PATHS";

/// Default module directory, relative to the working directory
pub const DEFAULT_MODULES_DIR: &str = "modules";

/// Namespace of the engine's own code
pub const ENGINE_NAMESPACE: &str = "anvil";
