use std::fmt;
use std::sync::Arc;

use crate::config::ModuleSystemConfig;
use crate::kernel::constants::{ENGINE_MODULE_DESCRIPTOR, ENGINE_MODULE_RESOURCE, ENGINE_NAMESPACE};
use crate::kernel::error::{Error, Result};
use crate::module_system::dependency::{ensure_depend_on_engine, DependencyResolver};
use crate::module_system::discovery::{resolve_load_process_modules, ModulePathScanner, ProcessModuleScanner, ScanSummary};
use crate::module_system::environment::{Environment, EnvironmentBuilder};
use crate::module_system::error::ModuleSystemError;
use crate::module_system::install::InstallManager;
use crate::module_system::loader::{LoadOutcome, ModuleLoader};
use crate::module_system::metadata::MetadataReader;
use crate::module_system::module::{CodeSource, Module, ModuleId, ProcessModule};
use crate::module_system::registry::ModuleRegistry;
use crate::sandbox::{EnforcementMode, ExternalApiWhitelist, PermissionProvider, Sandbox};

/// Configures and runs the startup pipeline.
pub struct ModuleManagerBuilder {
    config: ModuleSystemConfig,
    process_modules: Vec<ProcessModule>,
    load_process_modules: Option<bool>,
    permissive: Option<bool>,
    engine_descriptor: String,
    engine_namespaces: Vec<String>,
    whitelist: Option<ExternalApiWhitelist>,
    reader: MetadataReader,
    install_manager: Option<Box<dyn InstallManager>>,
}

impl Default for ModuleManagerBuilder {
    fn default() -> Self {
        Self {
            config: ModuleSystemConfig::default(),
            process_modules: Vec::new(),
            load_process_modules: None,
            permissive: None,
            engine_descriptor: ENGINE_MODULE_DESCRIPTOR.to_string(),
            engine_namespaces: vec![ENGINE_NAMESPACE.to_string()],
            whitelist: None,
            reader: MetadataReader::with_engine_extensions(),
            install_manager: None,
        }
    }
}

impl ModuleManagerBuilder {
    pub fn config(mut self, config: ModuleSystemConfig) -> Self {
        self.config = config;
        self
    }

    /// Units linked into this process, scanned when process-module loading is on
    pub fn process_modules(mut self, units: Vec<ProcessModule>) -> Self {
        self.process_modules = units;
        self
    }

    /// Explicit value for the process-module toggle; overrides env and config
    pub fn load_process_modules(mut self, enabled: Option<bool>) -> Self {
        self.load_process_modules = enabled;
        self
    }

    /// Explicit value for permissive enforcement; overrides env and config
    pub fn permissive(mut self, permissive: Option<bool>) -> Self {
        self.permissive = permissive;
        self
    }

    /// Replaces the embedded engine descriptor
    pub fn engine_descriptor(mut self, descriptor: impl Into<String>) -> Self {
        self.engine_descriptor = descriptor.into();
        self
    }

    /// Additional namespaces the engine module provides
    pub fn engine_namespace(mut self, namespace: &str) -> Self {
        self.engine_namespaces.push(namespace.to_string());
        self
    }

    /// Replaces the whitelist derived from the configuration
    pub fn whitelist(mut self, whitelist: ExternalApiWhitelist) -> Self {
        self.whitelist = Some(whitelist);
        self
    }

    pub fn metadata_reader(mut self, reader: MetadataReader) -> Self {
        self.reader = reader;
        self
    }

    pub fn install_manager(mut self, manager: Box<dyn InstallManager>) -> Self {
        self.install_manager = Some(manager);
        self
    }

    /// Runs discovery, normalization and sandbox construction, then builds
    /// the primary environment and attaches the install manager.
    pub async fn build(self) -> Result<ModuleManager> {
        let loader = ModuleLoader::new(self.reader);

        let engine = loader
            .load_engine(&self.engine_descriptor, self.engine_namespaces)
            .map_err(|source| ModuleSystemError::EngineModule {
                resource: ENGINE_MODULE_RESOURCE.to_string(),
                source,
            })?;
        let engine = Arc::new(engine);
        log::info!("Engine module {}", engine);

        let mut registry = ModuleRegistry::new();
        registry.add_shared(Arc::clone(&engine));

        let mut discovery = ScanSummary::default();
        if resolve_load_process_modules(self.load_process_modules, &self.config) {
            let scanner = ProcessModuleScanner::new(&loader);
            discovery.merge(scanner.scan(&mut registry, &self.process_modules).await);
        }
        let scanner = ModulePathScanner::new(&loader);
        discovery.merge(scanner.scan(&mut registry, &self.config.module_paths).await);

        let normalized = ensure_depend_on_engine(&mut registry, &engine);
        log::debug!("Engine dependency added to {} modules", normalized);

        let whitelist = self
            .whitelist
            .unwrap_or_else(|| ExternalApiWhitelist::from_config(&self.config));
        let sandbox = Sandbox::build(&registry, &whitelist);

        let manager = ModuleManager {
            config: self.config,
            permissive: self.permissive,
            loader,
            registry,
            engine: Arc::clone(&engine),
            whitelist,
            sandbox,
            environments: EnvironmentBuilder::new(engine),
            discovery,
        };

        let primary = manager.load_environment(&[], true)?;

        if let Some(install_manager) = self.install_manager {
            log::debug!("Attaching install manager '{}'", install_manager.name());
            install_manager.attach(Arc::clone(&primary)).await.map_err(|e| {
                Error::from(ModuleSystemError::InstallManager(format!(
                    "{}: {}",
                    install_manager.name(),
                    e
                )))
            })?;
        }

        Ok(manager)
    }
}

/// Owns the registry, the sandbox and the primary environment.
pub struct ModuleManager {
    config: ModuleSystemConfig,
    permissive: Option<bool>,
    loader: ModuleLoader,
    registry: ModuleRegistry,
    engine: Arc<Module>,
    whitelist: ExternalApiWhitelist,
    sandbox: Sandbox,
    environments: EnvironmentBuilder,
    discovery: ScanSummary,
}

impl fmt::Debug for ModuleManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleManager")
            .field("engine", &self.engine.key())
            .field("modules", &self.registry.len())
            .finish()
    }
}

impl ModuleManager {
    pub fn builder() -> ModuleManagerBuilder {
        ModuleManagerBuilder::default()
    }

    /// Bootstraps with the given configuration and no process units
    pub async fn new(config: ModuleSystemConfig) -> Result<Self> {
        Self::builder().config(config).build().await
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn engine_module(&self) -> &Arc<Module> {
        &self.engine
    }

    pub fn config(&self) -> &ModuleSystemConfig {
        &self.config
    }

    /// What startup discovery found
    pub fn discovery_summary(&self) -> &ScanSummary {
        &self.discovery
    }

    /// The primary environment
    pub fn environment(&self) -> Option<Arc<Environment>> {
        self.environments.primary()
    }

    pub fn metadata_reader(&self) -> &MetadataReader {
        self.loader.reader()
    }

    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    /// Enforcement mode used for the next environment build
    pub fn enforcement_mode(&self) -> EnforcementMode {
        EnforcementMode::resolve(self.permissive, &self.config)
    }

    /// Builds an environment over `modules` plus the engine.
    pub fn load_environment(&self, modules: &[Arc<Module>], as_primary: bool) -> Result<Arc<Environment>> {
        let factory = self.sandbox.factory(self.enforcement_mode());
        Ok(self.environments.build(modules, factory.as_ref(), as_primary)?)
    }

    /// Resolves `ids` and their dependencies, then builds an environment.
    pub fn resolve_environment(&self, ids: &[ModuleId], as_primary: bool) -> Result<Arc<Environment>> {
        let modules = DependencyResolver::new(&self.registry).resolve(ids)?;
        self.load_environment(&modules, as_primary)
    }

    /// Provider for `module` over its resolved dependencies, in the current
    /// enforcement mode. Works for any module, not only primary members.
    ///
    /// If the dependencies cannot be resolved the provider only covers the
    /// module itself and the whitelist.
    pub fn permission_provider(&self, module: &Arc<Module>) -> Arc<dyn PermissionProvider> {
        let environment = match DependencyResolver::new(&self.registry).resolve_for(module) {
            Ok(modules) => modules,
            Err(e) => {
                log::warn!("Could not resolve dependencies of {}: {}", module, e);
                vec![Arc::clone(&self.engine), Arc::clone(module)]
            }
        };
        self.sandbox
            .factory(self.enforcement_mode())
            .create(module, &environment)
    }

    /// Loads a unit that must contain a module and registers it.
    ///
    /// Takes `&mut self`, so late insertions are serialized by the caller.
    /// Returns the registered module; for a duplicate that is the module
    /// registered first.
    pub async fn load_process_module(&mut self, unit: ProcessModule) -> Result<Arc<Module>> {
        let module = self.loader.load_from(&CodeSource::Process(unit)).await?;
        self.register_late(module)
    }

    /// Like [`load_process_module`](Self::load_process_module), but a unit
    /// without a usable module yields `None`.
    pub async fn attempt_load_process_module(&mut self, unit: ProcessModule) -> Option<Arc<Module>> {
        match self.loader.attempt_load(&CodeSource::Process(unit)).await {
            LoadOutcome::Loaded(module) => self.register_late(module).ok(),
            LoadOutcome::NotAModule | LoadOutcome::Malformed { .. } => None,
        }
    }

    fn register_late(&mut self, module: Module) -> Result<Arc<Module>> {
        let key = module.key();
        if !self.registry.add(module) {
            log::warn!("Module {} is already registered; keeping the first one", key);
        }
        ensure_depend_on_engine(&mut self.registry, &self.engine);
        self.sandbox = Sandbox::build(&self.registry, &self.whitelist);

        self.registry
            .get_version(&key.id, &key.version)
            .ok_or_else(|| Error::Other(format!("module {} missing after registration", key)))
    }
}
