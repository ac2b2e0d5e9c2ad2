use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use libloading::Library;

use crate::module_system::dependency::{dependency_order, DependencyInfo};
use crate::module_system::error::ModuleSystemError;
use crate::module_system::module::{Module, ModuleId, ModuleKey};
use crate::sandbox::{
    EnforcementMode, PermissionProvider, PermissionProviderFactory, PolicyInstall, Sandbox, SandboxError,
};

static NEXT_ENVIRONMENT_ID: AtomicU64 = AtomicU64::new(1);

/// A capability-bounded view over a set of modules.
///
/// Modules are shared with the registry; the environment only owns the
/// composed view, the per-module providers and any libraries it opened.
#[derive(Debug)]
pub struct Environment {
    id: u64,
    modules: Vec<Arc<Module>>,
    providers: BTreeMap<ModuleKey, Arc<dyn PermissionProvider>>,
    mode: EnforcementMode,
    libraries: Mutex<HashMap<ModuleKey, Arc<Library>>>,
}

impl Environment {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Modules in load order, engine first
    pub fn modules(&self) -> &[Arc<Module>] {
        &self.modules
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn contains(&self, id: &ModuleId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: &ModuleId) -> Option<&Arc<Module>> {
        self.modules.iter().find(|m| m.id() == id)
    }

    pub fn module_ids(&self) -> Vec<ModuleId> {
        self.modules.iter().map(|m| m.id().clone()).collect()
    }

    pub fn enforcement_mode(&self) -> EnforcementMode {
        self.mode
    }

    pub fn permission_provider(&self, id: &ModuleId) -> Option<Arc<dyn PermissionProvider>> {
        let module = self.get(id)?;
        self.providers.get(&module.key()).cloned()
    }

    /// Checks whether `module_id` may call `capability` under this
    /// environment's enforcement mode.
    pub fn check_access(&self, module_id: &ModuleId, capability: &str) -> Result<(), ModuleSystemError> {
        let provider = self
            .permission_provider(module_id)
            .ok_or_else(|| ModuleSystemError::NotInEnvironment(module_id.to_string()))?;
        provider.check(capability)?;
        Ok(())
    }

    /// Required dependencies no module of this environment satisfies
    pub fn missing_dependencies(&self) -> Vec<(ModuleKey, DependencyInfo)> {
        let mut missing = Vec::new();
        for module in &self.modules {
            for dependency in module.dependencies() {
                if dependency.optional {
                    continue;
                }
                if !self.modules.iter().any(|m| dependency.is_satisfied_by(m)) {
                    missing.push((module.key(), dependency.clone()));
                }
            }
        }
        missing
    }

    /// Opens the native library a module declares, once per environment.
    ///
    /// Strict environments refuse modules whose code references anything
    /// outside the API surface.
    pub fn open_library(&self, module_id: &ModuleId) -> Result<Arc<Library>, ModuleSystemError> {
        let module = self
            .get(module_id)
            .ok_or_else(|| ModuleSystemError::NotInEnvironment(module_id.to_string()))?;
        let path = module
            .code()
            .library_path()
            .ok_or_else(|| ModuleSystemError::NoLibrary(module_id.to_string()))?;

        if self.mode == EnforcementMode::Strict {
            let denied = self
                .providers
                .get(&module.key())
                .map(|p| p.denied_references())
                .unwrap_or_default();
            if !denied.is_empty() {
                return Err(SandboxError::TaintedModule {
                    module: module.to_string(),
                    denied,
                }
                .into());
            }
        }

        let mut libraries = self.libraries.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(library) = libraries.get(&module.key()) {
            return Ok(Arc::clone(library));
        }

        log::info!("Opening native library {} for module {}", path.display(), module);
        // SAFETY: the library belongs to a module that passed the sandbox scan;
        // its initialisers are trusted to the same degree as its declared code.
        let library = unsafe { Library::new(&path) }.map_err(|source| ModuleSystemError::Library {
            module: module.to_string(),
            path: path.clone(),
            source,
        })?;
        let library = Arc::new(library);
        libraries.insert(module.key(), Arc::clone(&library));
        Ok(library)
    }
}

/// Builds environments and tracks the primary one.
#[derive(Debug, Clone)]
pub struct EnvironmentBuilder {
    engine: Arc<Module>,
    primary: Arc<RwLock<Option<Arc<Environment>>>>,
}

impl EnvironmentBuilder {
    pub fn new(engine: Arc<Module>) -> Self {
        Self {
            engine,
            primary: Arc::new(RwLock::new(None)),
        }
    }

    /// Builds an environment over `requested` plus the engine.
    ///
    /// The engine is always added, even when `requested` leaves it out. With
    /// `mark_primary` the result replaces the current primary environment;
    /// otherwise the primary is left untouched.
    pub fn build(
        &self,
        requested: &[Arc<Module>],
        factory: &dyn PermissionProviderFactory,
        mark_primary: bool,
    ) -> Result<Arc<Environment>, ModuleSystemError> {
        let mut members: Vec<Arc<Module>> = Vec::with_capacity(requested.len());
        for module in requested {
            if module.id() == self.engine.id() {
                continue;
            }
            match members.iter().find(|m| m.id() == module.id()) {
                Some(existing) if existing.key() != module.key() => {
                    log::warn!("Ignoring {} in environment: {} was requested first", module, existing);
                }
                Some(_) => {}
                None => members.push(Arc::clone(module)),
            }
        }

        let mut modules = Vec::with_capacity(members.len() + 1);
        modules.push(Arc::clone(&self.engine));
        modules.extend(dependency_order(&members)?);

        let mode = factory.mode();
        if mode == EnforcementMode::Strict && Sandbox::install_security_policy() == PolicyInstall::Installed {
            log::debug!("First strict environment installed the security policy");
        }

        let providers = modules
            .iter()
            .map(|m| (m.key(), factory.create(m, &modules)))
            .collect();

        let environment = Arc::new(Environment {
            id: NEXT_ENVIRONMENT_ID.fetch_add(1, Ordering::Relaxed),
            modules,
            providers,
            mode,
            libraries: Mutex::new(HashMap::new()),
        });

        for (module, dependency) in environment.missing_dependencies() {
            log::warn!("Environment {}: {} requires {} which is not included", environment.id, module, dependency);
        }

        log::info!(
            "Built {} environment {} with {} modules{}",
            mode,
            environment.id,
            environment.len(),
            if mark_primary { " (primary)" } else { "" }
        );

        if mark_primary {
            let mut primary = self.primary.write().unwrap_or_else(|e| e.into_inner());
            *primary = Some(Arc::clone(&environment));
        }
        Ok(environment)
    }

    /// The current primary environment
    pub fn primary(&self) -> Option<Arc<Environment>> {
        self.primary.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn engine(&self) -> &Arc<Module> {
        &self.engine
    }
}
