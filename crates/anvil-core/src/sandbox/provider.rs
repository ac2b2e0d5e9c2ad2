use std::collections::{BTreeSet, VecDeque};
use std::fmt::Debug;
use std::sync::Arc;

use crate::module_system::module::{in_namespace, CodeLocation, Module, ModuleKey};
use crate::sandbox::error::SandboxError;
use crate::sandbox::permission::{Permission, PermissionSet};
use crate::sandbox::policy;
use crate::sandbox::EnforcementMode;

/// Answers capability checks for exactly one module.
pub trait PermissionProvider: Send + Sync + Debug {
    /// The module this provider speaks for
    fn module(&self) -> &ModuleKey;

    /// Whether the module may call `capability`
    fn is_permitted(&self, capability: &str) -> bool;

    /// Checks `capability`, failing or warning depending on the mode
    fn check(&self, capability: &str) -> Result<(), SandboxError>;

    /// Checks an extra grant for the package `origin` belongs to
    fn check_permission(&self, permission: Permission, origin: &str) -> Result<(), SandboxError>;

    /// References the scan found outside the API surface
    fn denied_references(&self) -> Vec<String>;
}

/// Creates providers for the modules of an environment.
pub trait PermissionProviderFactory: Send + Sync + Debug {
    fn mode(&self) -> EnforcementMode;

    /// Provider for `module`; `environment` is the full module set it runs in
    fn create(&self, module: &Arc<Module>, environment: &[Arc<Module>]) -> Arc<dyn PermissionProvider>;
}

/// Strict provider: anything outside the module's reach is denied.
#[derive(Debug)]
pub struct StandardPermissionProvider {
    module: ModuleKey,
    namespaces: BTreeSet<String>,
    permissions: Arc<PermissionSet>,
}

impl StandardPermissionProvider {
    pub fn new(module: &Module, environment: &[Arc<Module>], permissions: Arc<PermissionSet>) -> Self {
        Self {
            module: module.key(),
            namespaces: reachable_namespaces(module, environment),
            permissions,
        }
    }

    /// Namespaces of the module itself and of the modules it can reach
    pub fn namespaces(&self) -> &BTreeSet<String> {
        &self.namespaces
    }
}

impl PermissionProvider for StandardPermissionProvider {
    fn module(&self) -> &ModuleKey {
        &self.module
    }

    fn is_permitted(&self, capability: &str) -> bool {
        self.namespaces
            .iter()
            .any(|ns| in_namespace(capability, ns))
            || self.permissions.is_api(capability)
    }

    fn check(&self, capability: &str) -> Result<(), SandboxError> {
        if self.is_permitted(capability) {
            return Ok(());
        }
        let module = self.module.to_string();
        policy::report_denial(&module, capability);
        Err(SandboxError::Denied {
            module,
            capability: capability.to_string(),
        })
    }

    fn check_permission(&self, permission: Permission, origin: &str) -> Result<(), SandboxError> {
        if self.permissions.has_grant(origin, permission) {
            return Ok(());
        }
        let module = self.module.to_string();
        policy::report_denial(&module, origin);
        Err(SandboxError::PermissionDenied {
            module,
            permission,
            origin: origin.to_string(),
        })
    }

    fn denied_references(&self) -> Vec<String> {
        self.permissions
            .usage(&self.module)
            .map(|usage| usage.denied.iter().cloned().collect())
            .unwrap_or_default()
    }
}

/// Permissive provider: logs what strict mode would deny and allows it.
#[derive(Debug)]
pub struct WarnOnlyPermissionProvider {
    inner: StandardPermissionProvider,
}

impl WarnOnlyPermissionProvider {
    pub fn new(inner: StandardPermissionProvider) -> Self {
        Self { inner }
    }
}

impl PermissionProvider for WarnOnlyPermissionProvider {
    fn module(&self) -> &ModuleKey {
        self.inner.module()
    }

    fn is_permitted(&self, capability: &str) -> bool {
        self.inner.is_permitted(capability)
    }

    fn check(&self, capability: &str) -> Result<(), SandboxError> {
        if !self.inner.is_permitted(capability) {
            log::warn!(
                "Permissive sandbox: module {} accessed '{}', which strict mode denies",
                self.inner.module,
                capability
            );
        }
        Ok(())
    }

    fn check_permission(&self, permission: Permission, origin: &str) -> Result<(), SandboxError> {
        if !self.inner.permissions.has_grant(origin, permission) {
            log::warn!(
                "Permissive sandbox: module {} used {} for '{}' without a grant",
                self.inner.module,
                permission,
                origin
            );
        }
        Ok(())
    }

    fn denied_references(&self) -> Vec<String> {
        self.inner.denied_references()
    }
}

#[derive(Debug, Clone)]
pub struct StandardPermissionProviderFactory {
    permissions: Arc<PermissionSet>,
}

impl StandardPermissionProviderFactory {
    pub fn new(permissions: Arc<PermissionSet>) -> Self {
        Self { permissions }
    }
}

impl PermissionProviderFactory for StandardPermissionProviderFactory {
    fn mode(&self) -> EnforcementMode {
        EnforcementMode::Strict
    }

    fn create(&self, module: &Arc<Module>, environment: &[Arc<Module>]) -> Arc<dyn PermissionProvider> {
        Arc::new(StandardPermissionProvider::new(
            module,
            environment,
            Arc::clone(&self.permissions),
        ))
    }
}

/// Wraps the standard factory so every provider only warns.
#[derive(Debug, Clone)]
pub struct WarnOnlyProviderFactory {
    inner: StandardPermissionProviderFactory,
}

impl WarnOnlyProviderFactory {
    pub fn new(inner: StandardPermissionProviderFactory) -> Self {
        Self { inner }
    }
}

impl PermissionProviderFactory for WarnOnlyProviderFactory {
    fn mode(&self) -> EnforcementMode {
        EnforcementMode::Permissive
    }

    fn create(&self, module: &Arc<Module>, environment: &[Arc<Module>]) -> Arc<dyn PermissionProvider> {
        Arc::new(WarnOnlyPermissionProvider::new(StandardPermissionProvider::new(
            module,
            environment,
            Arc::clone(&self.inner.permissions),
        )))
    }
}

/// Own namespaces plus those of non-engine modules reachable through
/// dependencies that `environment` satisfies.
pub(crate) fn reachable_namespaces(module: &Module, environment: &[Arc<Module>]) -> BTreeSet<String> {
    let mut namespaces: BTreeSet<String> = module.code().namespaces().iter().cloned().collect();
    let mut visited: BTreeSet<ModuleKey> = BTreeSet::from([module.key()]);
    let mut queue: VecDeque<&Module> = VecDeque::from([module]);

    while let Some(current) = queue.pop_front() {
        for dependency in current.dependencies() {
            for candidate in environment.iter().filter(|m| dependency.is_satisfied_by(m)) {
                if matches!(candidate.code().location(), CodeLocation::Engine) {
                    continue;
                }
                if visited.insert(candidate.key()) {
                    namespaces.extend(candidate.code().namespaces().iter().cloned());
                    queue.push_back(candidate.as_ref());
                }
            }
        }
    }
    namespaces
}
