//! # Anvil Sandbox
//!
//! Restricts which classes and packages module code may call.
//!
//! Construction happens once after discovery: the [`ExternalApiWhitelist`]
//! seeds a [`PermissionSet`], the [`ApiScanner`] classifies every module's
//! declared references against it, and the engine adds its own grants. The
//! finished set is shared by both provider factories; which one an
//! environment uses depends on the [`EnforcementMode`].
pub mod error;
pub mod permission;
pub mod policy;
pub mod provider;
pub mod scanner;
pub mod whitelist;

use std::fmt;
use std::sync::Arc;

use crate::config::{resolve_toggle, ModuleSystemConfig};
use crate::kernel::constants::{PERMISSIVE_SECURITY_ENV, PERMISSIVE_SECURITY_PROPERTY};
use crate::module_system::registry::ModuleRegistry;

pub use error::SandboxError;
pub use permission::{Permission, PermissionSet};
pub use policy::{PolicyInstall, SecurityPolicy};
pub use provider::{
    PermissionProvider, PermissionProviderFactory, StandardPermissionProviderFactory, WarnOnlyProviderFactory,
};
pub use scanner::ApiScanner;
pub use whitelist::ExternalApiWhitelist;

/// How violations of the permission set are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnforcementMode {
    /// Violations fail with [`SandboxError::Denied`]
    Strict,
    /// Violations are logged and allowed; for development only
    Permissive,
}

impl EnforcementMode {
    /// Resolves the mode: `permissive` argument, then
    /// `ANVIL_PERMISSIVE_SECURITY`, then the `permissive_security` property.
    pub fn resolve(permissive: Option<bool>, config: &ModuleSystemConfig) -> Self {
        let env_value = std::env::var(PERMISSIVE_SECURITY_ENV).ok();
        let permissive = resolve_toggle(
            PERMISSIVE_SECURITY_PROPERTY,
            permissive,
            env_value.as_deref(),
            config.permissive_security,
        );
        if permissive {
            EnforcementMode::Permissive
        } else {
            EnforcementMode::Strict
        }
    }
}

impl fmt::Display for EnforcementMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnforcementMode::Strict => write!(f, "strict"),
            EnforcementMode::Permissive => write!(f, "permissive"),
        }
    }
}

/// The finished permission set and the factories built on it.
#[derive(Debug, Clone)]
pub struct Sandbox {
    permissions: Arc<PermissionSet>,
    strict: Arc<StandardPermissionProviderFactory>,
    permissive: Arc<WarnOnlyProviderFactory>,
}

impl Sandbox {
    /// Seeds, scans and grants. Building twice over the same registry gives
    /// equal permission sets.
    pub fn build(registry: &ModuleRegistry, whitelist: &ExternalApiWhitelist) -> Self {
        let mut permissions = PermissionSet::new();
        whitelist.seed(&mut permissions);
        ApiScanner::new().scan(registry, &mut permissions);
        whitelist::add_engine_grants(&mut permissions);

        let permissions = Arc::new(permissions);
        let strict = StandardPermissionProviderFactory::new(Arc::clone(&permissions));
        let permissive = WarnOnlyProviderFactory::new(strict.clone());
        log::debug!("Sandbox built over {} modules", registry.len());

        Self {
            permissions,
            strict: Arc::new(strict),
            permissive: Arc::new(permissive),
        }
    }

    pub fn permission_set(&self) -> &Arc<PermissionSet> {
        &self.permissions
    }

    /// Factory for the given mode
    pub fn factory(&self, mode: EnforcementMode) -> Arc<dyn PermissionProviderFactory> {
        match mode {
            EnforcementMode::Strict => self.strict.clone(),
            EnforcementMode::Permissive => self.permissive.clone(),
        }
    }

    /// Installs the process-wide security policy. Only the first call in a
    /// process installs anything.
    pub fn install_security_policy() -> PolicyInstall {
        policy::install()
    }
}
