use std::sync::Arc;

use crate::module_system::module::{in_namespace, CodeLocation, Module};
use crate::module_system::registry::ModuleRegistry;
use crate::sandbox::permission::{ModuleUsage, PermissionSet};
use crate::sandbox::provider::reachable_namespaces;

/// Classifies the references each module declares.
///
/// A reference is API when whitelisted and gets marked. It is module-internal
/// when it falls inside the module's own namespaces or those of non-engine
/// modules reachable through its dependencies. Anything else is denied. The
/// scan never widens the whitelist.
#[derive(Debug, Default)]
pub struct ApiScanner;

impl ApiScanner {
    pub fn new() -> Self {
        Self
    }

    pub fn scan(&self, registry: &ModuleRegistry, permissions: &mut PermissionSet) {
        let modules: Vec<Arc<Module>> = registry.iter().cloned().collect();

        for module in registry.iter() {
            if is_engine(module) || module.code().is_asset_only() {
                continue;
            }

            let namespaces = reachable_namespaces(module, &modules);
            let mut usage = ModuleUsage::default();
            for reference in module.code().uses() {
                if permissions.is_api(reference) {
                    usage.marked.insert(reference.to_string());
                } else if namespaces.iter().any(|ns| in_namespace(reference, ns)) {
                    log::trace!("{} uses module code {}", module, reference);
                } else {
                    log::warn!("Module {} references non-API code '{}'; calls into it will be denied", module, reference);
                    usage.denied.insert(reference.to_string());
                }
            }
            permissions.record_usage(module.key(), usage);
        }
    }
}

fn is_engine(module: &Module) -> bool {
    matches!(module.code().location(), CodeLocation::Engine)
}
