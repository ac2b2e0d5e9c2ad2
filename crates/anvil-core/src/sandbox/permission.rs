use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::module_system::module::ModuleKey;

/// Capabilities granted to packages beyond plain API access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Permission {
    /// Inspect and construct arbitrary types at runtime
    Reflection,
    FileSystem,
    Network,
    /// Load native libraries
    NativeCode,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::Reflection => "reflection",
            Permission::FileSystem => "file_system",
            Permission::Network => "network",
            Permission::NativeCode => "native_code",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reflection" => Ok(Permission::Reflection),
            "file_system" | "filesystem" => Ok(Permission::FileSystem),
            "network" => Ok(Permission::Network),
            "native_code" | "nativecode" => Ok(Permission::NativeCode),
            other => Err(format!("unknown permission '{}'", other)),
        }
    }
}

/// Package part of a capability path (`anvil::world::Block` -> `anvil::world`).
pub fn package_of(capability: &str) -> &str {
    capability.rsplit_once("::").map(|(package, _)| package).unwrap_or("")
}

/// Scan result for one module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleUsage {
    /// Whitelisted references the module uses
    pub marked: BTreeSet<String>,
    /// References outside the API surface
    pub denied: BTreeSet<String>,
}

/// Which classes and packages module code may call, plus extra grants.
///
/// Filled during sandbox construction and shared read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet {
    api_classes: BTreeMap<String, bool>,
    api_packages: BTreeMap<String, bool>,
    grants: BTreeMap<String, BTreeSet<Permission>>,
    module_usage: BTreeMap<ModuleKey, ModuleUsage>,
}

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_api_class(&mut self, class: &str) {
        self.api_classes.insert(class.to_string(), true);
    }

    pub fn add_api_package(&mut self, package: &str) {
        self.api_packages.insert(package.to_string(), true);
    }

    /// Whether `capability` is a whitelisted class, a whitelisted package, or
    /// a direct member of a whitelisted package. Package matches do not
    /// extend to sub-packages.
    pub fn is_api(&self, capability: &str) -> bool {
        let flagged = |map: &BTreeMap<String, bool>, key: &str| map.get(key).copied().unwrap_or(false);
        flagged(&self.api_classes, capability)
            || flagged(&self.api_packages, capability)
            || flagged(&self.api_packages, package_of(capability))
    }

    pub fn grant(&mut self, package: &str, permission: Permission) {
        self.grants.entry(package.to_string()).or_default().insert(permission);
    }

    /// Whether `origin`, or the package it belongs to, holds `permission`
    pub fn has_grant(&self, origin: &str, permission: Permission) -> bool {
        [origin, package_of(origin)]
            .iter()
            .any(|key| self.grants.get(*key).is_some_and(|set| set.contains(&permission)))
    }

    pub fn grants(&self) -> &BTreeMap<String, BTreeSet<Permission>> {
        &self.grants
    }

    pub(crate) fn record_usage(&mut self, module: ModuleKey, usage: ModuleUsage) {
        self.module_usage.insert(module, usage);
    }

    pub fn usage(&self, module: &ModuleKey) -> Option<&ModuleUsage> {
        self.module_usage.get(module)
    }

    pub fn api_classes(&self) -> impl Iterator<Item = &str> {
        self.api_classes.iter().filter(|(_, v)| **v).map(|(k, _)| k.as_str())
    }

    pub fn api_packages(&self) -> impl Iterator<Item = &str> {
        self.api_packages.iter().filter(|(_, v)| **v).map(|(k, _)| k.as_str())
    }
}
