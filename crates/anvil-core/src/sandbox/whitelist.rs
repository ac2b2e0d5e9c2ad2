use std::collections::BTreeSet;

use crate::config::ModuleSystemConfig;
use crate::sandbox::permission::{Permission, PermissionSet};

/// Engine API packages every module may call
const ENGINE_API_PACKAGES: &[&str] = &[
    "anvil::api",
    "anvil::asset",
    "anvil::entity",
    "anvil::event",
    "anvil::i18n",
    "anvil::input",
    "anvil::math",
    "anvil::world",
    "anvil::world::block",
    "std::cmp",
    "std::collections",
    "std::fmt",
    "std::iter",
    "std::string",
    "std::vec",
    "log",
    "serde",
    "serde_json",
];

/// Individual types allowed even though their package is not
const ENGINE_API_CLASSES: &[&str] = &[
    "std::option::Option",
    "std::result::Result",
    "std::sync::Arc",
    "std::sync::Mutex",
    "std::sync::RwLock",
    "std::time::Duration",
    "std::time::Instant",
];

/// Packages that receive extra grants no module can declare for itself
const REFLECTION_PACKAGES: &[&str] = &["serde_json", "serde_json::value"];

/// The classes and packages modules may call into.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalApiWhitelist {
    classes: BTreeSet<String>,
    packages: BTreeSet<String>,
}

impl ExternalApiWhitelist {
    /// Empty whitelist
    pub fn new() -> Self {
        Self::default()
    }

    /// The engine's baseline API surface
    pub fn engine_default() -> Self {
        let mut whitelist = Self::new();
        ENGINE_API_PACKAGES.iter().for_each(|p| whitelist.add_package(p));
        ENGINE_API_CLASSES.iter().for_each(|c| whitelist.add_class(c));
        whitelist
    }

    /// Baseline plus the extras listed in the configuration
    pub fn from_config(config: &ModuleSystemConfig) -> Self {
        let mut whitelist = Self::engine_default();
        config.extra_api_classes.iter().for_each(|c| whitelist.add_class(c));
        config.extra_api_packages.iter().for_each(|p| whitelist.add_package(p));
        whitelist
    }

    pub fn add_class(&mut self, class: &str) {
        self.classes.insert(class.trim().to_string());
    }

    pub fn add_package(&mut self, package: &str) {
        self.packages.insert(package.trim().to_string());
    }

    pub fn classes(&self) -> &BTreeSet<String> {
        &self.classes
    }

    pub fn packages(&self) -> &BTreeSet<String> {
        &self.packages
    }

    /// Marks every whitelisted class and package as callable.
    pub fn seed(&self, permissions: &mut PermissionSet) {
        for class in &self.classes {
            permissions.add_api_class(class);
        }
        for package in &self.packages {
            permissions.add_api_package(package);
        }
    }
}

/// Grants the engine adds on behalf of third-party libraries.
pub fn add_engine_grants(permissions: &mut PermissionSet) {
    for package in REFLECTION_PACKAGES {
        permissions.grant(package, Permission::Reflection);
    }
}
