use std::path::PathBuf;

use crate::config::{resolve_toggle, ModuleSystemConfig};
use crate::kernel::constants::{LOAD_PROCESS_MODULES_ENV, LOAD_PROCESS_MODULES_PROPERTY};
use crate::module_system::loader::{LoadOutcome, ModuleLoader};
use crate::module_system::module::{CodeSource, ModuleKey, ProcessModule};
use crate::module_system::registry::ModuleRegistry;
use crate::utils::fs::list_dir_sorted;

/// What a discovery pass did with each candidate.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanSummary {
    pub loaded: Vec<ModuleKey>,
    pub duplicates: Vec<ModuleKey>,
    pub not_modules: usize,
    /// Locations that looked like modules but failed to load
    pub malformed: Vec<String>,
}

impl ScanSummary {
    pub fn merge(&mut self, other: ScanSummary) {
        self.loaded.extend(other.loaded);
        self.duplicates.extend(other.duplicates);
        self.not_modules += other.not_modules;
        self.malformed.extend(other.malformed);
    }

    fn record(&mut self, registry: &mut ModuleRegistry, source: &CodeSource, outcome: LoadOutcome) {
        match outcome {
            LoadOutcome::Loaded(module) => {
                let key = module.key();
                if registry.add(module) {
                    self.loaded.push(key);
                } else {
                    log::warn!(
                        "Module {} version {} from {} is already registered; keeping the first one",
                        key.id,
                        key.version,
                        source
                    );
                    self.duplicates.push(key);
                }
            }
            LoadOutcome::NotAModule => self.not_modules += 1,
            LoadOutcome::Malformed { location, .. } => self.malformed.push(location),
        }
    }
}

/// Scans module search paths for on-disk modules.
pub struct ModulePathScanner<'a> {
    loader: &'a ModuleLoader,
}

impl<'a> ModulePathScanner<'a> {
    pub fn new(loader: &'a ModuleLoader) -> Self {
        Self { loader }
    }

    /// Optimistically loads every immediate child of every path, in order.
    pub async fn scan(&self, registry: &mut ModuleRegistry, paths: &[PathBuf]) -> ScanSummary {
        let mut summary = ScanSummary::default();

        for dir in paths {
            let entries = match list_dir_sorted(dir).await {
                Ok(entries) if entries.is_empty() => {
                    log::debug!("Module path {} is empty or missing", dir.display());
                    continue;
                }
                Ok(entries) => entries,
                Err(e) => {
                    log::warn!("Cannot list module path {}: {}", dir.display(), e);
                    continue;
                }
            };

            log::debug!("Scanning {} entries in {}", entries.len(), dir.display());
            for entry in entries {
                let source = CodeSource::Path(entry);
                let outcome = self.loader.attempt_load(&source).await;
                summary.record(registry, &source, outcome);
            }
        }

        log::info!(
            "Discovered {} modules on disk ({} duplicates, {} failed)",
            summary.loaded.len(),
            summary.duplicates.len(),
            summary.malformed.len()
        );
        summary
    }
}

/// Scans units linked into the running process.
pub struct ProcessModuleScanner<'a> {
    loader: &'a ModuleLoader,
}

impl<'a> ProcessModuleScanner<'a> {
    pub fn new(loader: &'a ModuleLoader) -> Self {
        Self { loader }
    }

    pub async fn scan(&self, registry: &mut ModuleRegistry, units: &[ProcessModule]) -> ScanSummary {
        let mut summary = ScanSummary::default();
        for unit in units {
            let source = CodeSource::Process(unit.clone());
            let outcome = self.loader.attempt_load(&source).await;
            summary.record(registry, &source, outcome);
        }
        log::info!("Discovered {} modules in the running process", summary.loaded.len());
        summary
    }
}

/// Decides whether discovery also scans in-process units.
///
/// Precedence: `argument`, then `ANVIL_LOAD_PROCESS_MODULES`, then the
/// `load_process_modules` config property. Defaults to `false`.
pub fn resolve_load_process_modules(argument: Option<bool>, config: &ModuleSystemConfig) -> bool {
    let env_value = std::env::var(LOAD_PROCESS_MODULES_ENV).ok();
    resolve_toggle(
        LOAD_PROCESS_MODULES_PROPERTY,
        argument,
        env_value.as_deref(),
        config.load_process_modules,
    )
}
