use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::module_system::module::{Module, ModuleId, ModuleKey};
use crate::module_system::registry::ModuleRegistry;
use crate::module_system::version::{ModuleVersion, VersionRange};

/// A module's dependency on a range of versions of another module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyInfo {
    /// The id of the required module
    pub id: ModuleId,

    /// Acceptable versions, `[min, max)`
    pub range: VersionRange,

    /// Optional dependencies are used when present but never required
    pub optional: bool,
}

/// Error that can occur when resolving dependencies
#[derive(Debug, Error)]
pub enum DependencyError {
    /// No version of the module is registered
    #[error("Module '{id}' required by {required_by} is not available")]
    MissingModule { id: String, required_by: String },

    /// Versions exist, but none fits every range
    #[error("No version of '{id}' satisfies {ranges} (available: {available})")]
    NoCompatibleVersion {
        id: String,
        ranges: String,
        available: String,
    },

    /// Dependency cycle detected
    #[error("Circular dependency detected: {}", .0.join(" -> "))]
    CyclicDependency(Vec<String>),
}

impl DependencyInfo {
    /// Create a new required dependency
    pub fn required(id: ModuleId, range: VersionRange) -> Self {
        Self { id, range, optional: false }
    }

    /// Create a new optional dependency
    pub fn optional(id: ModuleId, range: VersionRange) -> Self {
        Self { id, range, optional: true }
    }

    pub fn min_version(&self) -> &ModuleVersion {
        self.range.min()
    }

    pub fn max_version(&self) -> &ModuleVersion {
        self.range.max()
    }

    /// Check if a module satisfies this dependency
    pub fn is_satisfied_by(&self, module: &Module) -> bool {
        module.id() == &self.id && self.range.contains(module.version())
    }
}

impl fmt::Display for DependencyInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.range)?;
        if self.optional {
            write!(f, " (optional)")?;
        }
        Ok(())
    }
}

/// Makes the engine the root of every module's dependency graph.
///
/// Appends `{engine.id, [engine.version, engine.version.next_patch())}` to every
/// non-engine module. Modules already carrying that exact range are left
/// alone, so running the pass twice changes nothing. Returns the number of
/// modules that were updated.
pub fn ensure_depend_on_engine(registry: &mut ModuleRegistry, engine: &Module) -> usize {
    let engine_dependency = DependencyInfo::required(
        engine.id().clone(),
        VersionRange::patch_line(engine.version()),
    );

    let mut updated = 0;
    for module in registry.modules_mut() {
        if module.id() == engine.id() || module.dependencies().contains(&engine_dependency) {
            continue;
        }
        log::debug!("Adding engine dependency {} to module {}", engine_dependency, module);
        Arc::make_mut(module)
            .metadata_mut()
            .dependencies
            .push(engine_dependency.clone());
        updated += 1;
    }
    updated
}

/// Orders `modules` so every module follows the modules it depends on.
///
/// Only edges between members of the set count; ties are broken by key so
/// the result is reproducible.
pub fn dependency_order(modules: &[Arc<Module>]) -> Result<Vec<Arc<Module>>, DependencyError> {
    let by_key: BTreeMap<ModuleKey, &Arc<Module>> = modules.iter().map(|m| (m.key(), m)).collect();

    let mut in_degree: BTreeMap<&ModuleKey, usize> = by_key.keys().map(|k| (k, 0)).collect();
    let mut dependents: BTreeMap<&ModuleKey, Vec<&ModuleKey>> = BTreeMap::new();

    for (key, module) in &by_key {
        for dependency in module.dependencies() {
            for (candidate_key, candidate) in &by_key {
                if candidate_key != key && dependency.is_satisfied_by(candidate) {
                    dependents.entry(candidate_key).or_default().push(key);
                    *in_degree.entry(key).or_default() += 1;
                }
            }
        }
    }

    let mut ready: BTreeSet<&ModuleKey> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(key, _)| *key)
        .collect();
    let mut sorted = Vec::with_capacity(by_key.len());

    while let Some(key) = ready.pop_first() {
        if let Some(module) = by_key.get(key) {
            sorted.push(Arc::clone(*module));
        }
        for dependent in dependents.get(key).into_iter().flatten() {
            if let Some(degree) = in_degree.get_mut(dependent) {
                *degree -= 1;
                if *degree == 0 {
                    ready.insert(*dependent);
                }
            }
        }
    }

    if sorted.len() != by_key.len() {
        let placed: BTreeSet<ModuleKey> = sorted.iter().map(|m| m.key()).collect();
        let cycle = by_key
            .keys()
            .filter(|k| !placed.contains(*k))
            .map(ToString::to_string)
            .collect();
        return Err(DependencyError::CyclicDependency(cycle));
    }

    Ok(sorted)
}

/// Chooses concrete module versions for a set of requested ids.
pub struct DependencyResolver<'a> {
    registry: &'a ModuleRegistry,
}

struct Constraint {
    required_by: String,
    range: VersionRange,
}

enum Pass {
    Resolved(BTreeMap<ModuleId, Arc<Module>>),
    /// A version chosen earlier in the pass violates a range found later
    Conflict(ModuleKey),
}

impl<'a> DependencyResolver<'a> {
    pub fn new(registry: &'a ModuleRegistry) -> Self {
        Self { registry }
    }

    /// Selects the newest version of each root and of each dependency that
    /// satisfies every range declared on it. Optional dependencies are pulled
    /// in when a compatible version is registered. The result is in
    /// dependency order.
    pub fn resolve(&self, roots: &[ModuleId]) -> Result<Vec<Arc<Module>>, DependencyError> {
        self.resolve_with(None, roots)
    }

    /// Resolves the dependencies of one concrete module. The module keeps its
    /// own version and appears in the result, which need not be registered.
    pub fn resolve_for(&self, module: &Arc<Module>) -> Result<Vec<Arc<Module>>, DependencyError> {
        self.resolve_with(Some(module), &[module.id().clone()])
    }

    fn resolve_with(
        &self,
        pinned: Option<&Arc<Module>>,
        roots: &[ModuleId],
    ) -> Result<Vec<Arc<Module>>, DependencyError> {
        // Every conflict rejects one more registered version, so this ends
        let mut rejected: BTreeSet<ModuleKey> = BTreeSet::new();
        loop {
            match self.pass(pinned, roots, &rejected)? {
                Pass::Resolved(selected) => {
                    let modules: Vec<Arc<Module>> = selected.into_values().collect();
                    return dependency_order(&modules);
                }
                Pass::Conflict(key) => {
                    log::debug!("Dropping {} from resolution and starting over", key);
                    rejected.insert(key);
                }
            }
        }
    }

    fn candidates(
        &self,
        id: &ModuleId,
        pinned: Option<&Arc<Module>>,
        rejected: &BTreeSet<ModuleKey>,
    ) -> Vec<Arc<Module>> {
        match pinned {
            Some(module) if module.id() == id => vec![Arc::clone(module)],
            _ => self
                .registry
                .versions_of(id)
                .into_iter()
                .filter(|m| !rejected.contains(&m.key()))
                .collect(),
        }
    }

    fn pass(
        &self,
        pinned: Option<&Arc<Module>>,
        roots: &[ModuleId],
        rejected: &BTreeSet<ModuleKey>,
    ) -> Result<Pass, DependencyError> {
        let mut constraints: BTreeMap<ModuleId, Vec<Constraint>> = BTreeMap::new();
        let mut selected: BTreeMap<ModuleId, Arc<Module>> = BTreeMap::new();
        let mut queue: VecDeque<(ModuleId, String)> =
            roots.iter().map(|id| (id.clone(), "request".to_string())).collect();

        while let Some((id, required_by)) = queue.pop_front() {
            let candidates = self.candidates(&id, pinned, rejected);
            let registered = self.registry.versions_of(&id);
            if candidates.is_empty() && registered.is_empty() {
                return Err(DependencyError::MissingModule {
                    id: id.to_string(),
                    required_by,
                });
            }

            let ranges = constraints.get(&id).map(Vec::as_slice).unwrap_or_default();
            let Some(chosen) = candidates
                .iter()
                .rev()
                .find(|m| ranges.iter().all(|c| c.range.contains(m.version())))
            else {
                return Err(DependencyError::NoCompatibleVersion {
                    id: id.to_string(),
                    ranges: ranges
                        .iter()
                        .map(|c| format!("{} from {}", c.range, c.required_by))
                        .collect::<Vec<_>>()
                        .join(", "),
                    available: registered
                        .iter()
                        .map(|m| m.version().to_string())
                        .collect::<Vec<_>>()
                        .join(", "),
                });
            };

            if let Some(previous) = selected.get(&id) {
                if previous.key() == chosen.key() {
                    continue;
                }
                // Whatever the previous version pulled in may no longer be needed
                return Ok(Pass::Conflict(previous.key()));
            }

            log::debug!("Selected {} for '{}'", chosen, id);
            selected.insert(id.clone(), Arc::clone(chosen));

            let requirer = chosen.key().to_string();
            for dependency in chosen.dependencies() {
                if dependency.optional
                    && !self
                        .candidates(&dependency.id, pinned, rejected)
                        .iter()
                        .any(|m| dependency.range.contains(m.version()))
                {
                    log::debug!("Skipping optional dependency {} of {}", dependency, chosen);
                    continue;
                }
                constraints.entry(dependency.id.clone()).or_default().push(Constraint {
                    required_by: requirer.clone(),
                    range: dependency.range.clone(),
                });
                queue.push_back((dependency.id.clone(), requirer.clone()));
            }
        }

        Ok(Pass::Resolved(selected))
    }
}
