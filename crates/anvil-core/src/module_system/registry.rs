use std::collections::BTreeMap;
use std::sync::Arc;

use crate::module_system::module::{Module, ModuleId, ModuleKey};
use crate::module_system::version::ModuleVersion;

/// Deduplicating collection of modules keyed by (id, version).
///
/// Iteration follows key order (id, then version) so environments built from
/// the same registry contents come out identical.
#[derive(Debug, Default, Clone)]
pub struct ModuleRegistry {
    modules: BTreeMap<ModuleKey, Arc<Module>>,
}

impl ModuleRegistry {
    /// Create a new, empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `module` unless its (id, version) is already present.
    ///
    /// Returns `false` for a duplicate; the registered module is kept.
    pub fn add(&mut self, module: Module) -> bool {
        self.add_shared(Arc::new(module))
    }

    /// Same as [`add`](Self::add) for an already shared module
    pub fn add_shared(&mut self, module: Arc<Module>) -> bool {
        let key = module.key();
        if self.modules.contains_key(&key) {
            return false;
        }
        log::debug!("Registered module {}", key);
        self.modules.insert(key, module);
        true
    }

    /// Latest registered version of `id`
    pub fn get(&self, id: &ModuleId) -> Option<Arc<Module>> {
        self.entries_of(id).last().map(|(_, m)| Arc::clone(m))
    }

    /// Looks up a module by its textual id; `None` for ids that cannot exist.
    pub fn find(&self, id: &str) -> Option<Arc<Module>> {
        ModuleId::new(id).ok().and_then(|id| self.get(&id))
    }

    pub fn get_version(&self, id: &ModuleId, version: &ModuleVersion) -> Option<Arc<Module>> {
        let key = ModuleKey {
            id: id.clone(),
            version: version.clone(),
        };
        self.modules.get(&key).cloned()
    }

    pub fn contains(&self, id: &ModuleId, version: &ModuleVersion) -> bool {
        self.get_version(id, version).is_some()
    }

    /// All registered versions of `id`, oldest first
    pub fn versions_of(&self, id: &ModuleId) -> Vec<Arc<Module>> {
        self.entries_of(id).map(|(_, m)| Arc::clone(m)).collect()
    }

    /// Distinct module ids in order
    pub fn module_ids(&self) -> Vec<ModuleId> {
        let mut ids: Vec<ModuleId> = self.modules.keys().map(|k| k.id.clone()).collect();
        ids.dedup();
        ids
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Module>> {
        self.modules.values()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Copy-on-write access used by the startup passes
    pub(crate) fn modules_mut(&mut self) -> impl Iterator<Item = &mut Arc<Module>> {
        self.modules.values_mut()
    }

    fn entries_of<'a>(&'a self, id: &'a ModuleId) -> impl DoubleEndedIterator<Item = (&'a ModuleKey, &'a Arc<Module>)> + 'a {
        self.modules.iter().filter(move |(key, _)| &key.id == id)
    }
}
