use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::module_system::dependency::DependencyInfo;
use crate::module_system::error::MetadataError;
use crate::module_system::metadata::ModuleMetadata;
use crate::module_system::version::ModuleVersion;

/// Module identifier.
///
/// Ids compare case-insensitively; the authored spelling is kept for display.
#[derive(Debug, Clone)]
pub struct ModuleId {
    display: String,
    normalized: String,
}

impl ModuleId {
    /// Validates and creates an id.
    pub fn new(id: &str) -> Result<Self, MetadataError> {
        let trimmed = id.trim();
        let valid = !trimmed.is_empty()
            && trimmed
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(MetadataError::InvalidModuleId(id.to_string()));
        }
        Ok(Self {
            display: trimmed.to_string(),
            normalized: trimmed.to_ascii_lowercase(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.display
    }

    /// Lower-cased form used for comparisons
    pub fn normalized(&self) -> &str {
        &self.normalized
    }
}

impl PartialEq for ModuleId {
    fn eq(&self, other: &Self) -> bool {
        self.normalized == other.normalized
    }
}

impl Eq for ModuleId {}

impl Hash for ModuleId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized.hash(state);
    }
}

impl PartialOrd for ModuleId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ModuleId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.normalized.cmp(&other.normalized)
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

/// Registry key: a module is unique by id and version
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModuleKey {
    pub id: ModuleId,
    pub version: ModuleVersion,
}

impl fmt::Display for ModuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.id, self.version)
    }
}

/// Where a module's code lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeLocation {
    /// A module directory on disk
    Directory(PathBuf),
    /// A unit statically linked into the running process
    Process { unit: String },
    /// The engine itself
    Engine,
}

impl fmt::Display for CodeLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodeLocation::Directory(path) => write!(f, "{}", path.display()),
            CodeLocation::Process { unit } => write!(f, "process unit '{}'", unit),
            CodeLocation::Engine => write!(f, "engine"),
        }
    }
}

/// Declared API usage of a module's code, generated at build time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CodeManifest {
    /// Namespaces implemented by this module. Defaults to the module id.
    #[serde(default)]
    pub namespaces: Vec<String>,
    /// Classes and packages the code references
    #[serde(default)]
    pub uses: BTreeSet<String>,
    /// Native library, relative to the module directory
    #[serde(default)]
    pub library: Option<PathBuf>,
}

/// Code-access handle of a module.
#[derive(Debug, Clone)]
pub struct ModuleCode {
    location: CodeLocation,
    namespaces: BTreeSet<String>,
    manifest: Option<CodeManifest>,
}

impl ModuleCode {
    /// Builds the handle. Without a manifest the module is asset-only and
    /// provides no namespaces.
    pub fn new(location: CodeLocation, id: &ModuleId, manifest: Option<CodeManifest>) -> Self {
        let namespaces = match &manifest {
            Some(m) if !m.namespaces.is_empty() => m.namespaces.iter().cloned().collect(),
            Some(_) => BTreeSet::from([default_namespace(id)]),
            None => BTreeSet::new(),
        };
        Self { location, namespaces, manifest }
    }

    /// Handle for the engine: provides the given namespaces, declares no usage.
    pub fn engine<I, S>(namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            location: CodeLocation::Engine,
            namespaces: namespaces.into_iter().map(Into::into).collect(),
            manifest: None,
        }
    }

    pub fn location(&self) -> &CodeLocation {
        &self.location
    }

    pub fn namespaces(&self) -> &BTreeSet<String> {
        &self.namespaces
    }

    pub fn manifest(&self) -> Option<&CodeManifest> {
        self.manifest.as_ref()
    }

    /// Modules without a code manifest only supply assets
    pub fn is_asset_only(&self) -> bool {
        self.manifest.is_none()
    }

    /// Declared references, empty for asset-only modules
    pub fn uses(&self) -> impl Iterator<Item = &str> {
        self.manifest.iter().flat_map(|m| m.uses.iter().map(String::as_str))
    }

    /// Does `capability` live inside one of this module's namespaces?
    pub fn provides(&self, capability: &str) -> bool {
        self.namespaces.iter().any(|ns| in_namespace(capability, ns))
    }

    /// Absolute path of the native library, if one is declared
    pub fn library_path(&self) -> Option<PathBuf> {
        let library = self.manifest.as_ref()?.library.as_ref()?;
        match &self.location {
            CodeLocation::Directory(dir) => Some(dir.join(library)),
            _ => Some(library.clone()),
        }
    }
}

/// Crate-style namespace derived from an id (`Core-Sample` -> `core_sample`)
pub fn default_namespace(id: &ModuleId) -> String {
    id.normalized().replace(['-', '.'], "_")
}

/// `capability` equals `namespace` or is nested below it
pub(crate) fn in_namespace(capability: &str, namespace: &str) -> bool {
    capability == namespace
        || capability
            .strip_prefix(namespace)
            .is_some_and(|rest| rest.starts_with("::"))
}

/// A discoverable, versioned unit of code plus its declared dependencies.
#[derive(Debug, Clone)]
pub struct Module {
    metadata: ModuleMetadata,
    code: ModuleCode,
}

impl Module {
    pub fn new(metadata: ModuleMetadata, code: ModuleCode) -> Self {
        Self { metadata, code }
    }

    pub fn id(&self) -> &ModuleId {
        &self.metadata.id
    }

    pub fn version(&self) -> &ModuleVersion {
        &self.metadata.version
    }

    pub fn key(&self) -> ModuleKey {
        ModuleKey {
            id: self.metadata.id.clone(),
            version: self.metadata.version.clone(),
        }
    }

    pub fn metadata(&self) -> &ModuleMetadata {
        &self.metadata
    }

    pub(crate) fn metadata_mut(&mut self) -> &mut ModuleMetadata {
        &mut self.metadata
    }

    pub fn code(&self) -> &ModuleCode {
        &self.code
    }

    pub fn dependencies(&self) -> &[DependencyInfo] {
        &self.metadata.dependencies
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.metadata.id, self.metadata.version)
    }
}

/// A module unit statically linked into the process.
///
/// Units are handed to the manager by the host binary; they play the role of
/// modules found on the process's own code path. A unit without a descriptor
/// is a linked crate that is not a module.
#[derive(Debug, Clone)]
pub struct ProcessModule {
    name: String,
    descriptor: Option<Cow<'static, str>>,
    code: CodeManifest,
}

impl ProcessModule {
    pub fn new(name: &str, descriptor: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.to_string(),
            descriptor: Some(descriptor.into()),
            code: CodeManifest::default(),
        }
    }

    /// A linked unit that carries no descriptor
    pub fn without_descriptor(name: &str) -> Self {
        Self {
            name: name.to_string(),
            descriptor: None,
            code: CodeManifest::default(),
        }
    }

    /// Add a namespace implemented by this unit
    pub fn namespace(mut self, namespace: &str) -> Self {
        self.code.namespaces.push(namespace.to_string());
        self
    }

    /// Declare referenced classes or packages
    pub fn uses(mut self, capabilities: &[&str]) -> Self {
        self.code.uses.extend(capabilities.iter().map(|c| c.to_string()));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor(&self) -> Option<&str> {
        self.descriptor.as_deref()
    }

    pub fn code_manifest(&self) -> &CodeManifest {
        &self.code
    }
}

/// Input to the loader
#[derive(Debug, Clone)]
pub enum CodeSource {
    Path(PathBuf),
    Process(ProcessModule),
}

impl CodeSource {
    pub fn path<P: AsRef<Path>>(path: P) -> Self {
        CodeSource::Path(path.as_ref().to_path_buf())
    }
}

impl fmt::Display for CodeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodeSource::Path(path) => write!(f, "{}", path.display()),
            CodeSource::Process(unit) => write!(f, "process unit '{}'", unit.name),
        }
    }
}
