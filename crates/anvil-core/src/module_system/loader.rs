use std::io::ErrorKind;
use std::path::Path;

use tokio::fs;

use crate::kernel::constants::{ENGINE_MODULE_RESOURCE, MODULE_CODE_FILENAME, MODULE_INFO_FILENAME};
use crate::module_system::error::ModuleLoadError;
use crate::module_system::metadata::{MetadataReader, ModuleMetadata};
use crate::module_system::module::{CodeLocation, CodeManifest, CodeSource, Module, ModuleCode, ProcessModule};
use crate::utils::fs::is_contained_relative_path;

/// Result of an optimistic load.
#[derive(Debug)]
pub enum LoadOutcome {
    /// The location holds a valid module
    Loaded(Module),
    /// The location holds no module descriptor at all
    NotAModule,
    /// The location looks like a module but could not be read
    Malformed { location: String, error: ModuleLoadError },
}

impl LoadOutcome {
    pub fn module(self) -> Option<Module> {
        match self {
            LoadOutcome::Loaded(module) => Some(module),
            _ => None,
        }
    }
}

/// Turns code locations into [`Module`] handles.
#[derive(Debug, Clone, Default)]
pub struct ModuleLoader {
    reader: MetadataReader,
}

impl ModuleLoader {
    pub fn new(reader: MetadataReader) -> Self {
        Self { reader }
    }

    pub fn reader(&self) -> &MetadataReader {
        &self.reader
    }

    /// Loads a location that may or may not contain a module.
    ///
    /// Never fails: absence is `NotAModule`, anything else that goes wrong is
    /// logged and reported as `Malformed`.
    pub async fn attempt_load(&self, source: &CodeSource) -> LoadOutcome {
        match self.read_source(source).await {
            Ok(Some(module)) => LoadOutcome::Loaded(module),
            Ok(None) => {
                log::trace!("No module at {}", source);
                LoadOutcome::NotAModule
            }
            Err(error) => {
                log::warn!("Skipping {}: {}", source, error);
                LoadOutcome::Malformed {
                    location: source.to_string(),
                    error,
                }
            }
        }
    }

    /// Loads a location that is required to contain a module.
    pub async fn load_from(&self, source: &CodeSource) -> Result<Module, ModuleLoadError> {
        self.read_source(source)
            .await?
            .ok_or_else(|| ModuleLoadError::MissingDescriptor {
                location: source.to_string(),
            })
    }

    /// Loads the engine module from its embedded descriptor.
    pub fn load_engine<I, S>(&self, descriptor: &str, namespaces: I) -> Result<Module, ModuleLoadError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let metadata = self.parse(descriptor, ENGINE_MODULE_RESOURCE)?;
        Ok(Module::new(metadata, ModuleCode::engine(namespaces)))
    }

    async fn read_source(&self, source: &CodeSource) -> Result<Option<Module>, ModuleLoadError> {
        match source {
            CodeSource::Path(path) => self.read_directory(path).await,
            CodeSource::Process(unit) => self.read_process_unit(unit),
        }
    }

    async fn read_directory(&self, dir: &Path) -> Result<Option<Module>, ModuleLoadError> {
        let meta = fs::metadata(dir)
            .await
            .map_err(|e| ModuleLoadError::io(e, "metadata", dir.to_path_buf()))?;
        if !meta.is_dir() {
            return Ok(None);
        }

        let descriptor_path = dir.join(MODULE_INFO_FILENAME);
        let descriptor = match fs::read_to_string(&descriptor_path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ModuleLoadError::io(e, "read_descriptor", descriptor_path)),
        };
        let metadata = self.parse(&descriptor, &descriptor_path.display().to_string())?;

        let manifest = read_code_manifest(dir).await?;
        let code = ModuleCode::new(CodeLocation::Directory(dir.to_path_buf()), &metadata.id, manifest);
        Ok(Some(Module::new(metadata, code)))
    }

    fn read_process_unit(&self, unit: &ProcessModule) -> Result<Option<Module>, ModuleLoadError> {
        let Some(descriptor) = unit.descriptor() else {
            return Ok(None);
        };
        let metadata = self.parse(descriptor, &format!("process unit '{}'", unit.name()))?;
        let location = CodeLocation::Process {
            unit: unit.name().to_string(),
        };
        let code = ModuleCode::new(location, &metadata.id, Some(unit.code_manifest().clone()));
        Ok(Some(Module::new(metadata, code)))
    }

    fn parse(&self, descriptor: &str, location: &str) -> Result<ModuleMetadata, ModuleLoadError> {
        self.reader
            .read(descriptor)
            .map_err(|source| ModuleLoadError::Malformed {
                location: location.to_string(),
                source,
            })
    }
}

async fn read_code_manifest(dir: &Path) -> Result<Option<CodeManifest>, ModuleLoadError> {
    let path = dir.join(MODULE_CODE_FILENAME);
    let text = match fs::read_to_string(&path).await {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(ModuleLoadError::io(e, "read_code_manifest", path)),
    };

    let manifest: CodeManifest = serde_json::from_str(&text).map_err(|e| ModuleLoadError::CodeManifest {
        path: path.clone(),
        message: e.to_string(),
    })?;

    if let Some(library) = &manifest.library {
        if !is_contained_relative_path(library) {
            return Err(ModuleLoadError::CodeManifest {
                path,
                message: format!(
                    "library '{}' must be a relative path inside the module directory",
                    library.display()
                ),
            });
        }
    }
    Ok(Some(manifest))
}
