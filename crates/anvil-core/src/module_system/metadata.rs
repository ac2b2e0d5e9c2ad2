use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::module_system::dependency::DependencyInfo;
use crate::module_system::error::MetadataError;
use crate::module_system::extension::{
    ExtensionType, ExtensionValue, ExtraDataModuleExtension, ModuleExtension, StandardModuleExtension,
};
use crate::module_system::module::ModuleId;
use crate::module_system::version::{ModuleVersion, VersionRange};

// --- Intermediate struct for deserialization ---

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct RawDependencyInfo {
    id: String,
    #[serde(default)]
    min_version: Option<String>,
    #[serde(default)]
    max_version: Option<String>,
    #[serde(default)]
    optional: bool,
}

/// Minimum version assumed when a dependency omits `minVersion`
const DEFAULT_MIN_VERSION: ModuleVersion = ModuleVersion::new(1, 0, 0);

/// Declared identity, version, dependencies and extension fields of a module.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleMetadata {
    pub id: ModuleId,
    pub version: ModuleVersion,
    pub display_name: Option<String>,
    pub description: Option<String>,
    /// Ordered as authored; the normalizer appends the engine range last
    pub dependencies: Vec<DependencyInfo>,
    pub required_permissions: BTreeSet<String>,
    pub extensions: BTreeMap<String, ExtensionValue>,
}

impl ModuleMetadata {
    pub fn new(id: ModuleId, version: ModuleVersion) -> Self {
        Self {
            id,
            version,
            display_name: None,
            description: None,
            dependencies: Vec::new(),
            required_permissions: BTreeSet::new(),
            extensions: BTreeMap::new(),
        }
    }

    /// Add a dependency
    pub fn add_dependency(&mut self, dependency: DependencyInfo) -> &mut Self {
        self.dependencies.push(dependency);
        self
    }

    /// First dependency declared on `id`
    pub fn dependency_on(&self, id: &ModuleId) -> Option<&DependencyInfo> {
        self.dependencies.iter().find(|d| &d.id == id)
    }

    pub fn extension(&self, key: &str) -> Option<&ExtensionValue> {
        self.extensions.get(key)
    }

    /// Boolean extension, `false` when absent or not a bool
    pub fn extension_flag(&self, extension: &dyn ModuleExtension) -> bool {
        self.extensions
            .get(extension.key())
            .and_then(ExtensionValue::as_bool)
            .unwrap_or(false)
    }

    pub fn set_extension(&mut self, key: &str, value: ExtensionValue) {
        self.extensions.insert(key.to_string(), value);
    }

    /// Name for display, falling back to the id
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(self.id.as_str())
    }
}

/// Parses module descriptors.
///
/// Extension keys registered here are type-checked; any other key is kept as
/// an opaque JSON value so descriptors written for newer engines still load.
#[derive(Debug, Clone, Default)]
pub struct MetadataReader {
    extensions: BTreeMap<String, ExtensionType>,
}

impl MetadataReader {
    /// Reader without any registered extensions
    pub fn new() -> Self {
        Self::default()
    }

    /// Reader with every extension the engine ships registered
    pub fn with_engine_extensions() -> Self {
        let mut reader = Self::new();
        for ext in StandardModuleExtension::ALL {
            reader.register(&ext);
        }
        for ext in ExtraDataModuleExtension::ALL {
            reader.register(&ext);
        }
        reader
    }

    pub fn register_extension(&mut self, key: &str, value_type: ExtensionType) {
        log::debug!("Registering module extension '{}' as {}", key, value_type);
        self.extensions.insert(key.to_string(), value_type);
    }

    pub fn register(&mut self, extension: &dyn ModuleExtension) {
        self.register_extension(extension.key(), extension.value_type());
    }

    pub fn registered_type(&self, key: &str) -> Option<ExtensionType> {
        self.extensions.get(key).copied()
    }

    /// Parse a descriptor from a reader
    pub fn read_from<R: Read>(&self, reader: R) -> Result<ModuleMetadata, MetadataError> {
        let value: Value = serde_json::from_reader(reader)?;
        self.read_value(value)
    }

    /// Parse a descriptor from text
    pub fn read(&self, text: &str) -> Result<ModuleMetadata, MetadataError> {
        let value: Value = serde_json::from_str(text)?;
        self.read_value(value)
    }

    fn read_value(&self, value: Value) -> Result<ModuleMetadata, MetadataError> {
        let Value::Object(mut fields) = value else {
            return Err(MetadataError::NotAnObject);
        };

        let id = ModuleId::new(&take_string(&mut fields, "id")?.ok_or(MetadataError::MissingField("id"))?)?;
        let version_str = take_string(&mut fields, "version")?.ok_or(MetadataError::MissingField("version"))?;
        let version = parse_version("version", &version_str)?;

        let mut metadata = ModuleMetadata::new(id, version);
        metadata.display_name = take_display_name(&mut fields)?;
        metadata.description = take_string(&mut fields, "description")?;

        if let Some(raw) = fields.remove("dependencies") {
            let raw_deps: Vec<RawDependencyInfo> = serde_json::from_value(raw)?;
            for raw_dep in raw_deps {
                metadata.dependencies.push(convert_dependency(raw_dep)?);
            }
        }

        if let Some(raw) = fields.remove("requiredPermissions") {
            let perms: Vec<String> = serde_json::from_value(raw).map_err(|_| MetadataError::FieldType {
                field: "requiredPermissions".to_string(),
                expected: "list of strings",
            })?;
            metadata.required_permissions = perms.into_iter().collect();
        }

        // Whatever is left is an extension field
        for (key, raw) in fields {
            let value = match self.extensions.get(&key) {
                Some(value_type) => value_type.convert(&raw).ok_or_else(|| MetadataError::ExtensionType {
                    key: key.clone(),
                    expected: value_type.name(),
                })?,
                None => ExtensionValue::Opaque(raw),
            };
            metadata.extensions.insert(key, value);
        }

        Ok(metadata)
    }
}

fn take_string(fields: &mut Map<String, Value>, field: &'static str) -> Result<Option<String>, MetadataError> {
    match fields.remove(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(MetadataError::FieldType { field: field.to_string(), expected: "string" }),
    }
}

// displayName may be a plain string or a map of locale -> text
fn take_display_name(fields: &mut Map<String, Value>) -> Result<Option<String>, MetadataError> {
    match fields.remove("displayName") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Object(map)) => Ok(map
            .get("en")
            .or_else(|| map.values().next())
            .and_then(Value::as_str)
            .map(str::to_string)),
        Some(_) => Err(MetadataError::FieldType {
            field: "displayName".to_string(),
            expected: "string or map of strings",
        }),
    }
}

fn parse_version(field: &str, value: &str) -> Result<ModuleVersion, MetadataError> {
    ModuleVersion::parse(value).map_err(|source| MetadataError::InvalidVersion {
        field: field.to_string(),
        value: value.to_string(),
        source,
    })
}

fn convert_dependency(raw: RawDependencyInfo) -> Result<DependencyInfo, MetadataError> {
    let id = ModuleId::new(&raw.id)?;
    let min = match raw.min_version {
        Some(v) => parse_version("dependencies.minVersion", &v)?,
        None => DEFAULT_MIN_VERSION,
    };
    let max = match raw.max_version {
        Some(v) => parse_version("dependencies.maxVersion", &v)?,
        None => min.next_major(),
    };
    let range = VersionRange::new(min.clone(), max.clone()).ok_or_else(|| MetadataError::EmptyRange {
        id: id.to_string(),
        min: min.to_string(),
        max: max.to_string(),
    })?;
    Ok(DependencyInfo {
        id,
        range,
        optional: raw.optional,
    })
}
