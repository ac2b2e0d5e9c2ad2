use std::fmt;
use serde::Serialize;

/// Value type an extension key is registered with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionType {
    Bool,
    Integer,
    Float,
    Text,
    TextList,
    /// Any JSON value, kept as-is
    Json,
}

impl ExtensionType {
    pub fn name(&self) -> &'static str {
        match self {
            ExtensionType::Bool => "bool",
            ExtensionType::Integer => "integer",
            ExtensionType::Float => "float",
            ExtensionType::Text => "string",
            ExtensionType::TextList => "list of strings",
            ExtensionType::Json => "json",
        }
    }

    /// Converts a raw descriptor value; `None` when the shape does not match.
    pub fn convert(&self, value: &serde_json::Value) -> Option<ExtensionValue> {
        use serde_json::Value;
        match (self, value) {
            (ExtensionType::Bool, Value::Bool(b)) => Some(ExtensionValue::Bool(*b)),
            (ExtensionType::Integer, Value::Number(n)) => n.as_i64().map(ExtensionValue::Integer),
            (ExtensionType::Float, Value::Number(n)) => n.as_f64().map(ExtensionValue::Float),
            (ExtensionType::Text, Value::String(s)) => Some(ExtensionValue::Text(s.clone())),
            (ExtensionType::TextList, Value::Array(items)) => items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
                .map(ExtensionValue::TextList),
            (ExtensionType::Json, other) => Some(ExtensionValue::Opaque(other.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for ExtensionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Typed extension value. Keys the reader does not know stay `Opaque`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ExtensionValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    TextList(Vec<String>),
    Opaque(serde_json::Value),
}

impl ExtensionValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ExtensionValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ExtensionValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// An extension field the engine registers with the metadata reader.
pub trait ModuleExtension {
    fn key(&self) -> &'static str;
    fn value_type(&self) -> ExtensionType;
}

/// Flags and settings every engine build understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardModuleExtension {
    ServerSideOnly,
    IsGameplay,
    IsAugmentation,
    IsLibrary,
    IsAsset,
    IsWorld,
    IsSpecial,
    DefaultWorldGenerator,
}

impl StandardModuleExtension {
    pub const ALL: [StandardModuleExtension; 8] = [
        StandardModuleExtension::ServerSideOnly,
        StandardModuleExtension::IsGameplay,
        StandardModuleExtension::IsAugmentation,
        StandardModuleExtension::IsLibrary,
        StandardModuleExtension::IsAsset,
        StandardModuleExtension::IsWorld,
        StandardModuleExtension::IsSpecial,
        StandardModuleExtension::DefaultWorldGenerator,
    ];
}

impl ModuleExtension for StandardModuleExtension {
    fn key(&self) -> &'static str {
        match self {
            StandardModuleExtension::ServerSideOnly => "serverSideOnly",
            StandardModuleExtension::IsGameplay => "isGameplay",
            StandardModuleExtension::IsAugmentation => "isAugmentation",
            StandardModuleExtension::IsLibrary => "isLibrary",
            StandardModuleExtension::IsAsset => "isAsset",
            StandardModuleExtension::IsWorld => "isWorld",
            StandardModuleExtension::IsSpecial => "isSpecial",
            StandardModuleExtension::DefaultWorldGenerator => "defaultWorldGenerator",
        }
    }

    fn value_type(&self) -> ExtensionType {
        match self {
            StandardModuleExtension::DefaultWorldGenerator => ExtensionType::Text,
            _ => ExtensionType::Bool,
        }
    }
}

/// Descriptive fields used by module browsers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtraDataModuleExtension {
    Author,
    Origin,
    Tags,
}

impl ExtraDataModuleExtension {
    pub const ALL: [ExtraDataModuleExtension; 3] = [
        ExtraDataModuleExtension::Author,
        ExtraDataModuleExtension::Origin,
        ExtraDataModuleExtension::Tags,
    ];
}

impl ModuleExtension for ExtraDataModuleExtension {
    fn key(&self) -> &'static str {
        match self {
            ExtraDataModuleExtension::Author => "author",
            ExtraDataModuleExtension::Origin => "origin",
            ExtraDataModuleExtension::Tags => "tags",
        }
    }

    fn value_type(&self) -> ExtensionType {
        match self {
            ExtraDataModuleExtension::Tags => ExtensionType::TextList,
            _ => ExtensionType::Text,
        }
    }
}
