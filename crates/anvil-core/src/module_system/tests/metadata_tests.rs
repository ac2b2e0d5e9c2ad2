#![cfg(test)]

use crate::module_system::error::MetadataError;
use crate::module_system::extension::{
    ExtensionType, ExtensionValue, ExtraDataModuleExtension, ModuleExtension, StandardModuleExtension,
};
use crate::module_system::metadata::MetadataReader;
use crate::module_system::tests::fixtures::{id, range, v};

const FULL_DESCRIPTOR: &str = r#"{
    "id": "Core-Sample",
    "version": "1.4.0",
    "displayName": { "en": "Core Sample", "de": "Kernbeispiel" },
    "description": "Sample gameplay module",
    "dependencies": [
        { "id": "physics", "minVersion": "2.1.0", "maxVersion": "2.5.0" },
        { "id": "music", "minVersion": "0.3.0", "optional": true }
    ],
    "requiredPermissions": ["network"],
    "isGameplay": true,
    "serverSideOnly": false,
    "defaultWorldGenerator": "core-sample:flat",
    "author": "Anvil Developers",
    "tags": ["sample", "core"],
    "futureField": { "nested": [1, 2, 3] }
}"#;

#[test]
fn test_read_full_descriptor() {
    let reader = MetadataReader::with_engine_extensions();
    let metadata = reader.read(FULL_DESCRIPTOR).unwrap();

    assert_eq!(metadata.id, id("core-sample"));
    assert_eq!(metadata.id.as_str(), "Core-Sample");
    assert_eq!(metadata.version, v("1.4.0"));
    assert_eq!(metadata.display_name(), "Core Sample");
    assert_eq!(metadata.description.as_deref(), Some("Sample gameplay module"));
    assert!(metadata.required_permissions.contains("network"));

    assert_eq!(metadata.dependencies.len(), 2);
    let physics = &metadata.dependencies[0];
    assert_eq!(physics.id, id("physics"));
    assert_eq!(physics.range, range("2.1.0", "2.5.0"));
    assert!(!physics.optional);

    let music = &metadata.dependencies[1];
    assert!(music.optional);
    // maxVersion defaults to the next major
    assert_eq!(music.range, range("0.3.0", "1.0.0"));
}

#[test]
fn test_registered_extensions_are_typed() {
    let reader = MetadataReader::with_engine_extensions();
    let metadata = reader.read(FULL_DESCRIPTOR).unwrap();

    assert!(metadata.extension_flag(&StandardModuleExtension::IsGameplay));
    assert!(!metadata.extension_flag(&StandardModuleExtension::ServerSideOnly));
    assert!(!metadata.extension_flag(&StandardModuleExtension::IsLibrary));
    assert_eq!(
        metadata.extension("defaultWorldGenerator").and_then(ExtensionValue::as_str),
        Some("core-sample:flat")
    );
    assert_eq!(
        metadata.extension(ExtraDataModuleExtension::Tags.key()),
        Some(&ExtensionValue::TextList(vec!["sample".into(), "core".into()]))
    );
}

#[test]
fn test_unknown_extensions_are_kept_opaque() {
    let reader = MetadataReader::with_engine_extensions();
    let metadata = reader.read(FULL_DESCRIPTOR).unwrap();

    assert_eq!(
        metadata.extension("futureField"),
        Some(&ExtensionValue::Opaque(serde_json::json!({ "nested": [1, 2, 3] })))
    );
}

#[test]
fn test_unregistered_reader_keeps_everything_opaque() {
    let reader = MetadataReader::new();
    let metadata = reader.read(FULL_DESCRIPTOR).unwrap();
    assert_eq!(
        metadata.extension("isGameplay"),
        Some(&ExtensionValue::Opaque(serde_json::Value::Bool(true)))
    );
}

#[test]
fn test_custom_extension_registration() {
    let mut reader = MetadataReader::new();
    reader.register_extension("maxPlayers", ExtensionType::Integer);
    assert_eq!(reader.registered_type("maxPlayers"), Some(ExtensionType::Integer));

    let metadata = reader
        .read(r#"{ "id": "arena", "version": "1.0.0", "maxPlayers": 16 }"#)
        .unwrap();
    assert_eq!(metadata.extension("maxPlayers"), Some(&ExtensionValue::Integer(16)));
}

#[test]
fn test_wrong_extension_type_is_rejected() {
    let reader = MetadataReader::with_engine_extensions();
    let err = reader
        .read(r#"{ "id": "m", "version": "1.0.0", "isLibrary": "yes" }"#)
        .unwrap_err();
    assert!(matches!(err, MetadataError::ExtensionType { ref key, .. } if key == "isLibrary"));
}

#[test]
fn test_missing_required_fields() {
    let reader = MetadataReader::new();
    assert!(matches!(
        reader.read(r#"{ "version": "1.0.0" }"#),
        Err(MetadataError::MissingField("id"))
    ));
    assert!(matches!(
        reader.read(r#"{ "id": "m" }"#),
        Err(MetadataError::MissingField("version"))
    ));
}

#[test]
fn test_invalid_id_and_version() {
    let reader = MetadataReader::new();
    assert!(matches!(
        reader.read(r#"{ "id": "bad id!", "version": "1.0.0" }"#),
        Err(MetadataError::InvalidModuleId(_))
    ));
    assert!(matches!(
        reader.read(r#"{ "id": "m", "version": "latest" }"#),
        Err(MetadataError::InvalidVersion { .. })
    ));
}

#[test]
fn test_empty_dependency_range_is_rejected() {
    let reader = MetadataReader::new();
    let err = reader
        .read(r#"{ "id": "m", "version": "1.0.0",
                  "dependencies": [{ "id": "x", "minVersion": "2.0.0", "maxVersion": "1.0.0" }] }"#)
        .unwrap_err();
    assert!(matches!(err, MetadataError::EmptyRange { .. }));
}

#[test]
fn test_dependency_without_min_version_starts_at_one() {
    let reader = MetadataReader::new();
    let metadata = reader
        .read(r#"{ "id": "m", "version": "1.0.0", "dependencies": [{ "id": "x" }] }"#)
        .unwrap();
    assert_eq!(metadata.dependencies[0].range, range("1.0.0", "2.0.0"));
}

#[test]
fn test_not_an_object_and_bad_json() {
    let reader = MetadataReader::new();
    assert!(matches!(reader.read("[1, 2]"), Err(MetadataError::NotAnObject)));
    assert!(matches!(reader.read("{ nope"), Err(MetadataError::Json(_))));
}

#[test]
fn test_read_from_reader() {
    let reader = MetadataReader::new();
    let metadata = reader
        .read_from(r#"{ "id": "m", "version": "0.2.0", "displayName": "Plain" }"#.as_bytes())
        .unwrap();
    assert_eq!(metadata.display_name(), "Plain");
}
