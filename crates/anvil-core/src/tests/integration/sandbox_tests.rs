#![cfg(test)]

use tempfile::tempdir;

use crate::module_system::error::ModuleSystemError;
use crate::module_system::manager::ModuleManager;
use crate::module_system::ModuleId;
use crate::sandbox::{EnforcementMode, SandboxError};
use crate::tests::integration::common::{config_with_paths, strict_manager, write_module};
use crate::Error;

const TERRAIN: &str = r#"{
    "id": "terrain",
    "version": "1.0.0",
    "displayName": { "en": "Terrain", "de": "Gelände" },
    "dependencies": [ { "id": "noise", "minVersion": "1.0.0" } ]
}"#;

const TERRAIN_CODE: &str = r#"{
    "uses": ["anvil::world::Block", "noise::Perlin", "std::fs::File"]
}"#;

const NOISE: &str = r#"{ "id": "noise", "version": "1.2.0" }"#;

fn id(s: &str) -> ModuleId {
    ModuleId::new(s).unwrap()
}

#[tokio::test]
async fn test_strict_environment_end_to_end() {
    let dir = tempdir().unwrap();
    write_module(dir.path(), "terrain", TERRAIN, Some(TERRAIN_CODE));
    write_module(dir.path(), "noise", NOISE, Some("{}"));

    let manager = strict_manager(config_with_paths(&[dir.path()])).await;
    let env = manager.resolve_environment(&[id("terrain")], true).unwrap();

    assert_eq!(env.module_ids(), vec![id("engine"), id("noise"), id("terrain")]);
    assert!(env.check_access(&id("terrain"), "anvil::world::Block").is_ok());
    assert!(env.check_access(&id("terrain"), "noise::Perlin").is_ok());

    match env.check_access(&id("terrain"), "std::fs::File") {
        Err(ModuleSystemError::Sandbox(SandboxError::Denied { module, capability })) => {
            assert_eq!(module, "terrain-1.0.0");
            assert_eq!(capability, "std::fs::File");
        }
        other => panic!("expected a denial, got {:?}", other),
    }

    let terrain = manager.registry().find("terrain").unwrap();
    assert_eq!(terrain.metadata().display_name(), "Terrain");
    let provider = manager.permission_provider(&terrain);
    assert_eq!(provider.module(), &terrain.key());
    assert!(provider.is_permitted("noise::Perlin"));
    assert!(!provider.is_permitted("std::fs::File"));
}

#[tokio::test]
async fn test_permissive_environment_end_to_end() {
    let dir = tempdir().unwrap();
    write_module(dir.path(), "terrain", TERRAIN, Some(TERRAIN_CODE));
    write_module(dir.path(), "noise", NOISE, Some("{}"));

    let manager = ModuleManager::builder()
        .config(config_with_paths(&[dir.path()]))
        .load_process_modules(Some(false))
        .permissive(Some(true))
        .build()
        .await
        .unwrap();
    let env = manager.resolve_environment(&[id("terrain")], false).unwrap();

    assert_eq!(env.enforcement_mode(), EnforcementMode::Permissive);
    assert!(env.check_access(&id("terrain"), "std::fs::File").is_ok());
}

#[tokio::test]
async fn test_unresolvable_request() {
    let dir = tempdir().unwrap();
    write_module(dir.path(), "terrain", TERRAIN, Some(TERRAIN_CODE));

    let manager = strict_manager(config_with_paths(&[dir.path()])).await;
    let err = manager.resolve_environment(&[id("terrain")], false).unwrap_err();
    assert!(matches!(err, Error::Dependency(_)));
}
