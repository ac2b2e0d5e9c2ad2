#![cfg(test)]

use std::fs;

use tempfile::tempdir;

use crate::config::ModuleSystemConfig;
use crate::module_system::module::CodeLocation;
use crate::module_system::ModuleId;
use crate::tests::integration::common::{config_with_paths, keys, strict_manager, write_module};

#[tokio::test]
async fn test_single_module_next_to_a_plain_file() {
    let dir_a = tempdir().unwrap();
    write_module(dir_a.path(), "p", r#"{ "id": "P", "version": "1.0.0" }"#, Some("{}"));
    fs::write(dir_a.path().join("changelog.txt"), "1.0.0: first release").unwrap();

    let manager = strict_manager(config_with_paths(&[dir_a.path()])).await;

    assert_eq!(keys(&manager), vec!["engine-0.1.0", "P-1.0.0"]);
    let primary = manager.environment().unwrap();
    assert_eq!(primary.module_ids(), vec![ModuleId::new("engine").unwrap()]);
}

#[tokio::test]
async fn test_first_search_path_wins_for_duplicates() {
    let dir_a = tempdir().unwrap();
    let dir_b = tempdir().unwrap();
    let first = write_module(dir_a.path(), "p", r#"{ "id": "p", "version": "1.0.0" }"#, Some("{}"));
    write_module(dir_b.path(), "p", r#"{ "id": "p", "version": "1.0.0" }"#, Some("{}"));
    write_module(dir_b.path(), "p2", r#"{ "id": "p", "version": "1.1.0" }"#, Some("{}"));

    let manager = strict_manager(config_with_paths(&[dir_a.path(), dir_b.path()])).await;

    assert_eq!(keys(&manager), vec!["engine-0.1.0", "p-1.0.0", "p-1.1.0"]);
    let p = manager
        .registry()
        .get_version(&ModuleId::new("p").unwrap(), &"1.0.0".parse().unwrap())
        .unwrap();
    assert_eq!(p.code().location(), &CodeLocation::Directory(first));
    assert_eq!(manager.discovery_summary().duplicates.len(), 1);
}

#[tokio::test]
async fn test_malformed_modules_do_not_stop_discovery() {
    let dir = tempdir().unwrap();
    write_module(dir.path(), "a-broken", r#"{ "id": "broken" "#, None);
    write_module(dir.path(), "b-no-version", r#"{ "id": "nov" }"#, None);
    write_module(dir.path(), "c-good", r#"{ "id": "good", "version": "0.3.0" }"#, None);
    fs::create_dir_all(dir.path().join("d-empty")).unwrap();

    let manager = strict_manager(config_with_paths(&[dir.path()])).await;

    assert_eq!(keys(&manager), vec!["engine-0.1.0", "good-0.3.0"]);
    let summary = manager.discovery_summary();
    assert_eq!(summary.malformed.len(), 2);
    assert_eq!(summary.not_modules, 1);
}

#[tokio::test]
async fn test_missing_search_path_is_not_an_error() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("nowhere");
    let manager = strict_manager(config_with_paths(&[&missing])).await;
    assert_eq!(keys(&manager), vec!["engine-0.1.0"]);
}

#[tokio::test]
async fn test_bootstrap_from_config_file() {
    let dir = tempdir().unwrap();
    let modules = dir.path().join("mods");
    write_module(&modules, "p", r#"{ "id": "p", "version": "2.0.0" }"#, Some("{}"));

    let config_path = dir.path().join("anvil.json");
    let config_text = format!(
        r#"{{ "module_paths": [{}], "permissive_security": true }}"#,
        serde_json::to_string(&modules).unwrap()
    );
    fs::write(&config_path, config_text).unwrap();

    let config = ModuleSystemConfig::load(&config_path).await.unwrap();
    let manager = crate::module_system::manager::ModuleManager::builder()
        .config(config)
        .load_process_modules(Some(false))
        .build()
        .await
        .unwrap();

    assert_eq!(keys(&manager), vec!["engine-0.1.0", "p-2.0.0"]);
}
