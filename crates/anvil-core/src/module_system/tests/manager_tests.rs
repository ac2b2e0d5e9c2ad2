#![cfg(test)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::tempdir;

use crate::config::ModuleSystemConfig;
use crate::kernel::error::{Error, Result};
use crate::module_system::environment::Environment;
use crate::module_system::error::ModuleSystemError;
use crate::module_system::install::InstallManager;
use crate::module_system::manager::ModuleManager;
use crate::module_system::module::ProcessModule;
use crate::module_system::tests::fixtures::{descriptor, id, v, write_module_dir};
use crate::sandbox::EnforcementMode;

fn config_for(path: &std::path::Path) -> ModuleSystemConfig {
    ModuleSystemConfig {
        module_paths: vec![path.to_path_buf()],
        ..ModuleSystemConfig::default()
    }
}

fn sample_unit() -> ProcessModule {
    ProcessModule::new("sample", descriptor("sample", "1.0.0"))
        .namespace("sample")
        .uses(&["anvil::api::Context"])
}

#[tokio::test]
async fn test_bootstrap_discovers_and_builds_primary_environment() {
    let dir = tempdir().unwrap();
    write_module_dir(dir.path(), "p", &descriptor("P", "1.0.0"), Some("{}"));
    std::fs::write(dir.path().join("readme.md"), "# not a module").unwrap();

    let manager = ModuleManager::builder()
        .config(config_for(dir.path()))
        .load_process_modules(Some(false))
        .permissive(Some(false))
        .build()
        .await
        .unwrap();

    let ids: Vec<String> = manager.registry().iter().map(|m| m.key().to_string()).collect();
    assert_eq!(ids, vec!["engine-0.1.0", "P-1.0.0"]);
    assert_eq!(manager.discovery_summary().loaded.len(), 1);
    assert_eq!(manager.discovery_summary().not_modules, 1);

    let p = manager.registry().find("p").unwrap();
    let engine_dep = p.metadata().dependency_on(&id("engine")).unwrap();
    assert_eq!(engine_dep.min_version(), &v("0.1.0"));
    assert_eq!(engine_dep.max_version(), &v("0.2.0"));
    assert!(manager.engine_module().dependencies().is_empty());

    let primary = manager.environment().unwrap();
    assert_eq!(primary.module_ids(), vec![id("engine")]);
    assert_eq!(primary.enforcement_mode(), EnforcementMode::Strict);
}

#[tokio::test]
async fn test_process_modules_follow_the_toggle() {
    let dir = tempdir().unwrap();

    let enabled = ModuleManager::builder()
        .config(config_for(dir.path()))
        .process_modules(vec![sample_unit(), ProcessModule::without_descriptor("plain")])
        .load_process_modules(Some(true))
        .build()
        .await
        .unwrap();
    assert!(enabled.registry().find("sample").is_some());
    assert_eq!(enabled.registry().len(), 2);

    let disabled = ModuleManager::builder()
        .config(config_for(dir.path()))
        .process_modules(vec![sample_unit()])
        .load_process_modules(Some(false))
        .build()
        .await
        .unwrap();
    assert!(disabled.registry().find("sample").is_none());
}

#[tokio::test]
async fn test_permissive_argument_sets_mode() {
    let dir = tempdir().unwrap();
    let manager = ModuleManager::builder()
        .config(config_for(dir.path()))
        .permissive(Some(true))
        .build()
        .await
        .unwrap();

    assert_eq!(manager.enforcement_mode(), EnforcementMode::Permissive);
    assert_eq!(manager.environment().unwrap().enforcement_mode(), EnforcementMode::Permissive);
}

#[tokio::test]
async fn test_bad_engine_descriptor_is_fatal() {
    let dir = tempdir().unwrap();
    let result = ModuleManager::builder()
        .config(config_for(dir.path()))
        .engine_descriptor(r#"{ "id": "engine" }"#)
        .build()
        .await;

    assert!(matches!(
        result,
        Err(Error::ModuleSystem(ModuleSystemError::EngineModule { .. }))
    ));
}

#[tokio::test]
async fn test_late_process_module_is_normalized_and_scanned() {
    let dir = tempdir().unwrap();
    let mut manager = ModuleManager::builder()
        .config(config_for(dir.path()))
        .load_process_modules(Some(false))
        .build()
        .await
        .unwrap();

    let unit = ProcessModule::new("late", descriptor("late", "2.0.0")).uses(&["std::net::TcpStream"]);
    let module = manager.load_process_module(unit).await.unwrap();

    assert_eq!(module.version(), &v("2.0.0"));
    assert!(module.metadata().dependency_on(&id("engine")).is_some());
    let usage = manager.sandbox().permission_set().usage(&module.key()).unwrap();
    assert!(usage.denied.contains("std::net::TcpStream"));

    // Same key again: the first registration wins
    let again = ProcessModule::new("other-unit", descriptor("late", "2.0.0"));
    let kept = manager.load_process_module(again).await.unwrap();
    assert!(Arc::ptr_eq(&kept, &manager.registry().find("late").unwrap()));
    assert!(kept.code().uses().any(|u| u == "std::net::TcpStream"));
}

#[tokio::test]
async fn test_late_unit_without_module() {
    let dir = tempdir().unwrap();
    let mut manager = ModuleManager::builder()
        .config(config_for(dir.path()))
        .load_process_modules(Some(false))
        .build()
        .await
        .unwrap();

    let err = manager
        .load_process_module(ProcessModule::without_descriptor("plain"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ModuleLoad(_)));

    let attempted = manager
        .attempt_load_process_module(ProcessModule::without_descriptor("plain"))
        .await;
    assert!(attempted.is_none());
    assert_eq!(manager.registry().len(), 1);
}

#[tokio::test]
async fn test_resolve_environment_selects_dependencies() {
    let dir = tempdir().unwrap();
    write_module_dir(
        dir.path(),
        "app",
        r#"{ "id": "app", "version": "1.0.0",
             "dependencies": [ { "id": "lib", "minVersion": "1.0.0", "maxVersion": "2.0.0" } ] }"#,
        Some(r#"{ "uses": ["lib::Thing"] }"#),
    );
    write_module_dir(dir.path(), "lib-1.0.0", &descriptor("lib", "1.0.0"), Some("{}"));
    write_module_dir(dir.path(), "lib-1.5.0", &descriptor("lib", "1.5.0"), Some("{}"));

    let manager = ModuleManager::builder()
        .config(config_for(dir.path()))
        .permissive(Some(false))
        .build()
        .await
        .unwrap();
    let primary_id = manager.environment().unwrap().id();

    let env = manager.resolve_environment(&[id("app")], false).unwrap();
    let keys: Vec<String> = env.modules().iter().map(|m| m.key().to_string()).collect();
    assert_eq!(keys, vec!["engine-0.1.0", "lib-1.5.0", "app-1.0.0"]);
    assert!(env.check_access(&id("app"), "lib::Thing").is_ok());
    assert_eq!(manager.environment().unwrap().id(), primary_id);

    let primary = manager.resolve_environment(&[id("app")], true).unwrap();
    assert_eq!(manager.environment().unwrap().id(), primary.id());

    let err = manager.resolve_environment(&[id("missing")], false).unwrap_err();
    assert!(matches!(err, Error::Dependency(_)));
}

#[tokio::test]
async fn test_permission_provider_for_discovered_module() {
    let dir = tempdir().unwrap();
    let p_descriptor = r#"{
        "id": "p",
        "version": "1.0.0",
        "dependencies": [ { "id": "q", "minVersion": "1.0.0" } ]
    }"#;
    write_module_dir(dir.path(), "p", p_descriptor, Some("{}"));
    write_module_dir(dir.path(), "q", &descriptor("q", "1.0.0"), Some("{}"));
    write_module_dir(dir.path(), "r", &descriptor("r", "1.0.0"), Some("{}"));

    let manager = ModuleManager::builder()
        .config(config_for(dir.path()))
        .load_process_modules(Some(false))
        .permissive(Some(false))
        .build()
        .await
        .unwrap();

    // Only the engine is in the primary environment
    let p = manager.registry().find("p").unwrap();
    let provider = manager.permission_provider(&p);
    assert_eq!(provider.module(), &p.key());
    assert!(provider.is_permitted("p::Thing"));
    assert!(provider.is_permitted("q::Thing"));
    assert!(!provider.is_permitted("r::Thing"));
    assert!(!provider.is_permitted("std::fs::File"));

    let engine = Arc::clone(manager.engine_module());
    assert_eq!(manager.permission_provider(&engine).module(), &engine.key());
}

#[derive(Default)]
struct RecordingInstaller {
    attached: Mutex<Vec<u64>>,
    fail: bool,
}

#[async_trait]
impl InstallManager for Arc<RecordingInstaller> {
    fn name(&self) -> &str {
        "recording"
    }

    async fn attach(&self, environment: Arc<Environment>) -> Result<()> {
        self.attached.lock().unwrap().push(environment.id());
        if self.fail {
            return Err(Error::from("remote source unavailable"));
        }
        Ok(())
    }
}

#[tokio::test]
async fn test_install_manager_attached_to_primary() {
    let dir = tempdir().unwrap();
    let installer = Arc::new(RecordingInstaller::default());
    let manager = ModuleManager::builder()
        .config(config_for(dir.path()))
        .install_manager(Box::new(Arc::clone(&installer)))
        .build()
        .await
        .unwrap();

    let primary = manager.environment().unwrap();
    assert_eq!(*installer.attached.lock().unwrap(), vec![primary.id()]);
}

#[tokio::test]
async fn test_failing_install_manager_fails_bootstrap() {
    let dir = tempdir().unwrap();
    let installer = Arc::new(RecordingInstaller {
        fail: true,
        ..RecordingInstaller::default()
    });
    let result = ModuleManager::builder()
        .config(config_for(dir.path()))
        .install_manager(Box::new(installer))
        .build()
        .await;

    match result {
        Err(Error::ModuleSystem(ModuleSystemError::InstallManager(message))) => {
            assert!(message.contains("recording"));
        }
        other => panic!("expected install manager error, got {:?}", other.map(|_| ())),
    }
}
