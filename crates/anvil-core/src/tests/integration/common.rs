#![cfg(test)]

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::ModuleSystemConfig;
use crate::module_system::manager::ModuleManager;

/// Writes `<base>/<dir_name>/module.json` and an optional code manifest
pub fn write_module(base: &Path, dir_name: &str, descriptor: &str, code_manifest: Option<&str>) -> PathBuf {
    let dir = base.join(dir_name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("module.json"), descriptor).unwrap();
    if let Some(manifest) = code_manifest {
        fs::write(dir.join("module-code.json"), manifest).unwrap();
    }
    dir
}

pub fn config_with_paths(paths: &[&Path]) -> ModuleSystemConfig {
    ModuleSystemConfig {
        module_paths: paths.iter().map(|p| p.to_path_buf()).collect(),
        ..ModuleSystemConfig::default()
    }
}

/// Strict manager without process units over `config`
pub async fn strict_manager(config: ModuleSystemConfig) -> ModuleManager {
    ModuleManager::builder()
        .config(config)
        .load_process_modules(Some(false))
        .permissive(Some(false))
        .build()
        .await
        .unwrap()
}

pub fn keys(manager: &ModuleManager) -> Vec<String> {
    manager.registry().iter().map(|m| m.key().to_string()).collect()
}
