use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn write_module(base: &Path, name: &str, descriptor: &str, code: Option<&str>) {
    let dir = base.join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("module.json"), descriptor).unwrap();
    if let Some(code) = code {
        fs::write(dir.join("module-code.json"), code).unwrap();
    }
}

/// Working directory with a `modules/` folder holding two modules
fn workspace() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let modules = dir.path().join("modules");
    write_module(
        &modules,
        "terrain",
        r#"{ "id": "terrain", "version": "1.0.0", "description": "Hills and valleys",
             "dependencies": [ { "id": "noise", "minVersion": "1.0.0" } ] }"#,
        Some(r#"{ "uses": ["anvil::world::Block", "noise::Perlin", "std::fs::File"] }"#),
    );
    write_module(&modules, "noise", r#"{ "id": "noise", "version": "1.2.0" }"#, Some("{}"));
    fs::write(modules.join("README.txt"), "not a module").unwrap();
    dir
}

fn anvil(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("anvil").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("ANVIL_LOAD_PROCESS_MODULES")
        .env_remove("ANVIL_PERMISSIVE_SECURITY")
        .env_remove("ANVIL_MODULE_PATHS");
    cmd
}

#[test]
fn test_modules_list() -> Result<(), Box<dyn std::error::Error>> {
    let dir = workspace();
    anvil(&dir)
        .args(["modules", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("engine 0.1.0"))
        .stdout(predicate::str::contains("noise 1.2.0"))
        .stdout(predicate::str::contains("terrain 1.0.0"))
        .stdout(predicate::str::contains("core-sample").not());
    Ok(())
}

#[test]
fn test_process_modules_flag() -> Result<(), Box<dyn std::error::Error>> {
    let dir = workspace();
    anvil(&dir)
        .args(["--load-process-modules", "modules", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("core-sample 0.1.0 (process unit 'core-sample')"));
    Ok(())
}

#[test]
fn test_modules_show() -> Result<(), Box<dyn std::error::Error>> {
    let dir = workspace();
    anvil(&dir)
        .args(["modules", "show", "terrain"])
        .assert()
        .success()
        .stdout(predicate::str::contains("description: Hills and valleys"))
        .stdout(predicate::str::contains("depends on: noise [1.0.0, 2.0.0)"))
        .stdout(predicate::str::contains("depends on: engine [0.1.0, 0.2.0)"));

    anvil(&dir)
        .args(["modules", "show", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ghost"));
    Ok(())
}

#[test]
fn test_env_build_prints_load_order() -> Result<(), Box<dyn std::error::Error>> {
    let dir = workspace();
    anvil(&dir)
        .args(["env", "build", "terrain"])
        .assert()
        .success()
        .stdout(predicate::str::contains("strict, 3 modules"))
        .stdout(predicate::str::is_match(r"(?s)engine-0\.1\.0.*noise-1\.2\.0.*terrain-1\.0\.0")?);
    Ok(())
}

#[test]
fn test_check_allowed_and_denied() -> Result<(), Box<dyn std::error::Error>> {
    let dir = workspace();
    anvil(&dir)
        .args(["check", "terrain", "noise::Perlin"])
        .assert()
        .success()
        .stdout(predicate::str::contains("allowed"));

    anvil(&dir)
        .args(["check", "terrain", "std::fs::File"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("denied: terrain -> std::fs::File"));

    anvil(&dir)
        .args(["--permissive", "check", "terrain", "std::fs::File"])
        .assert()
        .success()
        .stdout(predicate::str::contains("allowed"));
    Ok(())
}

#[test]
fn test_extra_module_path_and_config() -> Result<(), Box<dyn std::error::Error>> {
    let dir = workspace();
    let extra = dir.path().join("extra");
    write_module(&extra, "music", r#"{ "id": "music", "version": "3.0.0" }"#, None);
    fs::write(dir.path().join("anvil.toml"), "extra_api_packages = [\"std::fs\"]\n")?;

    anvil(&dir)
        .args(["--module-path", "extra", "modules", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("music 3.0.0"));

    anvil(&dir)
        .args(["--config", "anvil.toml", "check", "terrain", "std::fs::File"])
        .assert()
        .success();
    Ok(())
}

#[test]
fn test_missing_config_file_fails() -> Result<(), Box<dyn std::error::Error>> {
    let dir = workspace();
    anvil(&dir)
        .args(["--config", "nope.json", "modules", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
    Ok(())
}

#[test]
fn test_startup_logs_engine_module_version() -> Result<(), Box<dyn std::error::Error>> {
    let dir = workspace();
    anvil(&dir)
        .env("RUST_LOG", "info")
        .args(["modules", "list"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Anvil engine module 0.1.0 ready"));
    Ok(())
}
