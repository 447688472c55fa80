use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::{TempDir, tempdir};

fn write_manifest(dir: &TempDir, file_name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(file_name);
    fs::write(&path, content).expect("Failed to write manifest");
    path
}

fn console_manifest(dir: &TempDir) -> PathBuf {
    write_manifest(
        dir,
        "console.json",
        r#"{
            "name": "console",
            "version": "1.2.0",
            "buildHash": "b1",
            "extensions": [
                { "type": "console.page", "properties": { "component": { "$codeRef": "pages.Home" } } },
                { "type": "console.beta", "flags": { "required": ["BETA"] } }
            ]
        }"#,
    )
}

fn inspect(manifest: &Path) -> Command {
    let mut cmd = Command::cargo_bin("lattice").expect("binary builds");
    cmd.arg("inspect").arg("--manifest").arg(manifest);
    cmd
}

#[test]
fn test_ping_command() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("lattice")?;
    cmd.arg("--ping");
    cmd.assert().success().stdout(predicate::str::contains("pong"));
    Ok(())
}

#[test]
fn test_no_command_prints_hint() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let mut cmd = Command::cargo_bin("lattice")?;
    cmd.current_dir(dir.path());
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("No command given"))
        .stdout(predicate::str::contains("pong").not());
    Ok(())
}

#[test]
fn test_inspect_auto_enables_loaded_plugin() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let manifest = console_manifest(&dir);

    inspect(&manifest)
        .current_dir(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Plugins:"))
        .stdout(predicate::str::contains("console 1.2.0 [loaded] enabled"))
        .stdout(predicate::str::contains("Active extensions:"))
        .stdout(predicate::str::contains("console[0]_b1 console.page"))
        .stdout(predicate::str::contains("console.beta").not());
    Ok(())
}

#[test]
fn test_inspect_logs_to_stderr_when_enabled() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let manifest = console_manifest(&dir);

    inspect(&manifest)
        .current_dir(dir.path())
        .env("RUST_LOG", "info")
        .assert()
        .success()
        .stderr(predicate::str::contains("Plugin console has been loaded"))
        .stderr(predicate::str::contains("Failed to").not())
        .stdout(predicate::str::contains("Plugin console").not());
    Ok(())
}

#[test]
fn test_inspect_flag_activates_gated_extension() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let manifest = console_manifest(&dir);

    inspect(&manifest)
        .current_dir(dir.path())
        .args(["--flag", "BETA=true"])
        .assert()
        .success()
        .stdout(predicate::str::contains("console[1]_b1 console.beta"));
    Ok(())
}

#[test]
fn test_inspect_disable_records_reason() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let manifest = console_manifest(&dir);

    inspect(&manifest)
        .current_dir(dir.path())
        .args(["--disable", "console"])
        .assert()
        .success()
        .stdout(predicate::str::contains("disabled (disabled from the command line)"))
        .stdout(predicate::str::contains("Active extensions:\n  (none)"));
    Ok(())
}

#[test]
fn test_inspect_invalid_manifest_is_failed_plugin() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let good = console_manifest(&dir);
    let bad = write_manifest(&dir, "broken.json", "{ not json");

    let mut cmd = Command::cargo_bin("lattice")?;
    cmd.current_dir(dir.path())
        .arg("inspect")
        .arg("--manifest")
        .arg(&good)
        .arg("--manifest")
        .arg(&bad)
        .assert()
        .success()
        .stdout(predicate::str::contains("console 1.2.0 [loaded] enabled"))
        .stdout(predicate::str::contains("broken [failed] Plugin manifest error: invalid manifest JSON"));
    Ok(())
}

#[test]
fn test_config_file_disables_auto_enable() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let manifest = console_manifest(&dir);
    let config = dir.path().join("registry.json");
    fs::write(&config, r#"{ "auto_enable_loaded_plugins": false, "feature_flags": { "BETA": true } }"#)?;

    let mut cmd = Command::cargo_bin("lattice")?;
    cmd.current_dir(dir.path())
        .arg("--config")
        .arg(&config)
        .arg("inspect")
        .arg("--manifest")
        .arg(&manifest)
        .assert()
        .success()
        .stdout(predicate::str::contains("console 1.2.0 [loaded] disabled"))
        .stdout(predicate::str::contains("Active extensions:\n  (none)"));

    // Enabling from the command line brings in the flag-gated extension too
    let mut cmd = Command::cargo_bin("lattice")?;
    cmd.current_dir(dir.path())
        .arg("--config")
        .arg(&config)
        .arg("inspect")
        .arg("--manifest")
        .arg(&manifest)
        .args(["--enable", "console"])
        .assert()
        .success()
        .stdout(predicate::str::contains("console[0]_b1 console.page"))
        .stdout(predicate::str::contains("console[1]_b1 console.beta"));
    Ok(())
}

#[test]
fn test_default_config_file_is_picked_up() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let manifest = console_manifest(&dir);
    fs::write(dir.path().join("lattice.toml"), "auto_enable_loaded_plugins = false\n")?;

    inspect(&manifest)
        .current_dir(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("console 1.2.0 [loaded] disabled"));
    Ok(())
}

#[test]
fn test_bad_config_fails() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let manifest = console_manifest(&dir);
    let config = dir.path().join("registry.json");
    fs::write(&config, r#"{ "unknown_setting": 1 }"#)?;

    let mut cmd = Command::cargo_bin("lattice")?;
    cmd.current_dir(dir.path())
        .arg("--config")
        .arg(&config)
        .arg("inspect")
        .arg("--manifest")
        .arg(&manifest)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
    Ok(())
}

#[test]
fn test_malformed_flag_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let manifest = console_manifest(&dir);

    inspect(&manifest)
        .current_dir(dir.path())
        .args(["--flag", "BETA"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected KEY=BOOL"));
    Ok(())
}
