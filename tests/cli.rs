//! End-to-end tests for the `stardust` binary
//!
//! Each test points the storage directory at a fresh temp dir; nothing here
//! talks to the remote service.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn stardust(data_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("stardust").unwrap();
    cmd.env("STARDUST_DATA_DIR", data_dir.path())
        .env_remove("STARDUST_API_URL")
        .env_remove("STARDUST_API_KEY");
    cmd
}

#[test]
fn config_shows_paths_and_defaults() {
    let data_dir = TempDir::new().unwrap();

    stardust(&data_dir)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("auth.enc"))
        .stdout(predicate::str::contains("https://api.stardust-dreams.com"))
        .stdout(predicate::str::contains("Session cache TTL:  300s"));
}

#[test]
fn auth_status_without_credentials() {
    let data_dir = TempDir::new().unwrap();

    stardust(&data_dir)
        .args(["auth", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No cached credentials."))
        .stdout(predicate::str::contains("Credential file:   no"));
}

#[test]
fn auth_clear_is_idempotent() {
    let data_dir = TempDir::new().unwrap();

    stardust(&data_dir)
        .args(["auth", "clear"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Credentials cleared."));
}

#[test]
fn auth_export_without_credentials_fails() {
    let data_dir = TempDir::new().unwrap();

    stardust(&data_dir)
        .args(["auth", "export"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No credentials to export"));
}

#[test]
fn auth_import_rejects_empty_export() {
    let data_dir = TempDir::new().unwrap();
    let file = data_dir.path().join("export.json");
    std::fs::write(&file, r#"{ "device": "elsewhere" }"#).unwrap();

    stardust(&data_dir)
        .args(["auth", "import"])
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Import error"));

    assert!(!data_dir.path().join("auth.enc").exists());
}

#[test]
fn auth_cleanup_on_empty_storage() {
    let data_dir = TempDir::new().unwrap();

    stardust(&data_dir)
        .args(["auth", "cleanup"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Storage cleaned up."));
}

#[test]
fn template_check_reports_unbalanced_blocks() {
    let data_dir = TempDir::new().unwrap();
    let good = data_dir.path().join("good.tpl");
    let bad = data_dir.path().join("bad.tpl");
    std::fs::write(&good, "{{#if a}}yes{{else}}no{{/if}}").unwrap();
    std::fs::write(&bad, "{{#if a}}yes{{#each items}}{{this}}{{/each}}").unwrap();

    stardust(&data_dir)
        .args(["template", "check"])
        .arg(&good)
        .assert()
        .success()
        .stdout(predicate::str::contains("Template is valid."));

    stardust(&data_dir)
        .args(["template", "check"])
        .arg(&bad)
        .assert()
        .failure()
        .stdout(predicate::str::contains("Found 1 issue(s)"))
        .stdout(predicate::str::contains("2 opening, 1 closing"));
}

#[test]
fn template_render_fills_parameters() {
    let data_dir = TempDir::new().unwrap();
    let template = data_dir.path().join("story.tpl");
    let params = data_dir.path().join("params.json");
    std::fs::write(
        &template,
        "写一个关于{{hero.name}}的故事{{#if happy}}，结局圆满{{/if}}。\n{{#each places}}[{{this}}]{{/each}}",
    )
    .unwrap();
    std::fs::write(&params, r#"{ "hero": { "name": "小明" }, "places": ["山", "海"] }"#).unwrap();

    stardust(&data_dir)
        .args(["template", "render"])
        .arg(&template)
        .arg("--params")
        .arg(&params)
        .args(["--set", "happy=yes"])
        .assert()
        .success()
        .stdout("写一个关于小明的故事，结局圆满。\n[山][海]\n");
}

#[test]
fn no_command_prints_hint() {
    let data_dir = TempDir::new().unwrap();

    stardust(&data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("stardust --help"));
}
