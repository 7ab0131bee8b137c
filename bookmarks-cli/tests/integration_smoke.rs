//! Smoke tests to verify command wiring

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn bookmarks(config_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("bookmarks").unwrap();
    cmd.env("BOOKMARKS_CONFIG", config_dir.path().join("config.toml"))
        .env_remove("DATABASE_URL");
    cmd
}

#[test]
fn test_help_lists_commands() {
    let dir = TempDir::new().unwrap();
    bookmarks(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("migrate"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_serve_help() {
    let dir = TempDir::new().unwrap();
    bookmarks(&dir)
        .args(["serve", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--in-memory"))
        .stdout(predicate::str::contains("--database-url"));
}

#[test]
fn test_config_path_honors_env() {
    let dir = TempDir::new().unwrap();
    bookmarks(&dir)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_init_then_show() {
    let dir = TempDir::new().unwrap();
    bookmarks(&dir).args(["config", "init"]).assert().success();

    bookmarks(&dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("postgres://localhost/bookmarks"));

    // Second init without --force refuses to overwrite
    bookmarks(&dir)
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
}

#[test]
fn test_migrate_without_database_url_fails() {
    let dir = TempDir::new().unwrap();
    bookmarks(&dir)
        .arg("migrate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("DATABASE_URL not set"));
}

#[test]
fn test_invalid_config_can_be_reinitialized() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("config.toml"), "server = [").unwrap();

    bookmarks(&dir).args(["config", "path"]).assert().success();
    bookmarks(&dir)
        .args(["config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid TOML"));
    bookmarks(&dir)
        .arg("migrate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid TOML"));

    bookmarks(&dir)
        .args(["config", "init", "--force"])
        .assert()
        .success();
    bookmarks(&dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("postgres://localhost/bookmarks"));
}
