//! CLI integration tests
//!
//! Tests the command-line interface using assert_cmd

mod common;

use predicates::prelude::*;

use common::Sandbox;

// ─────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_help_flag() {
    Sandbox::new()
        .cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Persona Switcher"))
        .stdout(predicate::str::contains("launch"))
        .stdout(predicate::str::contains("show"))
        .stdout(predicate::str::contains("detect"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_version_command() {
    Sandbox::new()
        .cmd()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("persona-switcher"))
        .stdout(predicate::str::contains("Build Information"))
        .stdout(predicate::str::contains("Git Hash"))
        .stdout(predicate::str::contains("Target"));
}

#[test]
fn test_short_version_flag() {
    Sandbox::new()
        .cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("persona-switcher"));
}

#[test]
fn test_no_subcommand_is_usage_error() {
    Sandbox::new()
        .cmd()
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("Usage"));
}

// ─────────────────────────────────────────────────────────────────
// Config Command Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_config_show_default() {
    Sandbox::new()
        .cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[paths]"))
        .stdout(predicate::str::contains("[launcher]"))
        .stdout(predicate::str::contains("[logging]"))
        .stdout(predicate::str::contains("CLAUDE_WORKING_DIR"));
}

#[test]
fn test_config_validate_default() {
    Sandbox::new()
        .cmd()
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"));
}

#[test]
fn test_config_init_creates_file() {
    let sandbox = Sandbox::new();
    let path = sandbox.root().join("generated").join("config.toml");

    sandbox
        .cmd()
        .args(["config", "init", "--path"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration written to"));
    assert!(path.exists());

    // Second run without --force refuses
    sandbox
        .cmd()
        .args(["config", "init", "--path"])
        .arg(&path)
        .assert()
        .failure()
        .code(10)
        .stderr(predicate::str::contains("--force"));

    sandbox
        .cmd()
        .args(["config", "init", "--force", "--path"])
        .arg(&path)
        .assert()
        .success();
}

#[test]
fn test_missing_explicit_config() {
    Sandbox::new()
        .cmd()
        .args(["show", "--config", "/nonexistent/persona-switcher.toml"])
        .assert()
        .failure()
        .code(10)
        .stderr(predicate::str::contains("E100"))
        .stderr(predicate::str::contains("config init"));
}

// ─────────────────────────────────────────────────────────────────
// Launch Argument Handling
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_launch_without_program() {
    Sandbox::new()
        .cmd()
        .arg("launch")
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_launch_unknown_program() {
    Sandbox::new()
        .cmd()
        .args(["launch", "persona-switcher-test-no-such-program"])
        .assert()
        .failure()
        .code(40)
        .stderr(predicate::str::contains("E400"));
}

// ─────────────────────────────────────────────────────────────────
// Output Discipline
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_logs_go_to_stderr() {
    let sandbox = Sandbox::new();
    let folder = sandbox.project("web", &["package.json"], &[]);

    sandbox
        .cmd()
        .args(["-vv", "show", "--name-only", "--folder", &folder])
        .assert()
        .success()
        .stdout("tars\n");
}

#[test]
fn test_quiet_suppresses_warnings() {
    let sandbox = Sandbox::new();

    sandbox
        .cmd()
        .args(["-q", "set", "ghost", "--folder", "/tmp/persona-quiet"])
        .assert()
        .success()
        .stderr(predicate::str::is_empty());
}
