//! CLI integration tests for the nimbus command-line interface.
//!
//! These tests verify:
//! - Help text and argument parsing
//! - Credential and settings handling against a temporary config root
//!
//! Note: no test reaches the identity provider. Login is only exercised through the
//! paths that fail before a browser would open.

use std::path::Path;
use std::time::Duration;

use assert_cmd::Command;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a command for the nimbus binary, isolated in `root`.
fn nimbus(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("nimbus").unwrap();
    cmd.env("NIMBUS_CONFIG_DIR", root)
        .env("LANG", "C")
        .env_remove("NIMBUS_PROFILE")
        .env_remove("NIMBUS_LISTEN_ADDRESS");
    cmd
}

fn write_credentials(root: &Path, profile: &str, access_token: &str) {
    let dir = root.join("profiles").join(profile);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("auth.yaml"),
        format!("access_token: {}\nrefresh_token: ''\n", access_token),
    )
    .unwrap();
}

fn token_expiring_in(secs: i64) -> String {
    let exp = unix_now() + secs;
    let claims = serde_json::json!({
        "exp": exp,
        "tenant": "tenant:acme",
        "scope": "openid iam:read",
        "email": "dev@example.com"
    });
    format!(
        "{}.{}.sig",
        URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#),
        URL_SAFE_NO_PAD.encode(claims.to_string())
    )
}

fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

// ─────────────────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_displays() {
    let temp = TempDir::new().unwrap();
    nimbus(temp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("nimbus"))
        .stdout(predicate::str::contains("auth"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_version_displays() {
    let temp = TempDir::new().unwrap();
    nimbus(temp.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("nimbus"));
}

#[test]
fn test_login_help_lists_variants() {
    let temp = TempDir::new().unwrap();
    nimbus(temp.path())
        .args(["auth", "login", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--headless"))
        .stdout(predicate::str::contains("--qrcode"))
        .stdout(predicate::str::contains("--show"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Login Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_headless_and_qrcode_conflict() {
    let temp = TempDir::new().unwrap();
    nimbus(temp.path())
        .args(["auth", "login", "--headless", "--qrcode"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_headless_login_not_supported() {
    let temp = TempDir::new().unwrap();
    nimbus(temp.path())
        .args(["auth", "login", "--headless"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("authentication failed"))
        .stderr(predicate::str::contains("not supported"));
}

#[test]
fn test_qrcode_login_not_supported_in_portuguese() {
    let temp = TempDir::new().unwrap();
    nimbus(temp.path())
        .args(["--lang", "pt-BR", "auth", "login", "--qrcode"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("falha na autenticação"));
}

#[test]
fn test_login_fails_fast_on_corrupt_credentials() {
    let temp = TempDir::new().unwrap();
    write_credentials(temp.path(), "default", "[unclosed");

    nimbus(temp.path())
        .env("NIMBUS_LISTEN_ADDRESS", "127.0.0.1:0")
        .args(["auth", "login"])
        .timeout(Duration::from_secs(10))
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to parse credential file"))
        .stderr(predicate::str::contains("Waiting for the browser").not())
        .stderr(predicate::str::contains("open this URL manually").not());
}

// ─────────────────────────────────────────────────────────────────────────────
// Credential Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_status_when_logged_out() {
    let temp = TempDir::new().unwrap();
    nimbus(temp.path())
        .args(["auth", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Not logged in"));
}

#[test]
fn test_status_json_when_logged_out() {
    let temp = TempDir::new().unwrap();
    nimbus(temp.path())
        .args(["--json", "auth", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"logged_in\": false"));
}

#[test]
fn test_token_fails_when_logged_out() {
    let temp = TempDir::new().unwrap();
    nimbus(temp.path())
        .args(["auth", "token"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not logged in"));
}

#[test]
fn test_status_shows_claims() {
    let temp = TempDir::new().unwrap();
    write_credentials(temp.path(), "default", &token_expiring_in(3600));

    nimbus(temp.path())
        .args(["auth", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dev@example.com"))
        .stdout(predicate::str::contains("tenant:acme"))
        .stdout(predicate::str::contains("iam:read"));
}

#[test]
fn test_token_prints_valid_token() {
    let temp = TempDir::new().unwrap();
    let token = token_expiring_in(3600);
    write_credentials(temp.path(), "default", &token);

    nimbus(temp.path())
        .args(["auth", "token"])
        .assert()
        .success()
        .stdout(predicate::str::contains(token));
}

#[test]
fn test_logout_clears_credentials() {
    let temp = TempDir::new().unwrap();
    write_credentials(temp.path(), "default", &token_expiring_in(3600));

    nimbus(temp.path())
        .args(["auth", "logout"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged out."));

    nimbus(temp.path())
        .args(["auth", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Not logged in"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Profile Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_profile_flag_isolates_credentials() {
    let temp = TempDir::new().unwrap();
    write_credentials(temp.path(), "work", &token_expiring_in(3600));

    nimbus(temp.path())
        .args(["auth", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Not logged in"));

    nimbus(temp.path())
        .args(["--profile", "work", "auth", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dev@example.com"));
}

#[test]
fn test_use_profile_persists() {
    let temp = TempDir::new().unwrap();
    nimbus(temp.path())
        .args(["config", "use-profile", "staging"])
        .assert()
        .success();

    let current = std::fs::read_to_string(temp.path().join("current")).unwrap();
    assert_eq!(current.trim(), "staging");

    nimbus(temp.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("staging"));
}

#[test]
fn test_invalid_profile_rejected() {
    let temp = TempDir::new().unwrap();
    nimbus(temp.path())
        .args(["--profile", "../escape", "auth", "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid profile name"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Settings Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_config_set_and_get() {
    let temp = TempDir::new().unwrap();
    nimbus(temp.path())
        .args(["config", "set", "listen_address", "127.0.0.1:9000"])
        .assert()
        .success();

    nimbus(temp.path())
        .args(["config", "get", "listen_address"])
        .assert()
        .success()
        .stdout(predicate::str::contains("127.0.0.1:9000"));

    nimbus(temp.path())
        .args(["config", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("listen_address = 127.0.0.1:9000"))
        .stdout(predicate::str::contains("language"));
}

#[test]
fn test_config_rejects_unknown_key_and_bad_value() {
    let temp = TempDir::new().unwrap();
    nimbus(temp.path())
        .args(["config", "get", "colour"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown setting"));

    nimbus(temp.path())
        .args(["config", "set", "log_level", "loud"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_language_setting_applies() {
    let temp = TempDir::new().unwrap();
    nimbus(temp.path())
        .args(["config", "set", "language", "pt-BR"])
        .assert()
        .success();

    nimbus(temp.path())
        .args(["auth", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Sem login"));

    // The flag wins over the stored setting.
    nimbus(temp.path())
        .args(["--lang", "en", "auth", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Not logged in"));
}

#[test]
fn test_language_setting_is_checked_and_normalized() {
    let temp = TempDir::new().unwrap();
    nimbus(temp.path())
        .args(["config", "set", "language", "fr"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported language"));

    nimbus(temp.path())
        .args(["config", "get", "language"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    nimbus(temp.path())
        .args(["config", "set", "language", "pt_br"])
        .assert()
        .success();

    nimbus(temp.path())
        .args(["config", "get", "language"])
        .assert()
        .success()
        .stdout(predicate::str::contains("pt-BR"));
}

#[test]
fn test_lang_env_selects_portuguese() {
    let temp = TempDir::new().unwrap();
    nimbus(temp.path())
        .env("LANG", "pt_BR.UTF-8")
        .args(["auth", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Sem login"));
}

#[test]
fn test_unsupported_lang_flag() {
    let temp = TempDir::new().unwrap();
    nimbus(temp.path())
        .args(["--lang", "fr", "auth", "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported language"));
}
