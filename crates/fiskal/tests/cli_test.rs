//! Integration tests for the `fiskal` CLI binary.
//!
//! Argument parsing, help output, completions and error handling run
//! without a network; the end-to-end cases talk to a wiremock server.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `fiskal` binary with env isolation.
///
/// Clears all `FISKAL_*` env vars and points the config file at `config`
/// so tests never touch the user's real configuration.
fn fiskal_cmd(config: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("fiskal");
    cmd.env("HOME", "/tmp/fiskal-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/fiskal-cli-test-nonexistent")
        .env("FISKAL_CONFIG", config)
        .env_remove("FISKAL_PROFILE")
        .env_remove("FISKAL_BASE_URL")
        .env_remove("FISKAL_API_KEY")
        .env_remove("FISKAL_API_SECRET")
        .env_remove("FISKAL_OUTPUT")
        .env_remove("FISKAL_INSECURE")
        .env_remove("FISKAL_TIMEOUT")
        .env_remove("RUST_LOG");
    cmd
}

fn isolated() -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    (dir, config)
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

async fn mount_auth(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/v2/auth"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "t",
            "access_token_expires_at": 4_102_444_800_i64,
        })))
        .mount(server)
        .await;
}

fn connection_args(server: &MockServer) -> Vec<String> {
    vec![
        "--base-url".into(),
        format!("{}/api/v2", server.uri()),
        "--api-key".into(),
        "k".into(),
        "--api-secret".into(),
        "s".into(),
        "--output".into(),
        "json-compact".into(),
    ]
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let (_dir, config) = isolated();
    let output = fiskal_cmd(&config).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    let (_dir, config) = isolated();
    fiskal_cmd(&config).arg("--help").assert().success().stdout(
        predicate::str::contains("auth")
            .and(predicate::str::contains("call"))
            .and(predicate::str::contains("tss"))
            .and(predicate::str::contains("config")),
    );
}

#[test]
fn test_version_flag() {
    let (_dir, config) = isolated();
    fiskal_cmd(&config)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("fiskal"));
}

#[test]
fn test_tss_subcommands_exist() {
    let (_dir, config) = isolated();
    fiskal_cmd(&config)
        .args(["tss", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("create")
                .and(predicate::str::contains("change-admin-pin"))
                .and(predicate::str::contains("admin-auth")),
        );
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    let (_dir, config) = isolated();
    fiskal_cmd(&config)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    let (_dir, config) = isolated();
    fiskal_cmd(&config)
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_output_format() {
    let (_dir, config) = isolated();
    let output = fiskal_cmd(&config)
        .args(["--output", "table", "call", "get_tss"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("invalid") || text.contains("possible values"),
        "Expected error about valid output formats:\n{text}"
    );
}

#[test]
fn test_call_without_credentials() {
    let (_dir, config) = isolated();
    fiskal_cmd(&config)
        .args(["call", "get_tss"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("api_key"));
}

#[test]
fn test_unknown_profile() {
    let (_dir, config) = isolated();
    fiskal_cmd(&config)
        .args(["--profile", "nope", "call", "get_tss"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope"));
}

#[test]
fn test_unknown_verb_is_usage_error() {
    let (_dir, config) = isolated();
    fiskal_cmd(&config)
        .args([
            "--base-url",
            "http://127.0.0.1:9/api/v2",
            "--api-key",
            "k",
            "--api-secret",
            "s",
            "call",
            "fetch_tss",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("fetch_tss"));
}

#[test]
fn test_config_show_no_config() {
    let (_dir, config) = isolated();
    fiskal_cmd(&config).args(["config", "show"]).assert().success();
}

#[test]
fn test_config_path_honours_override() {
    let (_dir, config) = isolated();
    fiskal_cmd(&config)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(config.to_string_lossy().into_owned()));
}

#[test]
fn test_config_show_masks_secrets() {
    let (_dir, config) = isolated();
    std::fs::write(
        &config,
        "[profiles.default]\napi_key = \"plain-key\"\napi_secret = \"plain-secret\"\n",
    )
    .unwrap();

    fiskal_cmd(&config)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("***").and(predicate::str::contains("plain-key").not()));
}

#[test]
fn test_malformed_config_is_reported_not_replaced() {
    let (_dir, config) = isolated();
    let broken = "default_profile = \"till\"\n[profiles.till\napi_key = \"k\"\n";
    std::fs::write(&config, broken).unwrap();

    fiskal_cmd(&config)
        .args(["config", "use", "till"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("config loading failed"));
    assert_eq!(std::fs::read_to_string(&config).unwrap(), broken);

    fiskal_cmd(&config)
        .args(["call", "get_tss"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("config loading failed"));
}

// ── End to end against a mock middleware ───────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_call_prints_response() {
    let server = MockServer::start().await;
    mount_auth(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/v2/tss/d1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "_id": "d1", "state": "INITIALIZED" })))
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, config) = isolated();
    let output = fiskal_cmd(&config)
        .args(connection_args(&server))
        .args(["call", "get_tss_d1"])
        .output()
        .unwrap();

    assert!(output.status.success(), "{}", combined_output(&output));
    let printed: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(printed, json!({ "_id": "d1", "state": "INITIALIZED" }));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_profile_from_config_file() {
    let server = MockServer::start().await;
    mount_auth(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/v2/tss"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, config) = isolated();
    std::fs::write(
        &config,
        format!(
            "default_profile = \"till\"\n\n[profiles.till]\nbase_url = \"{}/api/v2\"\napi_key = \"k\"\napi_secret = \"s\"\n",
            server.uri()
        ),
    )
    .unwrap();

    fiskal_cmd(&config)
        .args(["--output", "json-compact", "call", "get_tss"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"{"data":[]}"#));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_tss_create_prints_record_with_pin() {
    let server = MockServer::start().await;
    mount_auth(&server).await;
    Mock::given(method("PUT"))
        .and(path_regex(r"^/api/v2/tss/[0-9a-f-]{36}$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_id": "d1",
            "state": "CREATED",
            "admin_puk": "puk",
        })))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path_regex(r"^/api/v2/tss/d1(/admin)?$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v2/tss/d1/admin_auth"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let (_dir, config) = isolated();
    let output = fiskal_cmd(&config)
        .args(connection_args(&server))
        .args(["--quiet", "tss", "create", "--admin-pin", "1234567890"])
        .output()
        .unwrap();

    assert!(output.status.success(), "{}", combined_output(&output));
    let printed: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(printed["state"], json!("INITIALIZED"));
    assert_eq!(printed["adminpin"], json!("1234567890"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_tss_create_failure_reports_step() {
    let server = MockServer::start().await;
    mount_auth(&server).await;
    Mock::given(method("PUT"))
        .and(path_regex(r"^/api/v2/tss/[0-9a-f-]{36}$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_id": "d1",
            "state": "CREATED",
            "admin_puk": "puk",
        })))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/api/v2/tss/d1"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let (_dir, config) = isolated();
    fiskal_cmd(&config)
        .args(connection_args(&server))
        .args(["tss", "create"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("uninitialize").and(predicate::str::contains("boom")));
}
