//! End-to-end CLI tests for the session-auth binary.

mod support;

use assert_cmd::Command;
use predicates::prelude::*;
use support::socket_guard::start_mock_server_or_skip;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

fn session_auth() -> Command {
    let mut cmd = Command::cargo_bin("session-auth").unwrap();
    cmd.env_remove("SESSION_AUTH_COOKIE").env_remove("RUST_LOG");
    cmd
}

/// Test that --help displays usage information and exits with code 0.
#[test]
fn test_binary_help_displays_usage() {
    session_auth()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("browser session cookie"))
        .stdout(predicate::str::contains("--cookie-file"));
}

/// Test that --version displays version and exits with code 0.
#[test]
fn test_binary_version_displays_version() {
    session_auth()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("session-auth"));
}

/// Test that invalid flags cause non-zero exit.
#[test]
fn test_binary_invalid_flag_returns_error() {
    session_auth()
        .arg("--invalid-flag")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_binary_without_url_fails() {
    session_auth()
        .env("SESSION_AUTH_COOKIE", "a=1")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no session check URL"));
}

#[test]
fn test_binary_without_cookie_fails() {
    session_auth()
        .args(["--url", "http://127.0.0.1:9/session"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no session cookie"));
}

#[test]
fn test_binary_negative_wait_fails_validation() {
    session_auth()
        .env("SESSION_AUTH_COOKIE", "a=1")
        .args(["--url", "http://127.0.0.1:9/session", "--wait-ms", "-5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("wait must be >= 0"));
}

#[test]
fn test_binary_unknown_settings_field_fails() {
    let dir = TempDir::new().unwrap();
    let settings = dir.path().join("settings.json");
    std::fs::write(&settings, r#"{"check_url": "http://127.0.0.1:9", "bogus": 1}"#).unwrap();

    session_auth()
        .env("SESSION_AUTH_COOKIE", "a=1")
        .arg("--config")
        .arg(&settings)
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot parse settings file"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_binary_valid_session_prints_authenticated() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/v1/client"))
        .and(header("cookie", "__client=abc"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let url = format!("{}/v1/client", server.uri());
    let assert = tokio::task::spawn_blocking(move || {
        session_auth()
            .env("SESSION_AUTH_COOKIE", "__client=abc")
            .args(["--url", &url, "--wait-ms", "0"])
            .assert()
    })
    .await
    .unwrap();

    assert
        .success()
        .stdout(predicate::str::contains("authenticated"))
        .stderr(predicate::str::contains("__client=abc").not());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_binary_rejected_session_exits_non_zero() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let url = server.uri();
    let assert = tokio::task::spawn_blocking(move || {
        session_auth()
            .env("SESSION_AUTH_COOKIE", "__client=expired")
            .args(["--url", &url, "--wait-ms", "0"])
            .assert()
    })
    .await
    .unwrap();

    assert
        .failure()
        .stderr(predicate::str::contains("[AUTH]"))
        .stderr(predicate::str::contains("expired").not());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_binary_writes_rotation_to_cookie_file() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(header("cookie", "__session=old"))
        .respond_with(ResponseTemplate::new(200).insert_header("set-cookie", "__session=new"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let cookie_file = dir.path().join("cookie.txt");
    std::fs::write(&cookie_file, "__session=old").unwrap();

    let settings = dir.path().join("settings.json");
    std::fs::write(
        &settings,
        format!(
            r#"{{"check_url": "{}", "wait_ms": 0, "cookie_file": {:?}}}"#,
            server.uri(),
            cookie_file.display().to_string()
        ),
    )
    .unwrap();

    let assert = tokio::task::spawn_blocking(move || {
        session_auth().arg("--config").arg(&settings).assert()
    })
    .await
    .unwrap();
    assert.success();

    let on_disk = std::fs::read_to_string(&cookie_file).unwrap();
    assert_eq!(on_disk.trim_end(), "__session=new");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_binary_reads_netscape_export() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(header("cookie", "sid=s3cr3t"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let export = dir.path().join("cookies.txt");
    std::fs::write(
        &export,
        "# Netscape HTTP Cookie File\n\
         .example.com\tTRUE\t/\tFALSE\t0\tsid\ts3cr3t\n\
         other.org\tFALSE\t/\tFALSE\t0\tsid\tnope\n",
    )
    .unwrap();

    let url = server.uri();
    let assert = tokio::task::spawn_blocking(move || {
        session_auth()
            .args(["--url", &url, "--wait-ms", "0", "--domain", "www.example.com"])
            .arg("--netscape-file")
            .arg(&export)
            .assert()
    })
    .await
    .unwrap();

    assert.success();
}
