//! Integration tests for configuration loader
//!
//! Tests the end-to-end behavior of loading configuration from files.

use std::io::Write;

use fenixedu_domain::FenixError;
use fenixedu_infra::config;
use tempfile::NamedTempFile;

fn write_config(contents: &str, extension: &str) -> std::path::PathBuf {
    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    temp_file.write_all(contents.as_bytes()).expect("Failed to write to temp file");

    let path = temp_file.path().with_extension(extension);
    std::fs::copy(temp_file.path(), &path).expect("Failed to copy file");
    path
}

#[test]
fn test_load_config_from_json_file() {
    let path = write_config(
        r#"{
        "credentials": {
            "client_id": "1977390058176863",
            "client_secret": "json-secret",
            "redirect_url": "app://oauth"
        },
        "lang": "pt-PT",
        "api_base_url": "https://fenix.example.org/api/fenix/v1",
        "oauth_base_url": "https://fenix.example.org",
        "request_timeout_secs": 15,
        "user_agent": "campus-app/1.0"
    }"#,
        "json",
    );

    let config = config::load_from_file(Some(path.clone())).expect("JSON config should load");

    assert_eq!(config.credentials.client_id, "1977390058176863");
    assert_eq!(config.credentials.client_secret, "json-secret");
    assert_eq!(config.lang, "pt-PT");
    assert_eq!(config.endpoint_url("about"), "https://fenix.example.org/api/fenix/v1/about");
    assert_eq!(config.refresh_token_url(), "https://fenix.example.org/oauth/refresh_token");
    assert_eq!(config.request_timeout_secs, 15);
    assert_eq!(config.user_agent.as_deref(), Some("campus-app/1.0"));

    std::fs::remove_file(path).ok();
}

#[test]
fn test_load_config_from_toml_file() {
    let path = write_config(
        r#"
lang = "en-GB"
request_timeout_secs = 8

[credentials]
client_id = "toml-id"
client_secret = "toml-secret"
redirect_url = "https://app.example.org/callback"
"#,
        "toml",
    );

    let config = config::load_from_file(Some(path.clone())).expect("TOML config should load");

    assert_eq!(config.credentials.client_id, "toml-id");
    assert_eq!(config.credentials.redirect_url, "https://app.example.org/callback");
    assert_eq!(config.request_timeout_secs, 8);
    assert!(config.user_agent.is_none());

    std::fs::remove_file(path).ok();
}

#[test]
fn test_load_config_with_minimal_fields() {
    let path = write_config(
        r#"{"credentials": {"client_id": "a", "client_secret": "b", "redirect_url": "app://c"}}"#,
        "json",
    );

    let config = config::load_from_file(Some(path.clone())).expect("minimal config should load");

    assert_eq!(config.lang, "en-GB");
    assert_eq!(config.endpoint_url("about"), "https://fenix.tecnico.ulisboa.pt/api/fenix/v1/about");
    assert_eq!(config.request_timeout_secs, 30);

    std::fs::remove_file(path).ok();
}

#[test]
fn test_load_config_missing_credentials() {
    let path = write_config(r#"{"lang": "pt-PT"}"#, "json");

    let result = config::load_from_file(Some(path.clone()));
    assert!(matches!(result, Err(FenixError::Config(_))));

    std::fs::remove_file(path).ok();
}

#[test]
fn test_load_config_malformed_toml() {
    let path = write_config("[credentials\nclient_id = ", "toml");

    let err = config::load_from_file(Some(path.clone())).unwrap_err();
    assert!(err.to_string().contains("Invalid TOML format"));

    std::fs::remove_file(path).ok();
}
