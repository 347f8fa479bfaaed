//! Configuration loader
//!
//! Loads client configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. Loads a `.env` file if one is present
//! 2. Attempts to load from environment variables
//! 3. If incomplete, falls back to loading from file
//! 4. Probes multiple paths for config files (JSON or TOML)
//!
//! ## Environment Variables
//! - `FENIXEDU_CLIENT_ID`: OAuth client id (required)
//! - `FENIXEDU_CLIENT_SECRET`: OAuth client secret (required)
//! - `FENIXEDU_REDIRECT_URL`: OAuth redirect URL (required)
//! - `FENIXEDU_LANG`: API language, e.g. `pt-PT`
//! - `FENIXEDU_API_BASE_URL`: REST API root
//! - `FENIXEDU_OAUTH_BASE_URL`: OAuth server root
//! - `FENIXEDU_TIMEOUT_SECS`: Per-request timeout in seconds
//!
//! ## File Locations
//! The loader probes the following names, in order:
//! `fenixedu.toml`, `fenixedu.json`, `config.toml`, `config.json`
//! in the current working directory, its parent and grandparent, then next
//! to the executable.

use std::path::{Path, PathBuf};

use fenixedu_domain::{ClientConfig, Credentials, FenixError, Result};

const CONFIG_FILE_NAMES: [&str; 4] =
    ["fenixedu.toml", "fenixedu.json", "config.toml", "config.json"];

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `FenixError::Config` if configuration cannot be loaded from
/// either source, or the loaded configuration is invalid.
pub fn load() -> Result<ClientConfig> {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(error = %e, "Could not load .env file"),
    }

    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// # Errors
/// Returns `FenixError::Config` if a required variable is missing or an
/// optional one has an invalid value.
pub fn load_from_env() -> Result<ClientConfig> {
    let credentials = Credentials::new(
        env_var("FENIXEDU_CLIENT_ID")?,
        env_var("FENIXEDU_CLIENT_SECRET")?,
        env_var("FENIXEDU_REDIRECT_URL")?,
    );

    let mut config = ClientConfig::new(credentials);
    if let Some(lang) = optional_env_var("FENIXEDU_LANG") {
        config.lang = lang;
    }
    if let Some(url) = optional_env_var("FENIXEDU_API_BASE_URL") {
        config.api_base_url = url;
    }
    if let Some(url) = optional_env_var("FENIXEDU_OAUTH_BASE_URL") {
        config.oauth_base_url = url;
    }
    if let Some(raw) = optional_env_var("FENIXEDU_TIMEOUT_SECS") {
        config.request_timeout_secs = raw
            .parse::<u64>()
            .map_err(|e| FenixError::Config(format!("Invalid request timeout: {e}")))?;
    }

    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations.
///
/// # Errors
/// Returns `FenixError::Config` if the file is missing, cannot be parsed, or
/// holds an invalid configuration.
pub fn load_from_file(path: Option<PathBuf>) -> Result<ClientConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(FenixError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            FenixError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| FenixError::Config(format!("Failed to read config file: {e}")))?;

    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

/// Parse configuration by file extension (`.json` or `.toml`)
fn parse_config(contents: &str, path: &Path) -> Result<ClientConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| FenixError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| FenixError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(FenixError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// First existing config file among the standard locations
#[must_use]
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.extend(cwd.ancestors().take(3).map(Path::to_path_buf));
    }
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            roots.push(exe_dir.to_path_buf());
        }
    }

    roots
        .iter()
        .flat_map(|root| CONFIG_FILE_NAMES.iter().map(move |name| root.join(name)))
        .find(|candidate| candidate.is_file())
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| FenixError::Config(format!("Missing required environment variable: {key}")))
}

/// Set and non-blank
fn optional_env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}
