//! Client configuration structures
//!
//! `ClientConfig` is the only input a client needs besides a transport. It
//! deserializes from TOML or JSON with defaults for everything except the
//! OAuth credentials.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::constants::{
    DEFAULT_API_BASE_URL, DEFAULT_LANG, DEFAULT_OAUTH_BASE_URL, DEFAULT_REQUEST_TIMEOUT_SECS,
    REFRESH_TOKEN_PATH, USER_DIALOG_PATH,
};
use crate::errors::{FenixError, Result};
use crate::types::Credentials;

/// Configuration for one FenixEdu client instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// OAuth application credentials
    pub credentials: Credentials,

    /// Language sent as `lang` with every call (e.g. "en-GB", "pt-PT")
    #[serde(default = "default_lang")]
    pub lang: String,

    /// Root of the REST API; endpoints are appended as `<root>/<endpoint>`
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Root of the OAuth server hosting `oauth/refresh_token`
    #[serde(default = "default_oauth_base_url")]
    pub oauth_base_url: String,

    /// Per-request timeout applied by the transport
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Optional User-Agent override
    #[serde(default)]
    pub user_agent: Option<String>,
}

fn default_lang() -> String {
    DEFAULT_LANG.to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_oauth_base_url() -> String {
    DEFAULT_OAUTH_BASE_URL.to_string()
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl ClientConfig {
    /// Create a configuration with default endpoints for the given credentials
    #[must_use]
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            lang: default_lang(),
            api_base_url: default_api_base_url(),
            oauth_base_url: default_oauth_base_url(),
            request_timeout_secs: default_timeout_secs(),
            user_agent: None,
        }
    }

    /// Override the API language
    #[must_use]
    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    /// Point the client at different API and OAuth roots (tests, staging)
    #[must_use]
    pub fn with_base_urls(
        mut self,
        api_base_url: impl Into<String>,
        oauth_base_url: impl Into<String>,
    ) -> Self {
        self.api_base_url = api_base_url.into();
        self.oauth_base_url = oauth_base_url.into();
        self
    }

    /// Request timeout as a `Duration`
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Full URL for an API endpoint path
    #[must_use]
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.api_base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }

    /// Full URL of the token refresh endpoint
    #[must_use]
    pub fn refresh_token_url(&self) -> String {
        format!("{}/{}", self.oauth_base_url.trim_end_matches('/'), REFRESH_TOKEN_PATH)
    }

    /// Full URL of the browser authorization dialog (without query)
    #[must_use]
    pub fn user_dialog_url(&self) -> String {
        format!("{}/{}", self.oauth_base_url.trim_end_matches('/'), USER_DIALOG_PATH)
    }

    /// Check that credentials are present and both roots are absolute URLs
    ///
    /// # Errors
    /// Returns `FenixError::Config` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let creds = &self.credentials;
        for (name, value) in [
            ("client_id", &creds.client_id),
            ("client_secret", &creds.client_secret),
            ("redirect_url", &creds.redirect_url),
            ("lang", &self.lang),
        ] {
            if value.trim().is_empty() {
                return Err(FenixError::Config(format!("{name} must not be empty")));
            }
        }

        for (name, value) in
            [("api_base_url", &self.api_base_url), ("oauth_base_url", &self.oauth_base_url)]
        {
            let parsed = Url::parse(value)
                .map_err(|e| FenixError::Config(format!("Invalid {name} '{value}': {e}")))?;
            if parsed.cannot_be_a_base() {
                return Err(FenixError::Config(format!("{name} cannot be used as a base URL")));
            }
        }

        if self.request_timeout_secs == 0 {
            return Err(FenixError::Config("request_timeout_secs must be positive".to_string()));
        }

        Ok(())
    }
}
