use std::time::Duration;

use fenixedu_domain::constants::DEFAULT_REQUEST_TIMEOUT_SECS;
use fenixedu_domain::{ClientConfig, FenixError};
use reqwest::Client as ReqwestClient;

use crate::errors::InfraError;

/// User agent sent when the configuration does not override it
pub const DEFAULT_USER_AGENT: &str = concat!("fenixedu-rs/", env!("CARGO_PKG_VERSION"));

/// Builder for the `reqwest` client used by the transport.
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    user_agent: Option<String>,
    default_headers: Option<reqwest::header::HeaderMap>,
    accept_invalid_certs: bool,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            user_agent: None,
            default_headers: None,
            accept_invalid_certs: false,
        }
    }
}

impl HttpClientBuilder {
    /// Builder preloaded with the timeout and user agent of `config`
    #[must_use]
    pub fn from_config(config: &ClientConfig) -> Self {
        let builder = Self::default().timeout(config.request_timeout());
        match &config.user_agent {
            Some(agent) => builder.user_agent(agent.clone()),
            None => builder,
        }
    }

    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    #[must_use]
    pub fn default_headers(mut self, headers: reqwest::header::HeaderMap) -> Self {
        self.default_headers = Some(headers);
        self
    }

    /// Test-only helper to allow insecure TLS (e.g., self-signed certs).
    #[cfg(test)]
    #[must_use]
    pub const fn accept_invalid_certs(mut self, enabled: bool) -> Self {
        self.accept_invalid_certs = enabled;
        self
    }

    /// Build the client
    ///
    /// # Errors
    /// Returns `FenixError::Network` if the TLS backend cannot be initialised.
    pub fn build(self) -> Result<ReqwestClient, FenixError> {
        let agent = self.user_agent.unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        let mut builder = ReqwestClient::builder().timeout(self.timeout).user_agent(agent);

        if let Some(headers) = self.default_headers {
            builder = builder.default_headers(headers);
        }

        if self.accept_invalid_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }

        builder.build().map_err(|err| {
            let infra: InfraError = err.into();
            FenixError::from(infra)
        })
    }
}

#[cfg(test)]
mod tests {
    use fenixedu_domain::Credentials;
    use wiremock::matchers::{header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn sends_configured_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("user-agent", "campus-app/2.0"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let mut config = ClientConfig::new(Credentials::new("id", "secret", "app://cb"));
        config.user_agent = Some("campus-app/2.0".to_string());
        let client = HttpClientBuilder::from_config(&config).build().unwrap();

        let response = client.get(server.uri()).send().await.unwrap();
        assert_eq!(response.status().as_u16(), 204);
    }

    #[test]
    fn from_config_uses_config_timeout() {
        let mut config = ClientConfig::new(Credentials::new("id", "secret", "app://cb"));
        config.request_timeout_secs = 3;
        let builder = HttpClientBuilder::from_config(&config);
        assert_eq!(builder.timeout, Duration::from_secs(3));
        assert!(builder.user_agent.is_none());
    }
}
