//! Client facade
//!
//! [`ApiClient`] owns one complete request engine: token manager, task
//! registry, dispatcher and response router. Each instance is independent;
//! nothing is shared between clients.

use std::sync::Arc;

use fenixedu_domain::{ClientConfig, Result};
use tokio::sync::{oneshot, Mutex};
use tracing::{info, instrument};

use crate::auth::{TokenCallback, TokenManager, TokenState};
use crate::dispatch::{encode_component, RequestDispatcher, RequestSubmitter, ResponseRouter, TaskRegistry};
use crate::request::{Parameters, RequestDescriptor};
use crate::response::{ApiResponse, RequestError};
use crate::transport::{CompletionEvents, CompletionSink, Transport};

/// Asynchronous FenixEdu API client
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
///
/// use fenixedu_core::{ApiClient, RequestDescriptor};
/// use fenixedu_domain::{ClientConfig, Credentials};
///
/// # async fn example(transport: Arc<dyn fenixedu_core::Transport>,
/// #     sink: fenixedu_core::CompletionSink,
/// #     events: fenixedu_core::CompletionEvents) -> fenixedu_domain::Result<()> {
/// let config = ClientConfig::new(Credentials::new("id", "secret", "app://callback"));
/// let client = ApiClient::new(config, transport, sink, events)?;
///
/// client.set_refresh_token("stored-refresh-token");
/// let response = client.send(RequestDescriptor::private("person")).await;
/// if let Some(person) = response.json::<serde_json::Value>() {
///     println!("{}", person["name"]);
/// }
///
/// client.shutdown().await?;
/// # Ok(())
/// # }
/// ```
pub struct ApiClient {
    config: ClientConfig,
    tokens: Arc<TokenManager>,
    registry: Arc<TaskRegistry>,
    dispatcher: RequestDispatcher,
    router: Mutex<ResponseRouter>,
}

impl ApiClient {
    /// Wire a client around `transport` and start its response router
    ///
    /// `sink` must be the sink `transport` reports to, and `events` the other
    /// half of the same completion channel. Must be called within a tokio
    /// runtime.
    ///
    /// # Errors
    /// Returns `FenixError::Config` if the configuration is invalid.
    pub fn new(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        sink: CompletionSink,
        events: CompletionEvents,
    ) -> Result<Self> {
        config.validate()?;

        let registry = Arc::new(TaskRegistry::new());
        let submitter = Arc::new(RequestSubmitter::new(transport, Arc::clone(&registry), sink));
        let tokens = Arc::new(TokenManager::new(
            config.credentials.clone(),
            config.refresh_token_url(),
            Arc::clone(&submitter),
        ));
        let dispatcher =
            RequestDispatcher::new(config.clone(), submitter, Arc::clone(&tokens));

        let mut router = ResponseRouter::new(Arc::clone(&registry), events);
        router.start()?;

        info!(api_base_url = %config.api_base_url, lang = %config.lang, "FenixEdu client ready");

        Ok(Self { config, tokens, registry, dispatcher, router: Mutex::new(router) })
    }

    /// Call an endpoint that needs no access token
    pub fn public_request<F>(&self, endpoint: &str, parameters: Parameters, callback: F)
    where
        F: FnOnce(ApiResponse) + Send + 'static,
    {
        self.dispatcher.public_request(endpoint, parameters, Box::new(callback));
    }

    /// Call an endpoint on behalf of the logged-in user
    pub fn private_request<F>(&self, endpoint: &str, parameters: Parameters, callback: F)
    where
        F: FnOnce(ApiResponse) + Send + 'static,
    {
        self.dispatcher.private_request(endpoint, parameters, Box::new(callback));
    }

    /// Dispatch a prepared descriptor
    pub fn dispatch<F>(&self, descriptor: RequestDescriptor, callback: F)
    where
        F: FnOnce(ApiResponse) + Send + 'static,
    {
        self.dispatcher.dispatch(descriptor, Box::new(callback));
    }

    /// Dispatch a descriptor and wait for its response
    #[instrument(skip(self, descriptor), fields(endpoint = %descriptor.endpoint))]
    pub async fn send(&self, descriptor: RequestDescriptor) -> ApiResponse {
        let (tx, rx) = oneshot::channel();
        self.dispatch(descriptor, move |response| {
            let _ = tx.send(response);
        });
        rx.await.unwrap_or_else(|_| {
            ApiResponse::rejected(RequestError::TransportFailure(
                "client shut down before the request completed".to_string(),
            ))
        })
    }

    /// Store a refresh token obtained from the login flow
    ///
    /// Invalidates the current access token and immediately starts a refresh
    /// in the background.
    pub fn set_refresh_token(&self, refresh_token: impl Into<String>) {
        self.tokens.set_refresh_token(refresh_token);
    }

    /// Refresh the access token now, whatever its expiry
    pub fn force_refresh(&self, on_done: Option<TokenCallback>) {
        self.tokens.force_refresh(on_done);
    }

    /// Forget all tokens
    pub fn logout(&self) {
        self.tokens.clear();
    }

    /// Snapshot of the current token state
    #[must_use]
    pub fn tokens(&self) -> TokenState {
        self.tokens.tokens()
    }

    #[must_use]
    pub fn token_manager(&self) -> &TokenManager {
        &self.tokens
    }

    /// URL of the browser login dialog for this application
    #[must_use]
    pub fn authentication_url(&self) -> String {
        let credentials = &self.config.credentials;
        format!(
            "{}?client_id={}&redirect_uri={}",
            self.config.user_dialog_url(),
            encode_component(&credentials.client_id),
            encode_component(&credentials.redirect_url)
        )
    }

    /// Requests still waiting for a completion
    #[must_use]
    pub fn pending_requests(&self) -> usize {
        self.registry.len()
    }

    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Stop the response router; pending callbacks are abandoned
    ///
    /// # Errors
    /// Returns `FenixError::Internal` if the router was not running or did
    /// not stop in time.
    pub async fn shutdown(&self) -> Result<()> {
        self.router.lock().await.stop().await
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("config", &self.config)
            .field("tokens", &self.tokens)
            .field("pending", &self.registry.len())
            .finish_non_exhaustive()
    }
}
