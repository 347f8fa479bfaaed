//! Request dispatch
//!
//! [`RequestSubmitter`] is the single path from a parameter map to a started
//! transport task: build, create, register, start. Both API calls and token
//! refreshes go through it. [`RequestDispatcher`] sits on top and adds the
//! API conventions: the `lang` parameter, the enrol verb override, and the
//! access token for private endpoints.

use std::sync::Arc;

use fenixedu_domain::constants::{PARAM_ACCESS_TOKEN, PARAM_ENROL, PARAM_HTTP_METHOD, PARAM_LANG};
use fenixedu_domain::{ClientConfig, HttpMethod};
use tracing::{debug, error, instrument, warn};

use super::encoding::build_transport_request;
use super::registry::TaskRegistry;
use crate::auth::TokenManager;
use crate::request::{Parameters, RequestDescriptor};
use crate::response::{ApiResponse, RequestError, ResponseCallback};
use crate::transport::{CompletionSink, TaskId, Transport};

/// Builds transport requests, registers their callbacks and starts them
pub struct RequestSubmitter {
    transport: Arc<dyn Transport>,
    registry: Arc<TaskRegistry>,
    sink: CompletionSink,
}

impl RequestSubmitter {
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        registry: Arc<TaskRegistry>,
        sink: CompletionSink,
    ) -> Self {
        Self { transport, registry, sink }
    }

    /// Submit a request to `url` built from `parameters`
    ///
    /// The callback is registered under the transport's task id before the
    /// task starts. Returns the id of the started task. When the request
    /// cannot be started, `None` is returned and the callback still receives
    /// exactly one error response through the router.
    pub fn submit(
        &self,
        url: &str,
        parameters: Parameters,
        callback: ResponseCallback,
    ) -> Option<TaskId> {
        if self.sink.is_closed() {
            debug!(url, "Client shut down; request not dispatched");
            self.reject(callback, RequestError::TransportFailure("client is shut down".to_string()));
            return None;
        }

        let request = match build_transport_request(url, parameters) {
            Ok(request) => request,
            Err(e) => {
                warn!(url, error = %e, "Request rejected before dispatch");
                self.reject(callback, e);
                return None;
            }
        };
        let method = request.method;

        let task_id = match self.transport.create_task(request) {
            Ok(task_id) => task_id,
            Err(e) => {
                error!(url, %method, error = %e, "Transport refused to create task");
                self.reject(callback, RequestError::TransportFailure(e.to_string()));
                return None;
            }
        };

        if let Err(duplicate) = self.registry.register(task_id, callback) {
            error!(%task_id, url, "Transport reused a pending task id; request not started");
            self.reject(duplicate.callback, RequestError::DuplicateTaskId(task_id));
            return None;
        }

        debug!(%task_id, %method, url, "Request dispatched");
        self.transport.start_task(task_id);
        Some(task_id)
    }

    /// Answer `callback` with an error response without touching the network
    pub fn reject(&self, callback: ResponseCallback, error: RequestError) {
        self.sink.deliver(callback, ApiResponse::rejected(error));
    }

    /// Registry shared with the response router
    #[must_use]
    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }
}

impl std::fmt::Debug for RequestSubmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSubmitter").field("registry", &self.registry).finish_non_exhaustive()
    }
}

/// Dispatches public and private API calls
pub struct RequestDispatcher {
    submitter: Arc<RequestSubmitter>,
    tokens: Arc<TokenManager>,
    config: ClientConfig,
}

impl RequestDispatcher {
    #[must_use]
    pub fn new(
        config: ClientConfig,
        submitter: Arc<RequestSubmitter>,
        tokens: Arc<TokenManager>,
    ) -> Self {
        Self { submitter, tokens, config }
    }

    /// Issue a call that needs no access token
    #[instrument(skip(self, parameters, callback))]
    pub fn public_request(
        &self,
        endpoint: &str,
        mut parameters: Parameters,
        callback: ResponseCallback,
    ) {
        parameters.insert(PARAM_LANG.to_string(), self.config.lang.clone());
        self.submitter.submit(&self.config.endpoint_url(endpoint), parameters, callback);
    }

    /// Issue a call on behalf of the logged-in user
    ///
    /// Refreshes the access token first when it has expired. Token failures
    /// never reach the transport; the callback gets an error response.
    #[instrument(skip(self, parameters, callback))]
    pub fn private_request(
        &self,
        endpoint: &str,
        mut parameters: Parameters,
        callback: ResponseCallback,
    ) {
        parameters.insert(PARAM_LANG.to_string(), self.config.lang.clone());
        if is_enrol_action(endpoint, &parameters) {
            parameters.insert(PARAM_HTTP_METHOD.to_string(), HttpMethod::Put.to_string());
        }

        let url = self.config.endpoint_url(endpoint);
        let submitter = Arc::clone(&self.submitter);
        let endpoint = endpoint.to_string();

        self.tokens.ensure_valid_token(Box::new(move |token| match token {
            Ok(access_token) => {
                parameters.insert(PARAM_ACCESS_TOKEN.to_string(), access_token);
                submitter.submit(&url, parameters, callback);
            }
            Err(e) => {
                warn!(endpoint = %endpoint, error = %e, "Private request aborted: no usable access token");
                submitter.reject(callback, e);
            }
        }));
    }

    /// Route a descriptor to the public or private path
    pub fn dispatch(&self, descriptor: RequestDescriptor, callback: ResponseCallback) {
        let RequestDescriptor { endpoint, parameters, is_private } = descriptor;
        if is_private {
            self.private_request(&endpoint, parameters, callback);
        } else {
            self.public_request(&endpoint, parameters, callback);
        }
    }
}

/// Enrolment changes are the API's only write calls and must use `PUT`
fn is_enrol_action(endpoint: &str, parameters: &Parameters) -> bool {
    parameters.contains_key(PARAM_ENROL)
        || endpoint.split('/').any(|segment| segment == PARAM_ENROL)
}
