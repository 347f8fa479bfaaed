//! Background HTTP transport backed by `reqwest`
//!
//! Each started task runs on its own tokio task, reads the whole response
//! body and reports the outcome through the client's completion sink.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use fenixedu_core::{
    CompletionSink, ResponseMeta, TaskId, Transport, TransportError, TransportRequest,
};
use fenixedu_domain::{ClientConfig, FenixError, HttpMethod};
use parking_lot::Mutex;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client as ReqwestClient, Method, Url};
use tokio::runtime::Handle;
use tracing::{debug, warn};

use super::client::HttpClientBuilder;
use crate::errors::describe_http_error;

/// A created task waiting for `start_task`
struct PendingTask {
    request: TransportRequest,
    url: Url,
}

/// [`Transport`] implementation performing real HTTP requests
pub struct ReqwestTransport {
    client: ReqwestClient,
    sink: CompletionSink,
    runtime: Handle,
    next_id: AtomicU64,
    pending: Mutex<HashMap<TaskId, PendingTask>>,
}

impl ReqwestTransport {
    /// Create a transport reporting to `sink`
    ///
    /// Tasks are spawned on the tokio runtime that is current at construction.
    ///
    /// # Errors
    /// Returns `FenixError::Internal` outside a tokio runtime and
    /// `FenixError::Network` if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig, sink: CompletionSink) -> Result<Self, FenixError> {
        let client = HttpClientBuilder::from_config(config).build()?;
        Self::with_client(client, sink)
    }

    /// Create a transport around an existing `reqwest` client
    ///
    /// # Errors
    /// Returns `FenixError::Internal` outside a tokio runtime.
    pub fn with_client(client: ReqwestClient, sink: CompletionSink) -> Result<Self, FenixError> {
        let runtime = Handle::try_current().map_err(|e| {
            FenixError::Internal(format!("ReqwestTransport requires a tokio runtime: {e}"))
        })?;

        Ok(Self {
            client,
            sink,
            runtime,
            next_id: AtomicU64::new(1),
            pending: Mutex::new(HashMap::new()),
        })
    }

    /// Tasks created but not yet started
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    async fn execute(
        client: ReqwestClient,
        sink: CompletionSink,
        task_id: TaskId,
        task: PendingTask,
    ) {
        let PendingTask { request, url } = task;
        let method = to_reqwest_method(request.method);
        let path = url.path().to_string();
        debug!(%task_id, %method, path = %path, "Sending HTTP request");

        let mut builder = client.request(method, url);
        if let Some(body) = request.body {
            builder = builder.header(CONTENT_TYPE, TransportRequest::FORM_CONTENT_TYPE).body(body);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(err) => {
                let meta = ResponseMeta {
                    status: err.status().map(|s| s.as_u16()),
                    url: Some(request.url),
                    ..ResponseMeta::default()
                };
                sink.failed(task_id, meta, describe_http_error(&err));
                return;
            }
        };

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let meta = ResponseMeta::http(status, response.url().as_str()).with_content_type(content_type);
        debug!(%task_id, status, path = %path, "Received HTTP response");

        match response.bytes().await {
            Ok(body) => sink.completed(task_id, body.to_vec(), meta),
            Err(err) => sink.failed(task_id, meta, describe_http_error(&err)),
        }
    }
}

impl Transport for ReqwestTransport {
    fn create_task(&self, request: TransportRequest) -> Result<TaskId, TransportError> {
        if self.sink.is_closed() {
            return Err(TransportError::Closed);
        }

        let url = Url::parse(&request.url)
            .map_err(|e| TransportError::InvalidRequest(format!("invalid URL: {e}")))?;
        let task_id = TaskId::new(self.next_id.fetch_add(1, Ordering::Relaxed));

        self.pending.lock().insert(task_id, PendingTask { request, url });
        Ok(task_id)
    }

    fn start_task(&self, task_id: TaskId) {
        let Some(task) = self.pending.lock().remove(&task_id) else {
            warn!(%task_id, "Start requested for unknown task");
            self.sink.failed(task_id, ResponseMeta::default(), "task was never created");
            return;
        };

        let client = self.client.clone();
        let sink = self.sink.clone();
        self.runtime.spawn(Self::execute(client, sink, task_id, task));
    }
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("pending", &self.pending_count())
            .finish_non_exhaustive()
    }
}

fn to_reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Delete => Method::DELETE,
    }
}
