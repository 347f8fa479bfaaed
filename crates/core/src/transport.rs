//! Transport port
//!
//! The core never performs I/O itself. A [`Transport`] creates network tasks
//! on request and reports their outcome later through a [`CompletionSink`].
//! Creation and start are separate steps so the dispatcher can register the
//! completion callback under the transport-assigned id before any byte goes
//! out.

use std::fmt;

use fenixedu_domain::HttpMethod;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

use crate::response::{ApiResponse, ResponseCallback, ResponseMeta};

/// Opaque identifier of one in-flight network task, assigned by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    /// Wrap a raw transport identifier
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw identifier value
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Fully built HTTP request handed to the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    pub method: HttpMethod,
    /// Absolute URL, including the query string for GET requests
    pub url: String,
    /// Form-encoded body for non-GET requests
    pub body: Option<Vec<u8>>,
}

impl TransportRequest {
    /// Content type used for every request body
    pub const FORM_CONTENT_TYPE: &'static str = "application/x-www-form-urlencoded";

    /// Body as text, if present and valid UTF-8
    #[must_use]
    pub fn body_str(&self) -> Option<&str> {
        self.body.as_deref().and_then(|b| std::str::from_utf8(b).ok())
    }
}

/// Errors raised synchronously by a transport when creating a task
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Transport is shut down")]
    Closed,
}

/// Background network transport
///
/// Implementations must hand out unique task ids and must report every
/// started task exactly once through the [`CompletionSink`] they were built
/// with.
pub trait Transport: Send + Sync {
    /// Create (but do not start) a task for `request`
    ///
    /// # Errors
    /// Returns error if the request cannot be turned into a network task.
    fn create_task(&self, request: TransportRequest) -> Result<TaskId, TransportError>;

    /// Start a previously created task
    fn start_task(&self, task_id: TaskId);
}

/// Event consumed by the serial completion worker
pub(crate) enum RouterEvent {
    Completed { task_id: TaskId, body: Vec<u8>, meta: ResponseMeta },
    Failed { task_id: TaskId, meta: ResponseMeta, message: String },
    Deliver { callback: ResponseCallback, response: ApiResponse },
}

/// Handle through which transports report task outcomes
///
/// Cheap to clone. Reports sent after the client has shut down are dropped.
#[derive(Debug, Clone)]
pub struct CompletionSink {
    tx: mpsc::UnboundedSender<RouterEvent>,
}

/// Receiving half of the completion channel, owned by the response router
pub struct CompletionEvents {
    pub(crate) rx: mpsc::UnboundedReceiver<RouterEvent>,
}

impl fmt::Debug for CompletionEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionEvents").finish_non_exhaustive()
    }
}

/// Create the channel connecting a transport to a client's response router
#[must_use]
pub fn completion_channel() -> (CompletionSink, CompletionEvents) {
    let (tx, rx) = mpsc::unbounded_channel();
    (CompletionSink { tx }, CompletionEvents { rx })
}

impl CompletionSink {
    /// Report a task that finished with a full response body
    pub fn completed(&self, task_id: TaskId, body: Vec<u8>, meta: ResponseMeta) {
        self.send(RouterEvent::Completed { task_id, body, meta });
    }

    /// Report a task that failed (network error, cancellation, body read error)
    pub fn failed(&self, task_id: TaskId, meta: ResponseMeta, message: impl Into<String>) {
        self.send(RouterEvent::Failed { task_id, meta, message: message.into() });
    }

    /// Queue a callback invocation that never reached the transport
    pub(crate) fn deliver(&self, callback: ResponseCallback, response: ApiResponse) {
        self.send(RouterEvent::Deliver { callback, response });
    }

    /// Whether the router side has gone away
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn send(&self, event: RouterEvent) {
        if self.tx.send(event).is_err() {
            debug!("Completion dropped: response router is gone");
        }
    }
}
