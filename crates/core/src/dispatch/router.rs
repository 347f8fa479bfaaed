//! Serial completion worker
//!
//! Transports report task outcomes from arbitrary threads and in arbitrary
//! order. The router drains those reports on a single background task, looks
//! up the pending callback for each one and invokes it. Local deliveries
//! (requests rejected before reaching the transport) travel the same channel,
//! so every callback runs on this one serial context.
//!
//! Lifecycle mirrors the other background workers: `start` spawns the loop
//! with a fresh cancellation token, `stop` cancels it and joins within a
//! timeout.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use fenixedu_domain::{FenixError, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::registry::TaskRegistry;
use crate::response::{ApiResponse, RequestError, ResponseCallback};
use crate::transport::{CompletionEvents, RouterEvent};

/// Default time allowed for the worker to finish after cancellation
pub const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Routes transport completions back to their callbacks
pub struct ResponseRouter {
    registry: Arc<TaskRegistry>,
    events: Option<CompletionEvents>,
    cancellation: CancellationToken,
    task_handle: Option<JoinHandle<()>>,
    join_timeout: Duration,
}

impl ResponseRouter {
    #[must_use]
    pub fn new(registry: Arc<TaskRegistry>, events: CompletionEvents) -> Self {
        Self {
            registry,
            events: Some(events),
            cancellation: CancellationToken::new(),
            task_handle: None,
            join_timeout: DEFAULT_JOIN_TIMEOUT,
        }
    }

    /// Override the join timeout used by [`stop`](Self::stop)
    #[must_use]
    pub fn with_join_timeout(mut self, join_timeout: Duration) -> Self {
        self.join_timeout = join_timeout;
        self
    }

    /// Spawn the worker on the current tokio runtime
    ///
    /// # Errors
    /// Returns `FenixError::Internal` if the worker is already running or was
    /// stopped before (the completion channel can only be consumed once).
    #[instrument(skip(self))]
    pub fn start(&mut self) -> Result<()> {
        if self.is_running() {
            return Err(FenixError::Internal("Response router already running".to_string()));
        }
        let Some(events) = self.events.take() else {
            return Err(FenixError::Internal(
                "Response router cannot be restarted after stop".to_string(),
            ));
        };

        self.cancellation = CancellationToken::new();
        let cancel = self.cancellation.clone();
        let registry = Arc::clone(&self.registry);

        let handle = tokio::spawn(async move {
            Self::route_loop(events.rx, registry, cancel).await;
        });

        self.task_handle = Some(handle);
        info!("Response router started");
        Ok(())
    }

    /// Cancel the worker and wait for it to finish
    ///
    /// Callbacks still pending in the registry are dropped without being
    /// invoked.
    ///
    /// # Errors
    /// Returns `FenixError::Internal` if the worker is not running, panicked,
    /// or did not finish within the join timeout.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> Result<()> {
        let Some(handle) = self.task_handle.take() else {
            return Err(FenixError::Internal("Response router not running".to_string()));
        };

        info!("Stopping response router");
        self.cancellation.cancel();

        let joined = match tokio::time::timeout(self.join_timeout, handle).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                warn!("Response router task panicked: {}", e);
                Err(FenixError::Internal("Response router task panicked".to_string()))
            }
            Err(_) => {
                warn!("Response router did not complete within timeout");
                Err(FenixError::Internal("Response router task timeout".to_string()))
            }
        };

        let abandoned = self.registry.clear();
        if abandoned > 0 {
            debug!(abandoned, "Pending requests abandoned on shutdown");
        }
        if joined.is_ok() {
            info!("Response router stopped");
        }
        joined
    }

    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.task_handle.is_some()
    }

    async fn route_loop(
        mut rx: mpsc::UnboundedReceiver<RouterEvent>,
        registry: Arc<TaskRegistry>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!("Response router loop cancelled");
                    break;
                }
                event = rx.recv() => {
                    let Some(event) = event else {
                        debug!("Completion channel closed");
                        break;
                    };
                    Self::handle_event(&registry, event);
                }
            }
        }
    }

    fn handle_event(registry: &TaskRegistry, event: RouterEvent) {
        match event {
            RouterEvent::Completed { task_id, body, meta } => match registry.take(task_id) {
                Ok(callback) => {
                    debug!(%task_id, status = ?meta.status, bytes = body.len(), "Request completed");
                    invoke(callback, ApiResponse::completed(body, meta));
                }
                Err(e) => warn!(%task_id, error = %e, "Dropping completion for unknown task"),
            },
            RouterEvent::Failed { task_id, meta, message } => match registry.take(task_id) {
                Ok(callback) => {
                    warn!(%task_id, status = ?meta.status, error = %message, "Request failed");
                    invoke(callback, ApiResponse::failed(meta, RequestError::TransportFailure(message)));
                }
                Err(e) => warn!(%task_id, error = %e, "Dropping failure for unknown task"),
            },
            RouterEvent::Deliver { callback, response } => invoke(callback, response),
        }
    }
}

impl Drop for ResponseRouter {
    fn drop(&mut self) {
        self.cancellation.cancel();
    }
}

impl std::fmt::Debug for ResponseRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseRouter")
            .field("registry", &self.registry)
            .field("running", &self.is_running())
            .field("join_timeout", &self.join_timeout)
            .finish_non_exhaustive()
    }
}

/// Run a callback, keeping the worker alive if it panics
fn invoke(callback: ResponseCallback, response: ApiResponse) {
    if catch_unwind(AssertUnwindSafe(move || callback(response))).is_err() {
        error!("Response callback panicked");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::sync::oneshot;

    use super::*;
    use crate::response::ResponseMeta;
    use crate::transport::{completion_channel, TaskId};

    #[tokio::test]
    async fn routes_completion_to_registered_callback() {
        let (sink, events) = completion_channel();
        let registry = Arc::new(TaskRegistry::new());
        let mut router = ResponseRouter::new(Arc::clone(&registry), events);
        router.start().unwrap();

        let (tx, rx) = oneshot::channel();
        registry
            .register(
                TaskId::new(1),
                Box::new(move |response| {
                    let _ = tx.send(response);
                }),
            )
            .unwrap();

        sink.completed(TaskId::new(1), b"{}".to_vec(), ResponseMeta::http(200, "u"));
        let response = rx.await.unwrap();

        assert_eq!(response.body.as_deref(), Some(&b"{}"[..]));
        assert!(registry.is_empty());
        router.stop().await.unwrap();
    }

    #[tokio::test]
    async fn failure_carries_error_and_no_body() {
        let (sink, events) = completion_channel();
        let registry = Arc::new(TaskRegistry::new());
        let mut router = ResponseRouter::new(Arc::clone(&registry), events);
        router.start().unwrap();

        let (tx, rx) = oneshot::channel();
        registry
            .register(
                TaskId::new(2),
                Box::new(move |response| {
                    let _ = tx.send(response);
                }),
            )
            .unwrap();

        sink.failed(TaskId::new(2), ResponseMeta::http(502, "u"), "bad gateway");
        let response = rx.await.unwrap();

        assert!(response.body.is_none());
        assert_eq!(response.status(), Some(502));
        assert_eq!(
            response.error(),
            Some(&RequestError::TransportFailure("bad gateway".to_string()))
        );
        router.stop().await.unwrap();
    }

    #[tokio::test]
    async fn unknown_and_panicking_callbacks_do_not_stop_worker() {
        let (sink, events) = completion_channel();
        let registry = Arc::new(TaskRegistry::new());
        let mut router = ResponseRouter::new(Arc::clone(&registry), events);
        router.start().unwrap();

        registry.register(TaskId::new(3), Box::new(|_| panic!("callback bug"))).unwrap();
        sink.completed(TaskId::new(3), Vec::new(), ResponseMeta::http(200, "u"));
        sink.completed(TaskId::new(404), Vec::new(), ResponseMeta::http(200, "u"));

        let calls = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = oneshot::channel();
        let counter = Arc::clone(&calls);
        sink.deliver(
            Box::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                let _ = tx.send(());
            }),
            ApiResponse::rejected(RequestError::NoRefreshToken),
        );
        rx.await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(router.is_running());
        router.stop().await.unwrap();
    }

    #[tokio::test]
    async fn lifecycle_errors() {
        let (_sink, events) = completion_channel();
        let mut router = ResponseRouter::new(Arc::new(TaskRegistry::new()), events)
            .with_join_timeout(Duration::from_secs(1));

        assert!(router.stop().await.is_err());
        router.start().unwrap();
        assert!(router.start().is_err());
        router.stop().await.unwrap();
        assert!(!router.is_running());
        assert!(router.start().is_err());
    }
}
