use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use fenixedu_core::{
    completion_channel, ApiClient, ApiResponse, CompletionSink, ResponseMeta, TaskId, Transport,
    TransportError, TransportRequest,
};
use fenixedu_domain::{ClientConfig, Credentials};
use tokio::sync::oneshot;

pub const API_BASE: &str = "https://fenix.test/api/fenix/v1";
pub const OAUTH_BASE: &str = "https://fenix.test";
pub const REFRESH_URL: &str = "https://fenix.test/oauth/refresh_token";

/// Route test logs through the libtest writer.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().with_env_filter("debug").try_init();
}

/// In-memory transport that records requests and lets tests decide when and
/// in which order tasks complete.
pub struct FakeTransport {
    sink: CompletionSink,
    next_id: AtomicU64,
    forced_id: Mutex<Option<u64>>,
    refuse_creation: AtomicBool,
    created: Mutex<Vec<(TaskId, TransportRequest)>>,
    started: Mutex<Vec<TaskId>>,
}

impl FakeTransport {
    pub fn new(sink: CompletionSink) -> Self {
        Self {
            sink,
            next_id: AtomicU64::new(1),
            forced_id: Mutex::new(None),
            refuse_creation: AtomicBool::new(false),
            created: Mutex::new(Vec::new()),
            started: Mutex::new(Vec::new()),
        }
    }

    /// Make the next created task reuse `raw` as its id.
    pub fn force_next_id(&self, raw: u64) {
        *self.forced_id.lock().unwrap() = Some(raw);
    }

    pub fn refuse_creation(&self, refuse: bool) {
        self.refuse_creation.store(refuse, Ordering::SeqCst);
    }

    pub fn created_count(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    /// Started requests in start order.
    pub fn started(&self) -> Vec<(TaskId, TransportRequest)> {
        let created = self.created.lock().unwrap();
        self.started
            .lock()
            .unwrap()
            .iter()
            .filter_map(|id| created.iter().rev().find(|(c, _)| c == id).cloned())
            .collect()
    }

    pub fn started_refreshes(&self) -> Vec<(TaskId, TransportRequest)> {
        self.started().into_iter().filter(|(_, r)| r.url == REFRESH_URL).collect()
    }

    pub fn started_api_calls(&self) -> Vec<(TaskId, TransportRequest)> {
        self.started().into_iter().filter(|(_, r)| r.url != REFRESH_URL).collect()
    }

    /// Wait until at least `count` tasks have been started.
    pub async fn wait_for_started(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.started.lock().unwrap().len() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("transport tasks should be started in time");
    }

    pub fn complete(&self, task_id: TaskId, status: u16, body: &str) {
        self.sink.completed(
            task_id,
            body.as_bytes().to_vec(),
            ResponseMeta::http(status, "https://fenix.test/"),
        );
    }

    pub fn fail(&self, task_id: TaskId, message: &str) {
        self.sink.failed(task_id, ResponseMeta::default(), message);
    }

    pub fn complete_refresh(&self, task_id: TaskId, access_token: &str, expires_in: i64) {
        let body = format!(r#"{{"access_token":"{access_token}","expires_in":{expires_in}}}"#);
        self.complete(task_id, 200, &body);
    }
}

impl Transport for FakeTransport {
    fn create_task(&self, request: TransportRequest) -> Result<TaskId, TransportError> {
        if self.refuse_creation.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        let raw = self
            .forced_id
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| self.next_id.fetch_add(1, Ordering::SeqCst));
        let task_id = TaskId::new(raw);
        self.created.lock().unwrap().push((task_id, request));
        Ok(task_id)
    }

    fn start_task(&self, task_id: TaskId) {
        self.started.lock().unwrap().push(task_id);
    }
}

pub fn test_config() -> ClientConfig {
    ClientConfig::new(Credentials::new("client-id", "client-secret", "app://callback"))
        .with_base_urls(API_BASE, OAUTH_BASE)
}

/// Client wired to a fresh fake transport. Needs a tokio runtime.
pub fn fake_client() -> (ApiClient, Arc<FakeTransport>) {
    init_tracing();
    let (sink, events) = completion_channel();
    let transport = Arc::new(FakeTransport::new(sink.clone()));
    let client = ApiClient::new(test_config(), transport.clone(), sink, events)
        .expect("client should start");
    (client, transport)
}

/// Callback that forwards its response to the returned receiver.
pub fn capture() -> (impl FnOnce(ApiResponse) + Send + 'static, oneshot::Receiver<ApiResponse>) {
    let (tx, rx) = oneshot::channel();
    (
        move |response| {
            let _ = tx.send(response);
        },
        rx,
    )
}

/// Await a captured response with a timeout.
pub async fn received(rx: oneshot::Receiver<ApiResponse>) -> ApiResponse {
    tokio::time::timeout(Duration::from_secs(5), rx)
        .await
        .expect("callback should run in time")
        .expect("callback should run exactly once")
}

/// Bring the client to a state with a valid access token.
pub async fn logged_in_client(access_token: &str) -> (ApiClient, Arc<FakeTransport>) {
    let (client, transport) = fake_client();
    client.set_refresh_token("refresh-1");
    transport.wait_for_started(1).await;
    let (refresh_id, _) = transport.started_refreshes()[0].clone();
    transport.complete_refresh(refresh_id, access_token, 3600);

    tokio::time::timeout(Duration::from_secs(5), async {
        while client.token_manager().access_token().is_none() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("initial refresh should complete");

    (client, transport)
}
