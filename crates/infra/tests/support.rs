use std::time::Duration;

use fenixedu_core::ApiClient;
use fenixedu_domain::{ClientConfig, Credentials};
use fenixedu_infra::connect;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const API_PATH: &str = "/api/fenix/v1";
pub const REFRESH_PATH: &str = "/oauth/refresh_token";

/// Route test logs through the libtest writer.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().with_env_filter("debug").try_init();
}

/// Configuration pointing both API and OAuth roots at `server`.
pub fn server_config(server: &MockServer) -> ClientConfig {
    ClientConfig::new(Credentials::new("client-id", "client-secret", "app://callback"))
        .with_base_urls(format!("{}{API_PATH}", server.uri()), server.uri())
}

/// Client connected to `server` through the real transport.
pub fn server_client(server: &MockServer) -> ApiClient {
    init_tracing();
    connect(server_config(server)).expect("client should connect")
}

/// Full path of an API endpoint on the mock server.
pub fn api_path(endpoint: &str) -> String {
    format!("{API_PATH}/{endpoint}")
}

/// Answer refresh grants with `access_token`.
pub async fn mount_refresh(server: &MockServer, access_token: &str, expires_in: i64) {
    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": access_token,
            "expires_in": expires_in,
        })))
        .mount(server)
        .await;
}

/// Wait until the client holds a valid access token.
pub async fn wait_for_access_token(client: &ApiClient) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while client.token_manager().access_token().is_none() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("refresh should complete in time");
}
