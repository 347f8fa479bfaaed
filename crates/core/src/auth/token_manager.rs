//! Token manager with on-demand refresh
//!
//! Owns the client's [`TokenState`] and talks to the OAuth refresh endpoint:
//! - Hands out the access token while it is unexpired
//! - Refreshes it through the regular request path when it is not
//! - Treats a 401 from the refresh endpoint as a revoked refresh token
//!
//! Refresh calls are not coalesced. Two private calls that both find the
//! token expired trigger two refreshes, and whichever completes last wins.

use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use fenixedu_domain::constants::{GRANT_TYPE_REFRESH, PARAM_HTTP_METHOD};
use fenixedu_domain::{Credentials, HttpMethod};
use parking_lot::Mutex;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::token_state::TokenState;
use crate::dispatch::RequestSubmitter;
use crate::request::Parameters;
use crate::response::{ApiResponse, RequestError};

/// Continuation receiving a usable access token, or why none is available
pub type TokenCallback = Box<dyn FnOnce(Result<String, RequestError>) + Send + 'static>;

/// Success body of the refresh endpoint
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    expires_in: i64,
}

/// Access/refresh token lifecycle for one client instance
pub struct TokenManager {
    state: Arc<Mutex<TokenState>>,
    credentials: Credentials,
    refresh_url: String,
    submitter: Arc<RequestSubmitter>,
}

impl TokenManager {
    /// Create a manager with no tokens
    ///
    /// # Arguments
    /// * `credentials` - Client credentials sent with every refresh
    /// * `refresh_url` - Absolute URL of the refresh endpoint
    /// * `submitter` - Shared request path used for refresh calls
    #[must_use]
    pub fn new(
        credentials: Credentials,
        refresh_url: impl Into<String>,
        submitter: Arc<RequestSubmitter>,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(TokenState::new())),
            credentials,
            refresh_url: refresh_url.into(),
            submitter,
        }
    }

    /// Run `continuation` with a valid access token
    ///
    /// Without a refresh token the continuation receives
    /// `RequestError::NoRefreshToken` immediately. With an unexpired access
    /// token it runs synchronously on the calling thread and no network call
    /// is made. Otherwise a refresh is issued and the continuation runs once
    /// that refresh completes.
    pub fn ensure_valid_token(&self, continuation: TokenCallback) {
        let cached = {
            let state = self.state.lock();
            if state.refresh_token.is_none() {
                None
            } else {
                Some(state.valid_access_token(Utc::now()).map(str::to_owned))
            }
        };

        match cached {
            None => continuation(Err(RequestError::NoRefreshToken)),
            Some(Some(token)) => continuation(Ok(token)),
            Some(None) => {
                debug!("Access token expired, refreshing before request");
                self.force_refresh(Some(continuation));
            }
        }
    }

    /// Issue a refresh call regardless of the current expiry
    ///
    /// `on_done` receives the new access token, or the refresh failure. On
    /// any failure the token state is left exactly as it was. A grant that
    /// completes after the refresh token was replaced or cleared is discarded.
    pub fn force_refresh(&self, on_done: Option<TokenCallback>) {
        let Some(refresh_token) = self.state.lock().refresh_token.clone() else {
            warn!("Refresh requested without a refresh token");
            if let Some(on_done) = on_done {
                on_done(Err(RequestError::NoRefreshToken));
            }
            return;
        };

        let mut parameters = Parameters::new();
        parameters.insert("client_id".to_string(), self.credentials.client_id.clone());
        parameters.insert("client_secret".to_string(), self.credentials.client_secret.clone());
        parameters.insert("refresh_token".to_string(), refresh_token.clone());
        parameters.insert("grant_type".to_string(), GRANT_TYPE_REFRESH.to_string());
        parameters.insert(PARAM_HTTP_METHOD.to_string(), HttpMethod::Post.to_string());

        let state = Arc::clone(&self.state);
        debug!("Requesting access token refresh");
        self.submitter.submit(
            &self.refresh_url,
            parameters,
            Box::new(move |response| {
                let result = apply_refresh_response(&state, &refresh_token, &response);
                if let Some(on_done) = on_done {
                    on_done(result);
                } else if let Err(e) = result {
                    warn!(error = %e, "Background token refresh failed");
                }
            }),
        );
    }

    /// Store a new refresh token, invalidate the access token and refresh
    ///
    /// The refresh completes asynchronously and in no particular order with
    /// respect to other in-flight calls.
    pub fn set_refresh_token(&self, refresh_token: impl Into<String>) {
        self.state.lock().replace_refresh_token(refresh_token.into());
        info!("Refresh token updated");
        self.force_refresh(None);
    }

    /// Drop all tokens; later private calls fail with `NoRefreshToken`
    pub fn clear(&self) {
        *self.state.lock() = TokenState::new();
        info!("Tokens cleared");
    }

    /// Current access token, only while it is unexpired
    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.state.lock().valid_access_token(Utc::now()).map(str::to_owned)
    }

    #[must_use]
    pub fn refresh_token(&self) -> Option<String> {
        self.state.lock().refresh_token.clone()
    }

    /// Whole seconds until the access token expires, `None` when expired
    #[must_use]
    pub fn seconds_until_expiry(&self) -> Option<i64> {
        self.state.lock().time_until_expiry(Utc::now()).map(|d| d.num_seconds())
    }

    /// Snapshot of the token state
    #[must_use]
    pub fn tokens(&self) -> TokenState {
        self.state.lock().clone()
    }
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("state", &*self.state.lock())
            .field("refresh_url", &self.refresh_url)
            .finish_non_exhaustive()
    }
}

/// Interpret a refresh response and update `state` on success
///
/// `granted_with` is the refresh token the grant was issued with; the result
/// is only stored while it is still the current one.
fn apply_refresh_response(
    state: &Mutex<TokenState>,
    granted_with: &str,
    response: &ApiResponse,
) -> Result<String, RequestError> {
    if let Some(err) = response.error() {
        return Err(err.clone());
    }

    match response.status() {
        Some(401) => {
            warn!("Refresh token was rejected by the server");
            return Err(RequestError::RefreshTokenRevoked);
        }
        Some(status) if (200..300).contains(&status) => {}
        Some(status) => {
            return Err(RequestError::RefreshParseError(format!("unexpected status {status}")));
        }
        None => return Err(RequestError::RefreshParseError("missing status".to_string())),
    }

    let bytes = response
        .bytes()
        .ok_or_else(|| RequestError::RefreshParseError("empty body".to_string()))?;
    let parsed: RefreshResponse = serde_json::from_slice(bytes)
        .map_err(|e| RequestError::RefreshParseError(e.to_string()))?;

    let now = Utc::now();
    let expiry = TimeDelta::try_seconds(parsed.expires_in)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or_else(|| {
            RequestError::RefreshParseError(format!("expires_in out of range: {}", parsed.expires_in))
        })?;

    let mut state = state.lock();
    match state.refresh_token.as_deref() {
        Some(current) if current == granted_with => {}
        Some(_) => {
            debug!("Refresh token replaced while refresh was in flight; discarding grant");
            return Err(RequestError::RefreshSuperseded);
        }
        None => {
            debug!("Tokens cleared while refresh was in flight; discarding grant");
            return Err(RequestError::NoRefreshToken);
        }
    }
    state.apply_refresh(parsed.access_token.clone(), expiry);
    drop(state);
    info!(expires_in = parsed.expires_in, "Access token refreshed");
    Ok(parsed.access_token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::ResponseMeta;

    fn refresh_reply(status: u16, body: &str) -> ApiResponse {
        ApiResponse::completed(
            body.as_bytes().to_vec(),
            ResponseMeta::http(status, "https://fenix.test/oauth/refresh_token"),
        )
    }

    fn seeded_state() -> Mutex<TokenState> {
        let mut state = TokenState::new();
        state.refresh_token = Some("refresh".to_string());
        state.apply_refresh("old".to_string(), Utc::now() + TimeDelta::minutes(5));
        Mutex::new(state)
    }

    fn state_with_refresh(refresh_token: &str) -> Mutex<TokenState> {
        let mut state = TokenState::new();
        state.refresh_token = Some(refresh_token.to_string());
        Mutex::new(state)
    }

    #[test]
    fn success_updates_token_and_expiry() {
        let state = state_with_refresh("refresh");
        let result = apply_refresh_response(
            &state,
            "refresh",
            &refresh_reply(200, r#"{"access_token":"new","expires_in":3600}"#),
        );

        assert_eq!(result, Ok("new".to_string()));
        let state = state.lock();
        assert_eq!(state.valid_access_token(Utc::now()), Some("new"));
        let remaining = state.time_until_expiry(Utc::now()).unwrap();
        assert!(remaining > TimeDelta::seconds(3590));
    }

    #[test]
    fn unauthorized_leaves_state_untouched() {
        let state = seeded_state();
        let before = state.lock().clone();

        let result = apply_refresh_response(&state, "refresh", &refresh_reply(401, r#"{"error":"x"}"#));

        assert_eq!(result, Err(RequestError::RefreshTokenRevoked));
        assert_eq!(*state.lock(), before);
    }

    #[test]
    fn missing_fields_are_parse_errors() {
        let state = seeded_state();
        let before = state.lock().clone();

        for body in [r#"{"access_token":"x"}"#, r#"{"expires_in":10}"#, "[]", "not json", ""] {
            let result = apply_refresh_response(&state, "refresh", &refresh_reply(200, body));
            assert!(
                matches!(result, Err(RequestError::RefreshParseError(_))),
                "body {body:?} gave {result:?}"
            );
        }
        assert_eq!(*state.lock(), before);
    }

    #[test]
    fn server_error_is_parse_error() {
        let state = seeded_state();
        let result = apply_refresh_response(
            &state,
            "refresh",
            &refresh_reply(500, r#"{"access_token":"x","expires_in":10}"#),
        );
        assert!(matches!(result, Err(RequestError::RefreshParseError(_))));
        assert_eq!(state.lock().access_token.as_deref(), Some("old"));
    }

    #[test]
    fn transport_failure_passes_through() {
        let state = seeded_state();
        let response =
            ApiResponse::rejected(RequestError::TransportFailure("connection reset".to_string()));
        let result = apply_refresh_response(&state, "refresh", &response);
        assert_eq!(result, Err(RequestError::TransportFailure("connection reset".to_string())));
    }

    #[test]
    fn absurd_lifetime_is_rejected() {
        let state = state_with_refresh("refresh");
        let body = format!(r#"{{"access_token":"x","expires_in":{}}}"#, i64::MAX);
        let result = apply_refresh_response(&state, "refresh", &refresh_reply(200, &body));
        assert!(matches!(result, Err(RequestError::RefreshParseError(_))));
        assert!(state.lock().access_token.is_none());
    }

    #[test]
    fn grant_for_replaced_refresh_token_is_discarded() {
        let state = seeded_state();
        state.lock().replace_refresh_token("rotated".to_string());
        let before = state.lock().clone();

        let result = apply_refresh_response(
            &state,
            "refresh",
            &refresh_reply(200, r#"{"access_token":"late","expires_in":3600}"#),
        );

        assert_eq!(result, Err(RequestError::RefreshSuperseded));
        assert_eq!(*state.lock(), before);
    }

    #[test]
    fn grant_after_clear_is_discarded() {
        let state = Mutex::new(TokenState::new());

        let result = apply_refresh_response(
            &state,
            "refresh",
            &refresh_reply(200, r#"{"access_token":"ghost","expires_in":3600}"#),
        );

        assert_eq!(result, Err(RequestError::NoRefreshToken));
        assert!(state.lock().valid_access_token(Utc::now()).is_none());
    }
}
