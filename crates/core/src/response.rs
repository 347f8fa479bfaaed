//! What a request callback receives
//!
//! Every request ends in exactly one [`ApiResponse`]. Success and failure
//! share this shape: failures carry no body and set [`ResponseMeta::error`],
//! so "no data" is the single signal callers have to handle.

use fenixedu_domain::FenixError;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::transport::TaskId;

/// Single-shot completion callback
pub type ResponseCallback = Box<dyn FnOnce(ApiResponse) + Send + 'static>;

/// Failure kinds a request can end with
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// A refresh was needed but no refresh token has been set
    #[error("No refresh token available")]
    NoRefreshToken,

    /// The refresh endpoint answered 401; a new login is required
    #[error("Refresh token was revoked")]
    RefreshTokenRevoked,

    /// The refresh endpoint answered with something other than a token
    #[error("Invalid refresh response: {0}")]
    RefreshParseError(String),

    /// The refresh token changed while the refresh was in flight
    #[error("Refresh superseded by a newer refresh token")]
    RefreshSuperseded,

    #[error("Unknown task id {0}")]
    UnknownTaskId(TaskId),

    #[error("Duplicate task id {0}")]
    DuplicateTaskId(TaskId),

    /// Request could not be built (e.g. unsupported `httpMethod` override)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Network-level failure reported by the transport
    #[error("Transport failure: {0}")]
    TransportFailure(String),
}

impl RequestError {
    /// Whether the session can only be recovered by a fresh external login
    #[must_use]
    pub const fn requires_login(&self) -> bool {
        matches!(self, Self::NoRefreshToken | Self::RefreshTokenRevoked)
    }
}

impl From<RequestError> for FenixError {
    fn from(err: RequestError) -> Self {
        match err {
            RequestError::NoRefreshToken
            | RequestError::RefreshTokenRevoked
            | RequestError::RefreshParseError(_)
            | RequestError::RefreshSuperseded => Self::Auth(err.to_string()),
            RequestError::TransportFailure(_) => Self::Network(err.to_string()),
            RequestError::InvalidRequest(_) => Self::InvalidInput(err.to_string()),
            RequestError::UnknownTaskId(_) | RequestError::DuplicateTaskId(_) => {
                Self::Internal(err.to_string())
            }
        }
    }
}

/// Status information accompanying a response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseMeta {
    /// HTTP status code, when the server answered at all
    pub status: Option<u16>,
    /// Final request URL as seen by the transport
    pub url: Option<String>,
    pub content_type: Option<String>,
    /// Set when the request failed or never reached the transport
    pub error: Option<RequestError>,
}

impl ResponseMeta {
    /// Metadata for an HTTP response
    #[must_use]
    pub fn http(status: u16, url: impl Into<String>) -> Self {
        Self { status: Some(status), url: Some(url.into()), ..Self::default() }
    }

    /// Attach a content type
    #[must_use]
    pub fn with_content_type(mut self, content_type: Option<String>) -> Self {
        self.content_type = content_type;
        self
    }

    /// True for a 2xx status without an error
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.status.is_some_and(|s| (200..300).contains(&s))
    }
}

/// Raw outcome of one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub body: Option<Vec<u8>>,
    pub meta: ResponseMeta,
}

impl ApiResponse {
    /// Response for a task that produced a body
    #[must_use]
    pub fn completed(body: Vec<u8>, meta: ResponseMeta) -> Self {
        Self { body: Some(body), meta }
    }

    /// Response for a task that failed after reaching the transport
    #[must_use]
    pub fn failed(mut meta: ResponseMeta, error: RequestError) -> Self {
        meta.error = Some(error);
        Self { body: None, meta }
    }

    /// Response for a request that never reached the transport
    #[must_use]
    pub fn rejected(error: RequestError) -> Self {
        Self::failed(ResponseMeta::default(), error)
    }

    /// Body bytes, or `None` when absent or empty
    #[must_use]
    pub fn bytes(&self) -> Option<&[u8]> {
        self.body.as_deref().filter(|b| !b.is_empty())
    }

    /// Whether there is anything to decode
    #[must_use]
    pub fn has_data(&self) -> bool {
        self.bytes().is_some()
    }

    #[must_use]
    pub const fn error(&self) -> Option<&RequestError> {
        self.meta.error.as_ref()
    }

    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        self.meta.status
    }

    /// Decode the body as JSON
    ///
    /// Returns `None` without attempting to decode when there is no data, and
    /// `None` when the body is not valid JSON for `T`. The status code is not
    /// consulted: error documents returned by the API decode like any other
    /// body.
    #[must_use]
    pub fn json<T: DeserializeOwned>(&self) -> Option<T> {
        let bytes = self.bytes()?;
        match serde_json::from_slice(bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(status = ?self.meta.status, error = %e, "Response body is not valid JSON");
                None
            }
        }
    }
}
