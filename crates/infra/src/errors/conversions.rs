//! Conversions from external infrastructure errors into domain errors.

use fenixedu_domain::FenixError;
use reqwest::Error as HttpError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub FenixError);

impl From<InfraError> for FenixError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<FenixError> for InfraError {
    fn from(value: FenixError) -> Self {
        Self(value)
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → FenixError */
/* -------------------------------------------------------------------------- */

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        Self(FenixError::Network(describe_http_error(&value)))
    }
}

/// Short description of a transport-level failure
///
/// Never includes the request URL: private calls carry the access token in
/// the query string.
#[must_use]
pub fn describe_http_error(err: &HttpError) -> String {
    if err.is_timeout() {
        return "HTTP request timed out".to_string();
    }
    if err.is_connect() {
        return "HTTP connection failure".to_string();
    }
    if err.is_builder() {
        return "HTTP client could not be built".to_string();
    }
    if err.is_body() || err.is_decode() {
        return "Failed to read HTTP response body".to_string();
    }
    if err.is_redirect() {
        return "Too many HTTP redirects".to_string();
    }
    if let Some(status) = err.status() {
        return format!(
            "HTTP {} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("unknown status")
        );
    }
    "HTTP request failed".to_string()
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
