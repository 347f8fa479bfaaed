//! Form encoding and transport request building
//!
//! Values are escaped with the form convention the API expects for write
//! operations: everything outside `A-Za-z0-9-._~` is percent-escaped and a
//! space becomes `+`. The same encoding is used for query strings.

use fenixedu_domain::constants::PARAM_HTTP_METHOD;
use fenixedu_domain::HttpMethod;

use crate::request::Parameters;
use crate::response::RequestError;
use crate::transport::TransportRequest;

/// Percent-escape one key or value, rendering spaces as `+`
#[must_use]
pub fn encode_component(raw: &str) -> String {
    urlencoding::encode(raw).replace("%20", "+")
}

/// Join parameters as `k=v&k2=v2` in key order
#[must_use]
pub fn encode_parameters(parameters: &Parameters) -> String {
    parameters
        .iter()
        .map(|(k, v)| format!("{}={}", encode_component(k), encode_component(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Build the transport request for `url` from a merged parameter map
///
/// An `httpMethod` entry selects the verb (default `GET`) and is removed
/// before encoding. GET parameters go to the query string; any other verb
/// sends them as a form body.
///
/// # Errors
/// Returns `RequestError::InvalidRequest` for an unsupported verb override.
pub fn build_transport_request(
    url: &str,
    mut parameters: Parameters,
) -> Result<TransportRequest, RequestError> {
    let method = match parameters.remove(PARAM_HTTP_METHOD) {
        Some(raw) => raw.parse::<HttpMethod>().map_err(RequestError::InvalidRequest)?,
        None => HttpMethod::Get,
    };

    if parameters.is_empty() {
        return Ok(TransportRequest { method, url: url.to_string(), body: None });
    }

    let encoded = encode_parameters(&parameters);
    let request = if method.uses_query_string() {
        TransportRequest { method, url: format!("{url}?{encoded}"), body: None }
    } else {
        TransportRequest { method, url: url.to_string(), body: Some(encoded.into_bytes()) }
    };

    Ok(request)
}
