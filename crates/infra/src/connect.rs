//! Client wiring
//!
//! Assembles an [`ApiClient`] around a [`ReqwestTransport`].

use std::sync::Arc;

use fenixedu_core::{completion_channel, ApiClient};
use fenixedu_domain::{ClientConfig, Result};
use tracing::instrument;

use crate::config;
use crate::http::ReqwestTransport;

/// Build a ready client for `config`
///
/// Must be called within a tokio runtime; the transport and the response
/// router both spawn onto it.
///
/// # Errors
/// Returns `FenixError::Config` for an invalid configuration and
/// `FenixError::Internal` outside a tokio runtime.
#[instrument(skip(config), fields(api_base_url = %config.api_base_url))]
pub fn connect(config: ClientConfig) -> Result<ApiClient> {
    config.validate()?;
    let (sink, events) = completion_channel();
    let transport = ReqwestTransport::new(&config, sink.clone())?;
    ApiClient::new(config, Arc::new(transport), sink, events)
}

/// Load configuration with [`config::load`] and connect
///
/// # Errors
/// Returns any error from loading the configuration or from [`connect`].
pub fn connect_from_env() -> Result<ApiClient> {
    connect(config::load()?)
}
