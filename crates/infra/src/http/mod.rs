//! HTTP transport implementation

pub mod client;
pub mod transport;

pub use client::{HttpClientBuilder, DEFAULT_USER_AGENT};
pub use transport::ReqwestTransport;
