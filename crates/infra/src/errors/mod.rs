//! Infrastructure error conversions

pub mod conversions;

pub use conversions::{describe_http_error, InfraError};
