//! # FenixEdu Infrastructure
//!
//! I/O implementations for the ports defined in `fenixedu-core`.
//!
//! This crate contains:
//! - The `reqwest` background transport
//! - Configuration loading from environment variables and files
//! - Tracing subscriber setup
//! - [`connect`], which wires a ready [`fenixedu_core::ApiClient`]
//!
//! ## Architecture
//! - Implements traits defined in `fenixedu-core`
//! - Depends on `fenixedu-domain` and `fenixedu-core`
//! - Contains all "impure" code (network, environment, files)

pub mod config;
pub mod connect;
pub mod errors;
pub mod http;
pub mod observability;

// Re-export commonly used items
pub use connect::{connect, connect_from_env};
pub use errors::InfraError;
pub use http::{HttpClientBuilder, ReqwestTransport};
pub use observability::init_tracing;
