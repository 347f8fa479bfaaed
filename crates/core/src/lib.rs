//! # FenixEdu Core
//!
//! Request orchestration and token lifecycle engine - no I/O of its own.
//!
//! This crate contains:
//! - OAuth token state and on-demand refresh
//! - Request building, form encoding and dispatch
//! - The pending request registry and serial response router
//! - The [`Transport`] port implemented by infrastructure
//! - The [`ApiClient`] facade and endpoint catalogue
//!
//! ## Architecture Principles
//! - Only depends on `fenixedu-domain`
//! - Network access goes through the [`Transport`] trait
//! - Every request ends in exactly one callback invocation

pub mod auth;
pub mod client;
pub mod dispatch;
pub mod endpoints;
pub mod request;
pub mod response;
pub mod transport;

pub use auth::{TokenCallback, TokenManager, TokenState};
pub use client::ApiClient;
pub use dispatch::{
    RegistryError, RequestDispatcher, RequestSubmitter, ResponseRouter, TaskRegistry,
};
pub use request::{Parameters, RequestDescriptor};
pub use response::{ApiResponse, RequestError, ResponseCallback, ResponseMeta};
pub use transport::{
    completion_channel, CompletionEvents, CompletionSink, TaskId, Transport, TransportError,
    TransportRequest,
};
