//! # FenixEdu Domain
//!
//! Plain data types shared by the FenixEdu client crates.
//!
//! This crate contains:
//! - Client configuration and OAuth credentials
//! - Domain error types and Result definitions
//! - API constants (base URLs, reserved parameter keys)
//! - HTTP verb model used by request building
//!
//! ## Architecture
//! - No dependencies on other FenixEdu crates
//! - No I/O: everything here is constructed, validated and serialized only

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
