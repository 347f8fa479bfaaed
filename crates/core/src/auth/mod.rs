//! OAuth token lifecycle

pub mod token_manager;
pub mod token_state;

pub use token_manager::{TokenCallback, TokenManager};
pub use token_state::TokenState;
