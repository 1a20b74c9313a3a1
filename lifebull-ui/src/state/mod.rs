//! State Management
//!
//! Auth token signal and browser storage.

pub mod auth;
pub mod storage;

pub use auth::{session, use_auth_token, use_route_guard, AuthToken};
pub use storage::LocalStorage;
