//! Wayfarer Core - data-access layer for the attractions and travel-blog
//! backend.
//!
//! This crate provides the request pipeline (timeouts, duplicate-request
//! guard, retries, response envelope unwrapping), the login session store,
//! typed endpoint groups for the user, attraction and social services, and
//! a few text utilities for user-written content. Front ends (the CLI in
//! this workspace) build on top of it.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod utils;

// Re-export commonly used types
pub use api::{ApiClient, ApiError, ApiRequest, Method, Payload, RetryPolicy};
pub use auth::{AuthState, FileStorage, MemoryStorage, SessionStorage, SessionStore};
pub use config::Config;
