//! Authentication module for managing the login session.
//!
//! This module provides:
//! - `SessionStore`: the login state machine (anonymous, restoring,
//!   authenticated, expired)
//! - `SessionStorage`: durable storage for the `token` / `userId` record,
//!   backed by a JSON file or by memory
//!
//! A session survives restarts through the storage backend and is validated
//! against the backend on startup.

pub mod session;
pub mod storage;

pub use session::{extract_token, extract_user_id, AuthSnapshot, AuthState, SessionStore};
pub use storage::{FileStorage, MemoryStorage, SessionStorage, TOKEN_KEY, USER_ID_KEY};
