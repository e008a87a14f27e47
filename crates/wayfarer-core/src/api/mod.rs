//! REST API client module for the attractions / social backend.
//!
//! This module provides the `ApiClient` and the request pipeline it runs
//! every call through:
//!
//! - `RetryPolicy`: bounded retries for transient failures
//! - `DeduplicationGuard`: rejects a call while an identical one is in flight
//! - `Transport`: the network seam (reqwest in production)
//! - `Payload`: parsed, envelope-unwrapped response bodies
//!
//! Endpoints are grouped per backend service (`users()`, `attractions()`,
//! `social()`).

pub mod client;
pub mod dedup;
pub mod endpoints;
pub mod error;
pub mod request;
pub mod response;
pub mod retry;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{ApiClient, ApiClientBuilder, SessionExpiredHook};
pub use dedup::DeduplicationGuard;
pub use endpoints::{AttractionApi, SocialApi, UserApi};
pub use error::ApiError;
pub use request::{ApiRequest, Body, FormPart, Method};
pub use response::Payload;
pub use retry::{RetryPolicy, MAX_RETRIES};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
