//! In-flight request de-duplication.
//!
//! Every call registers its key before touching the network. A second call
//! with the same key is rejected immediately instead of queued. The
//! registration is released when the `PendingRequest` handle is dropped, so
//! success, failure, timeout and a dropped future all free the key.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::{AbortHandle, AbortRegistration, Abortable};
use tracing::debug;

use super::ApiError;

#[derive(Debug, Default)]
pub struct DeduplicationGuard {
    pending: Mutex<HashMap<String, AbortHandle>>,
}

impl DeduplicationGuard {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, AbortHandle>> {
        // A panic while holding the lock cannot leave the map inconsistent.
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Claim `key` for one call, or fail with `DuplicateRequest` if a call
    /// with the same key is still in flight.
    pub fn register(self: &Arc<Self>, key: String) -> Result<PendingRequest, ApiError> {
        let mut pending = self.lock();
        if pending.contains_key(&key) {
            debug!(key = %key, "Rejecting duplicate in-flight request");
            return Err(ApiError::DuplicateRequest(key));
        }
        let (handle, registration) = AbortHandle::new_pair();
        pending.insert(key.clone(), handle);
        Ok(PendingRequest {
            guard: Arc::clone(self),
            key,
            registration: Some(registration),
        })
    }

    pub fn is_pending(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Abort the in-flight call registered under `key`. Returns whether one
    /// was found. The aborted caller sees `ApiError::Cancelled`.
    pub fn cancel(&self, key: &str) -> bool {
        match self.lock().get(key) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Abort every in-flight call. Returns how many were signalled.
    pub fn cancel_all(&self) -> usize {
        let pending = self.lock();
        for handle in pending.values() {
            handle.abort();
        }
        pending.len()
    }

    fn release(&self, key: &str) {
        self.lock().remove(key);
    }
}

/// Registration for one in-flight call. Dropping it frees the key.
pub struct PendingRequest {
    guard: Arc<DeduplicationGuard>,
    key: String,
    registration: Option<AbortRegistration>,
}

impl PendingRequest {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Drive `fut` to completion unless the call is cancelled through the
    /// guard first. The key is released once this returns.
    pub async fn run<F: Future>(mut self, fut: F) -> Result<F::Output, ApiError> {
        match self.registration.take() {
            Some(registration) => Abortable::new(fut, registration)
                .await
                .map_err(|_| ApiError::Cancelled),
            None => Ok(fut.await),
        }
    }
}

impl Drop for PendingRequest {
    fn drop(&mut self) {
        self.guard.release(&self.key);
    }
}
