//! Login state for the running client.
//!
//! `SessionStore` owns the in-memory session (token, cached user info,
//! initialisation flag) and keeps the durable record (`token`, `userId`) in
//! step with it through the client's `SessionStorage`. Every transition reads
//! and writes the durable record without awaiting in between.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError};
use crate::models::{id_from_value, Attraction, AttractionReview, Credentials, Registration, UserInfo};

use super::storage::{TOKEN_KEY, USER_ID_KEY};

/// Login response fields that may carry the token, in lookup order.
pub const TOKEN_FIELDS: [&str; 3] = ["token", "accessToken", "access_token"];

/// Login response fields that may carry the user id, in lookup order.
/// `user.id` is tried after these.
pub const USER_ID_FIELDS: [&str; 3] = ["userId", "user_id", "id"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AuthState {
    /// No token.
    Anonymous,
    /// A stored session is being validated at startup.
    Restoring,
    /// Token accepted; user info may still be missing.
    Authenticated,
    /// We hold a token the backend has since rejected.
    Expired,
}

/// Presence flags for the in-memory and durable session, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthSnapshot {
    pub state: AuthState,
    pub has_token: bool,
    pub has_user_info: bool,
    pub stored_token: bool,
    pub stored_user_id: Option<String>,
    pub logged_in: bool,
    pub initialized: bool,
}

/// First non-empty string under any of `TOKEN_FIELDS`.
pub fn extract_token(response: &Value) -> Option<String> {
    TOKEN_FIELDS.iter().find_map(|field| {
        response
            .get(field)
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    })
}

/// First usable id under any of `USER_ID_FIELDS`, then `user.id`. Numbers are
/// accepted and stored in their decimal form.
pub fn extract_user_id(response: &Value) -> Option<String> {
    USER_ID_FIELDS
        .iter()
        .find_map(|field| response.get(field).and_then(id_from_value))
        .or_else(|| {
            response
                .get("user")
                .and_then(|user| user.get("id"))
                .and_then(id_from_value)
        })
}

pub struct SessionStore {
    client: ApiClient,
    token: Option<String>,
    user_info: Option<UserInfo>,
    initialized: bool,
    state: AuthState,
}

impl SessionStore {
    /// Empty session; call [`initialize_auth`](Self::initialize_auth) to
    /// restore a persisted one.
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            token: None,
            user_info: None,
            initialized: false,
            state: AuthState::Anonymous,
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Current state. A token the backend rejected on some other call (the
    /// client wiped the durable record) reads as `Expired` until the next
    /// transition.
    pub fn state(&self) -> AuthState {
        if self.state == AuthState::Authenticated && self.client.storage().get(TOKEN_KEY).is_none() {
            AuthState::Expired
        } else {
            self.state
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn user_info(&self) -> Option<&UserInfo> {
        self.user_info.as_ref()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// A token is present; user info may still be loading.
    pub fn is_logged_in(&self) -> bool {
        self.token.is_some()
    }

    /// Token and user info are both present.
    pub fn is_fully_logged_in(&self) -> bool {
        self.token.is_some() && self.user_info.is_some()
    }

    /// Id from the cached user info, falling back to the stored id.
    pub fn user_id(&self) -> Option<String> {
        self.user_info
            .as_ref()
            .and_then(|info| info.id.clone())
            .or_else(|| self.client.storage().get(USER_ID_KEY))
    }

    pub fn debug_state(&self) -> AuthSnapshot {
        let storage = self.client.storage();
        let snapshot = AuthSnapshot {
            state: self.state(),
            has_token: self.token.is_some(),
            has_user_info: self.user_info.is_some(),
            stored_token: storage.get(TOKEN_KEY).is_some(),
            stored_user_id: storage.get(USER_ID_KEY),
            logged_in: self.is_logged_in(),
            initialized: self.initialized,
        };
        debug!(?snapshot, "Auth state");
        snapshot
    }

    // ===== Lifecycle =====

    /// Restore a persisted session at startup. Runs once; later calls are
    /// no-ops until `logout` resets the flag.
    pub async fn initialize_auth(&mut self) -> AuthState {
        if self.initialized {
            debug!("Auth already initialized");
            return self.state();
        }

        let storage = self.client.storage();
        let token = storage.get(TOKEN_KEY);
        let user_id = storage.get(USER_ID_KEY);

        if let (Some(token), Some(_)) = (token, user_id) {
            self.token = Some(token);
            self.state = AuthState::Restoring;
            match self.fetch_user_info().await {
                Ok(info) => info!(user = %info.display_name(), "Session restored"),
                Err(e) => {
                    warn!(error = %e, "Stored session is invalid, clearing it");
                    self.logout();
                }
            }
        }

        self.initialized = true;
        self.state()
    }

    /// Authenticate and persist the session. Returns the raw login response.
    ///
    /// Failing to load user info afterwards does not undo the login.
    pub async fn login(&mut self, credentials: &Credentials) -> Result<Value, ApiError> {
        info!(identifier = %credentials.identifier, "Logging in");

        let result = self.client.users().login(credentials).await;
        let response = match result {
            Ok(response) => response,
            Err(e) => return Err(self.settle(e)),
        };

        let token = extract_token(&response).ok_or(ApiError::MalformedLoginResponse("token"))?;
        let user_id = extract_user_id(&response).ok_or(ApiError::MalformedLoginResponse("user id"))?;

        self.persist(&token, &user_id)?;
        self.token = Some(token);
        self.user_info = None;
        self.state = AuthState::Authenticated;

        if let Err(e) = self.fetch_user_info().await {
            warn!(error = %e, "Logged in, but failed to load user info");
        }

        info!(user_id = %user_id, "Login succeeded");
        Ok(response)
    }

    /// Write token and user id. On a partial failure the previous token is
    /// put back so the durable record never pairs the new token with an old
    /// user id.
    fn persist(&self, token: &str, user_id: &str) -> Result<(), ApiError> {
        let storage = self.client.storage();
        let previous_token = storage.get(TOKEN_KEY);

        storage
            .set(TOKEN_KEY, token)
            .map_err(|e| ApiError::StorageWriteFailure(e.to_string()))?;

        if let Err(e) = storage.set(USER_ID_KEY, user_id) {
            let restored = match previous_token {
                Some(ref previous) => storage.set(TOKEN_KEY, previous),
                None => storage.remove(TOKEN_KEY),
            };
            if let Err(restore_err) = restored {
                warn!(error = %restore_err, "Failed to roll back stored token");
            }
            return Err(ApiError::StorageWriteFailure(e.to_string()));
        }
        Ok(())
    }

    /// Load user info for the stored user id. An authentication failure
    /// logs the session out before the error is returned.
    pub async fn fetch_user_info(&mut self) -> Result<UserInfo, ApiError> {
        if self.token.is_none() {
            debug!("No token, cannot fetch user info");
            return Err(ApiError::NotAuthenticated);
        }
        let user_id = self
            .client
            .storage()
            .get(USER_ID_KEY)
            .ok_or(ApiError::NotAuthenticated)?;

        let result = self.client.users().get_user_info(&user_id).await;
        match result {
            Ok(info) => {
                debug!(user = %info.display_name(), "User info loaded");
                self.user_info = Some(info.clone());
                self.state = AuthState::Authenticated;
                Ok(info)
            }
            Err(e) => {
                if e.is_auth_error() {
                    warn!("Token rejected while loading user info, logging out");
                    self.state = AuthState::Expired;
                    self.logout();
                }
                Err(e)
            }
        }
    }

    /// Clear the session in memory and in durable storage. Never fails;
    /// storage errors are logged.
    pub fn logout(&mut self) {
        info!("Logging out");
        self.token = None;
        self.user_info = None;
        self.initialized = false;
        self.state = AuthState::Anonymous;
        if let Err(e) = self.client.storage().clear() {
            warn!(error = %e, "Failed to clear stored session");
        }
    }

    /// Whether the backend still accepts the current token.
    pub async fn validate_token(&self) -> bool {
        if self.token.is_none() {
            return false;
        }
        let Some(user_id) = self.client.storage().get(USER_ID_KEY) else {
            return false;
        };
        match self.client.users().get_user_info(&user_id).await {
            Ok(_) => true,
            Err(e) => {
                debug!(error = %e, "Token validation failed");
                false
            }
        }
    }

    /// Re-check the session against the backend. Returns whether the user is
    /// still authenticated; any failure logs out.
    pub async fn refresh(&mut self) -> bool {
        if self.token.is_none() {
            return false;
        }

        if !self.validate_token().await {
            self.logout();
            return false;
        }

        if self.user_info.is_none() && self.fetch_user_info().await.is_err() {
            self.logout();
            return false;
        }

        true
    }

    /// Keep memory in step when the client reports an expired session.
    fn settle(&mut self, err: ApiError) -> ApiError {
        if matches!(err, ApiError::SessionExpired) && self.token.is_some() {
            self.logout();
        }
        err
    }

    fn require_user_id(&self) -> Result<String, ApiError> {
        if !self.is_logged_in() {
            return Err(ApiError::NotAuthenticated);
        }
        self.user_id().ok_or(ApiError::NotAuthenticated)
    }

    // ===== Account actions =====

    /// Create an account. Does not log in.
    pub async fn register(&mut self, registration: &Registration) -> Result<Value, ApiError> {
        self.client.users().register(registration).await
    }

    /// Update the user and replace the cached user info with the result.
    pub async fn update_user(&mut self, user_id: &str, data: &Value) -> Result<UserInfo, ApiError> {
        if !self.is_logged_in() || user_id.is_empty() {
            return Err(ApiError::NotAuthenticated);
        }
        let result = self.client.users().update_user(user_id, data).await;
        match result {
            Ok(updated) => {
                self.user_info = Some(updated.clone());
                Ok(updated)
            }
            Err(e) => Err(self.settle(e)),
        }
    }

    pub async fn add_favorite(&mut self, attraction_id: &str) -> Result<Value, ApiError> {
        let user_id = self.require_user_id()?;
        let result = self.client.users().add_favorite(&user_id, attraction_id).await;
        result.map_err(|e| self.settle(e))
    }

    pub async fn remove_favorite(&mut self, attraction_id: &str) -> Result<Value, ApiError> {
        let user_id = self.require_user_id()?;
        let result = self.client.users().remove_favorite(&user_id, attraction_id).await;
        result.map_err(|e| self.settle(e))
    }

    /// The user's favorite attractions; empty when not logged in.
    pub async fn favorites(&mut self) -> Result<Vec<Attraction>, ApiError> {
        let Ok(user_id) = self.require_user_id() else {
            return Ok(Vec::new());
        };
        let result = self.client.users().get_user_favorites(&user_id).await;
        result.map_err(|e| self.settle(e))
    }

    /// The user's reviews; empty when not logged in.
    pub async fn reviews(&mut self) -> Result<Vec<AttractionReview>, ApiError> {
        let Ok(user_id) = self.require_user_id() else {
            return Ok(Vec::new());
        };
        let result = self.client.users().get_user_reviews(&user_id).await;
        result.map_err(|e| self.settle(e))
    }
}
