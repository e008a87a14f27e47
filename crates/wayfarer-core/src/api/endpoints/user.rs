use serde::Serialize;
use serde_json::Value;

use crate::api::{ApiClient, ApiError, ApiRequest};
use crate::models::{Attraction, AttractionReview, Credentials, Registration, UserInfo, UserProfile, UserRole};

/// Path prefix of the user service.
const USER_API: &str = "/user/api";

/// Accounts, profiles, roles and per-user favorites.
#[derive(Clone, Copy)]
pub struct UserApi<'a> {
    client: &'a ApiClient,
}

impl<'a> UserApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    // ===== Auth =====

    pub async fn register(&self, registration: &Registration) -> Result<Value, ApiError> {
        let req = ApiRequest::post(format!("{}/auth/register", USER_API)).json(registration)?;
        self.client.request(&req).await
    }

    /// Raw login response; the session store picks the token and user id out
    /// of it.
    pub async fn login(&self, credentials: &Credentials) -> Result<Value, ApiError> {
        let req = ApiRequest::post(format!("{}/auth/login", USER_API)).json(credentials)?;
        self.client.request(&req).await
    }

    // ===== Users =====

    pub async fn get_user_info(&self, id: &str) -> Result<UserInfo, ApiError> {
        self.client
            .request(&ApiRequest::get(format!("{}/users/{}", USER_API, id)))
            .await
    }

    pub async fn update_user<B: Serialize + ?Sized>(&self, id: &str, data: &B) -> Result<UserInfo, ApiError> {
        let req = ApiRequest::put(format!("{}/users/{}", USER_API, id)).json(data)?;
        self.client.request(&req).await
    }

    // ===== Profiles and roles =====

    pub async fn get_profile(&self, user_id: &str) -> Result<UserProfile, ApiError> {
        self.client
            .request(&ApiRequest::get(format!("{}/user-profiles/user/{}", USER_API, user_id)))
            .await
    }

    pub async fn update_profile<B: Serialize + ?Sized>(&self, id: &str, data: &B) -> Result<UserProfile, ApiError> {
        let req = ApiRequest::put(format!("{}/user-profiles/{}", USER_API, id)).json(data)?;
        self.client.request(&req).await
    }

    pub async fn get_user_roles(&self, user_id: &str) -> Result<Vec<UserRole>, ApiError> {
        self.client
            .request(&ApiRequest::get(format!("{}/user-roles/user/{}", USER_API, user_id)))
            .await
    }

    // ===== Favorites and reviews =====

    pub async fn add_favorite(&self, user_id: &str, attraction_id: &str) -> Result<Value, ApiError> {
        let path = format!("{}/users/{}/favorites/{}", USER_API, user_id, attraction_id);
        self.client.request(&ApiRequest::post(path)).await
    }

    pub async fn remove_favorite(&self, user_id: &str, attraction_id: &str) -> Result<Value, ApiError> {
        let path = format!("{}/users/{}/favorites/{}", USER_API, user_id, attraction_id);
        self.client.request(&ApiRequest::delete(path)).await
    }

    pub async fn get_user_favorites(&self, user_id: &str) -> Result<Vec<Attraction>, ApiError> {
        self.client
            .request(&ApiRequest::get(format!("{}/users/{}/favorites", USER_API, user_id)))
            .await
    }

    pub async fn get_user_reviews(&self, user_id: &str) -> Result<Vec<AttractionReview>, ApiError> {
        self.client
            .request(&ApiRequest::get(format!("{}/users/{}/reviews", USER_API, user_id)))
            .await
    }
}
