use serde::Serialize;
use serde_json::Value;

use crate::api::{ApiClient, ApiError, ApiRequest};
use crate::models::{
    Attraction, AttractionReview, FavoriteToggle, Listing, NewReview, Page, PageQuery, Popularity,
    SearchQuery,
};

/// Path prefix of the attraction service.
const ATTRACTION_API: &str = "/attraction/api";

/// Attraction catalogue, favorites, reviews and popularity.
#[derive(Clone, Copy)]
pub struct AttractionApi<'a> {
    client: &'a ApiClient,
}

impl<'a> AttractionApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    fn path(suffix: &str) -> String {
        format!("{}{}", ATTRACTION_API, suffix)
    }

    // ===== Catalogue =====

    /// One page of attractions; unset paging fields use the listing defaults.
    pub async fn get_attractions(&self, query: &PageQuery) -> Result<Page<Attraction>, ApiError> {
        let mut req = ApiRequest::get(Self::path("/attractions/paged"));
        for (key, value) in query.with_defaults().params() {
            req = req.query(key, value);
        }
        self.client.request(&req).await
    }

    pub async fn get_attraction_detail(&self, id: &str) -> Result<Attraction, ApiError> {
        self.client
            .request(&ApiRequest::get(Self::path(&format!("/attractions/{}", id))))
            .await
    }

    pub async fn get_all_attractions(&self) -> Result<Vec<Attraction>, ApiError> {
        self.client.request(&ApiRequest::get(Self::path("/attractions"))).await
    }

    pub async fn create_attraction<B: Serialize + ?Sized>(&self, data: &B) -> Result<Attraction, ApiError> {
        let req = ApiRequest::post(Self::path("/attractions")).json(data)?;
        self.client.request(&req).await
    }

    pub async fn update_attraction<B: Serialize + ?Sized>(&self, id: &str, data: &B) -> Result<Attraction, ApiError> {
        let req = ApiRequest::put(Self::path(&format!("/attractions/{}", id))).json(data)?;
        self.client.request(&req).await
    }

    pub async fn delete_attraction(&self, id: &str) -> Result<Value, ApiError> {
        self.client
            .request(&ApiRequest::delete(Self::path(&format!("/attractions/{}", id))))
            .await
    }

    pub async fn search_attractions(&self, query: &SearchQuery) -> Result<Vec<Attraction>, ApiError> {
        let mut req = ApiRequest::get(Self::path("/attractions/search"));
        for (key, value) in query.params() {
            req = req.query(key, value);
        }
        let listing: Listing<Attraction> = self.client.request(&req).await?;
        Ok(listing.into_items())
    }

    pub async fn get_most_viewed_attractions(&self) -> Result<Vec<Attraction>, ApiError> {
        self.client
            .request(&ApiRequest::get(Self::path("/attractions/most-viewed")))
            .await
    }

    pub async fn get_top_rated_attractions(&self) -> Result<Vec<Attraction>, ApiError> {
        self.client
            .request(&ApiRequest::get(Self::path("/attractions/top-rated")))
            .await
    }

    pub async fn get_attractions_by_ids(&self, ids: &[String]) -> Result<Vec<Attraction>, ApiError> {
        let req = ApiRequest::post(Self::path("/attractions/batch")).json(ids)?;
        self.client.request(&req).await
    }

    // ===== Favorites =====

    pub async fn get_favorites(&self, user_id: &str) -> Result<Vec<Attraction>, ApiError> {
        self.client
            .request(&ApiRequest::get(Self::path(&format!("/attraction-favorites/user/{}", user_id))))
            .await
    }

    fn favorite_path(attraction_id: &str, user_id: &str) -> String {
        Self::path(&format!(
            "/attraction-favorites/attraction/{}/user/{}",
            attraction_id, user_id
        ))
    }

    pub async fn check_favorite(&self, attraction_id: &str, user_id: &str) -> Result<Value, ApiError> {
        self.client
            .request(&ApiRequest::get(Self::favorite_path(attraction_id, user_id)))
            .await
    }

    pub async fn add_favorite(&self, attraction_id: &str, user_id: &str) -> Result<Value, ApiError> {
        self.client
            .request(&ApiRequest::post(Self::favorite_path(attraction_id, user_id)))
            .await
    }

    pub async fn remove_favorite(&self, attraction_id: &str, user_id: &str) -> Result<Value, ApiError> {
        self.client
            .request(&ApiRequest::delete(Self::favorite_path(attraction_id, user_id)))
            .await
    }

    pub async fn toggle_favorite(&self, toggle: &FavoriteToggle) -> Result<Value, ApiError> {
        let req = ApiRequest::post(Self::path("/attraction-favorites")).json(toggle)?;
        self.client.request(&req).await
    }

    // ===== Reviews =====

    pub async fn get_reviews(&self, attraction_id: &str) -> Result<Vec<AttractionReview>, ApiError> {
        self.client
            .request(&ApiRequest::get(Self::path(&format!(
                "/attraction-reviews/attraction/{}",
                attraction_id
            ))))
            .await
    }

    pub async fn add_review(&self, review: &NewReview) -> Result<AttractionReview, ApiError> {
        let req = ApiRequest::post(Self::path("/attraction-reviews")).json(review)?;
        self.client.request(&req).await
    }

    // ===== Popularity =====

    pub async fn get_popularity(&self, attraction_id: &str) -> Result<Popularity, ApiError> {
        self.client
            .request(&ApiRequest::get(Self::path(&format!(
                "/attraction-popularity/{}",
                attraction_id
            ))))
            .await
    }

    pub async fn increment_view(&self, attraction_id: &str) -> Result<Value, ApiError> {
        self.client
            .request(&ApiRequest::post(Self::path(&format!(
                "/attraction-popularity/{}/view",
                attraction_id
            ))))
            .await
    }
}
