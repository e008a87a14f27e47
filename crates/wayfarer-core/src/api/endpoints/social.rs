use serde::Serialize;
use serde_json::Value;

use crate::api::{ApiClient, ApiError, ApiRequest};
use crate::models::{
    AttractionTag, Blog, ChatMessage, Comment, Count, LikeRequest, Listing, NewComment, NewMessage,
};

/// Path prefix of the social service.
const SOCIAL_API: &str = "/social/api";

/// Default page size for blog listings.
pub const DEFAULT_BLOG_PAGE_SIZE: u32 = 9;

/// Default page size for comment listings.
pub const DEFAULT_COMMENT_PAGE_SIZE: u32 = 10;

/// Blogs, comments, likes, views, shares, tags and private messages.
#[derive(Clone, Copy)]
pub struct SocialApi<'a> {
    client: &'a ApiClient,
}

impl<'a> SocialApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    fn path(suffix: &str) -> String {
        format!("{}{}", SOCIAL_API, suffix)
    }

    /// Request carrying `blogId` and `userId` as query parameters.
    fn blog_user_request(req: ApiRequest, blog_id: &str, user_id: &str) -> ApiRequest {
        req.query("blogId", blog_id).query("userId", user_id)
    }

    // ===== Blogs =====

    /// `sort` is `latest` unless the caller wants another order.
    pub async fn get_blogs(&self, page: u32, size: u32, sort: &str) -> Result<Vec<Blog>, ApiError> {
        let req = ApiRequest::get(Self::path("/blogs"))
            .query("page", page)
            .query("size", size)
            .query("sort", sort);
        let listing: Listing<Blog> = self.client.request(&req).await?;
        Ok(listing.into_items())
    }

    pub async fn get_blog_ranking(&self, sort_by: &str, time_range: &str, page: u32) -> Result<Vec<Blog>, ApiError> {
        let req = ApiRequest::get(Self::path("/blogs/ranking"))
            .query("sortBy", sort_by)
            .query("timeRange", time_range)
            .query("page", page);
        let listing: Listing<Blog> = self.client.request(&req).await?;
        Ok(listing.into_items())
    }

    pub async fn get_blog_detail(&self, id: &str) -> Result<Blog, ApiError> {
        self.client
            .request(&ApiRequest::get(Self::path(&format!("/blogs/{}", id))))
            .await
    }

    pub async fn search_blogs(&self, keyword: &str, search_type: &str, page: u32) -> Result<Vec<Blog>, ApiError> {
        let req = ApiRequest::get(Self::path("/blogs/search"))
            .query("page", page)
            .query("keyword", keyword)
            .query("searchType", search_type);
        let listing: Listing<Blog> = self.client.request(&req).await?;
        Ok(listing.into_items())
    }

    pub async fn update_blog<B: Serialize + ?Sized>(&self, id: &str, data: &B) -> Result<Blog, ApiError> {
        let req = ApiRequest::put(Self::path(&format!("/blogs/{}", id))).json(data)?;
        self.client.request(&req).await
    }

    pub async fn get_user_blogs(&self, user_id: &str) -> Result<Vec<Blog>, ApiError> {
        self.client
            .request(&ApiRequest::get(Self::path(&format!("/blogs/user/{}", user_id))))
            .await
    }

    pub async fn get_blogs_by_ids(&self, blog_ids: &[String]) -> Result<Vec<Blog>, ApiError> {
        let req = ApiRequest::post(Self::path("/blogs/batch")).json(blog_ids)?;
        self.client.request(&req).await
    }

    // ===== Views, shares, tags =====

    pub async fn view_blog(&self, blog_id: &str, user_id: &str) -> Result<Value, ApiError> {
        let req = Self::blog_user_request(ApiRequest::post(Self::path("/views")), blog_id, user_id);
        self.client.request(&req).await
    }

    pub async fn get_view_count(&self, blog_id: &str) -> Result<Count, ApiError> {
        let req = ApiRequest::get(Self::path("/views/count")).query("blogId", blog_id);
        self.client.request(&req).await
    }

    pub async fn share_blog(&self, blog_id: &str, user_id: &str) -> Result<Value, ApiError> {
        let req = Self::blog_user_request(ApiRequest::post(Self::path("/shares")), blog_id, user_id);
        self.client.request(&req).await
    }

    pub async fn get_share_count(&self, blog_id: &str) -> Result<Count, ApiError> {
        let req = ApiRequest::get(Self::path("/shares/count")).query("blogId", blog_id);
        self.client.request(&req).await
    }

    pub async fn get_attraction_tags(&self, attraction_id: &str) -> Result<Vec<AttractionTag>, ApiError> {
        self.client
            .request(&ApiRequest::get(Self::path(&format!("/attraction-tags/{}", attraction_id))))
            .await
    }

    // ===== Comments =====

    /// The author is identified by the `userId` header.
    pub async fn add_comment(&self, user_id: &str, comment: &NewComment) -> Result<Comment, ApiError> {
        let req = ApiRequest::post(Self::path("/comments"))
            .header("userId", user_id)
            .json(comment)?;
        self.client.request(&req).await
    }

    /// Comments for a blog. A page object yields its `content`; a bare array
    /// is returned as is; anything else is treated as no comments.
    pub async fn get_comments_by_blog_id(&self, blog_id: &str, page: u32, size: u32) -> Result<Vec<Comment>, ApiError> {
        let req = ApiRequest::get(Self::path(&format!("/comments/blog/{}", blog_id)))
            .query("page", page)
            .query("size", size);
        let value = self.client.send(&req).await?.into_json();

        let items = match value {
            Value::Object(mut map) => match map.remove("content") {
                Some(content @ Value::Array(_)) => content,
                _ => return Ok(Vec::new()),
            },
            array @ Value::Array(_) => array,
            _ => return Ok(Vec::new()),
        };
        serde_json::from_value(items).map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }

    pub async fn delete_comment(&self, comment_id: &str, user_id: &str) -> Result<Value, ApiError> {
        let req = ApiRequest::delete(Self::path(&format!("/comments/{}", comment_id))).header("userId", user_id);
        self.client.request(&req).await
    }

    pub async fn get_comment_count(&self, blog_id: &str) -> Result<Count, ApiError> {
        self.client
            .request(&ApiRequest::get(Self::path(&format!("/comments/blog/{}/count", blog_id))))
            .await
    }

    // ===== Likes =====

    pub async fn like_blog(&self, blog_id: &str, user_id: &str) -> Result<Value, ApiError> {
        let like = LikeRequest {
            blog_id: blog_id.to_string(),
            user_id: user_id.to_string(),
        };
        let req = ApiRequest::post(Self::path("/likes")).json(&like)?;
        self.client.request(&req).await
    }

    pub async fn unlike_blog(&self, blog_id: &str, user_id: &str) -> Result<Value, ApiError> {
        let req = Self::blog_user_request(ApiRequest::delete(Self::path("/likes")), blog_id, user_id);
        self.client.request(&req).await
    }

    pub async fn get_like_count(&self, blog_id: &str) -> Result<Count, ApiError> {
        let req = ApiRequest::get(Self::path("/likes/count")).query("blogId", blog_id);
        self.client.request(&req).await
    }

    pub async fn get_like_status(&self, blog_id: &str, user_id: &str) -> Result<Value, ApiError> {
        let req = Self::blog_user_request(ApiRequest::get(Self::path("/likes/status")), blog_id, user_id);
        self.client.request(&req).await
    }

    // ===== Messages =====

    pub async fn send_message(&self, message: &NewMessage) -> Result<ChatMessage, ApiError> {
        let req = ApiRequest::post(Self::path("/messages")).json(message)?;
        self.client.request(&req).await
    }

    pub async fn get_chat(&self, user_id: &str, target_user_id: &str) -> Result<Vec<ChatMessage>, ApiError> {
        let req = ApiRequest::get(Self::path("/messages/chat"))
            .query("userId", user_id)
            .query("targetUserId", target_user_id);
        self.client.request(&req).await
    }

    /// Conversation summaries for `user_id`; the shape is backend-defined.
    pub async fn get_chat_list(&self, user_id: &str) -> Result<Vec<Value>, ApiError> {
        self.client
            .request(&ApiRequest::get(Self::path(&format!("/messages/dialogs/{}", user_id))))
            .await
    }
}
