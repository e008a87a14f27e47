//! Attraction browsing models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{flexible_id, timestamp};

/// Default page size for attraction listings.
pub const DEFAULT_PAGE_SIZE: u32 = 12;

/// Default listing order: most viewed first.
pub const DEFAULT_SORT: &str = "viewCount,desc";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attraction {
    #[serde(default, deserialize_with = "flexible_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub view_count: Option<u64>,
    #[serde(default, deserialize_with = "timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttractionReview {
    #[serde(default, deserialize_with = "flexible_id")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "flexible_id")]
    pub attraction_id: Option<String>,
    #[serde(default, deserialize_with = "flexible_id")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReview {
    pub attraction_id: String,
    pub user_id: String,
    pub rating: f64,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Popularity {
    #[serde(default, deserialize_with = "flexible_id")]
    pub attraction_id: Option<String>,
    #[serde(default)]
    pub view_count: Option<u64>,
    #[serde(default)]
    pub favorite_count: Option<u64>,
    #[serde(default)]
    pub review_count: Option<u64>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteToggle {
    pub attraction_id: String,
    pub user_id: String,
}

/// Paging for attraction lists. Unset fields fall back to the listing
/// defaults (page 0, 12 per page, most viewed first).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub sort: Option<String>,
    pub filter: Option<String>,
}

impl PageQuery {
    pub fn page(page: u32) -> Self {
        Self {
            page: Some(page),
            ..Self::default()
        }
    }

    /// Fill unset paging fields with the listing defaults.
    pub fn with_defaults(&self) -> Self {
        Self {
            page: Some(self.page.unwrap_or(0)),
            size: Some(self.size.unwrap_or(DEFAULT_PAGE_SIZE)),
            sort: Some(self.sort.clone().unwrap_or_else(|| DEFAULT_SORT.to_string())),
            filter: self.filter.clone(),
        }
    }

    /// Only `page`, `size`, `sort` and `filter` are ever sent.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(page) = self.page {
            params.push(("page", page.to_string()));
        }
        if let Some(size) = self.size {
            params.push(("size", size.to_string()));
        }
        if let Some(ref sort) = self.sort {
            params.push(("sort", sort.clone()));
        }
        if let Some(ref filter) = self.filter {
            params.push(("filter", filter.clone()));
        }
        params
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    pub keyword: Option<String>,
    pub kind: Option<String>,
    pub region: Option<String>,
}

impl SearchQuery {
    pub fn keyword(keyword: impl Into<String>) -> Self {
        Self {
            keyword: Some(keyword.into()),
            ..Self::default()
        }
    }

    /// All three parameters are always sent; missing ones as empty strings.
    pub fn params(&self) -> [(&'static str, String); 3] {
        [
            ("keyword", self.keyword.clone().unwrap_or_default()),
            ("type", self.kind.clone().unwrap_or_default()),
            ("region", self.region.clone().unwrap_or_default()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_attraction_timestamps_parsed() {
        let attraction: Attraction = serde_json::from_value(json!({
            "id": 3,
            "name": "West Lake",
            "type": "lake",
            "viewCount": 120,
            "createdAt": "2023-07-01T09:00:00",
            "updatedAt": "not a date"
        }))
        .unwrap();
        assert_eq!(attraction.id.as_deref(), Some("3"));
        assert_eq!(attraction.kind.as_deref(), Some("lake"));
        assert_eq!(attraction.view_count, Some(120));
        assert!(attraction.created_at.is_some());
        assert!(attraction.updated_at.is_none());
    }

    #[test]
    fn test_page_query_only_sends_set_fields() {
        let query = PageQuery {
            page: Some(2),
            filter: Some("region:east".to_string()),
            ..PageQuery::default()
        };
        assert_eq!(
            query.params(),
            vec![("page", "2".to_string()), ("filter", "region:east".to_string())]
        );
    }

    #[test]
    fn test_search_query_fills_blanks() {
        let params = SearchQuery::keyword("lake").params();
        assert_eq!(params[0], ("keyword", "lake".to_string()));
        assert_eq!(params[1], ("type", String::new()));
        assert_eq!(params[2], ("region", String::new()));
    }
}
