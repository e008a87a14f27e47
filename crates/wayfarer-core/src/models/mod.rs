//! Data models for backend entities.
//!
//! This module contains the data structures exchanged with the backend:
//!
//! - `UserInfo`, `UserProfile`, `UserRole`, `Credentials`: accounts
//! - `Attraction`, `AttractionReview`, `Popularity`: attraction browsing
//! - `Blog`, `Comment`, `ChatMessage`, `AttractionTag`: social features
//! - `Page<T>`, `Count`: shared response shapes
//!
//! The backend is loose about types (ids arrive as numbers or strings,
//! timestamps with or without a zone), so most fields are optional and
//! anything unrecognised is kept in an `extra` map.

pub mod attraction;
pub mod social;
pub mod user;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub use attraction::{
    Attraction, AttractionReview, FavoriteToggle, NewReview, PageQuery, Popularity, SearchQuery,
};
pub use social::{AttractionTag, Blog, ChatMessage, Comment, LikeRequest, NewComment, NewMessage};
pub use user::{Credentials, Registration, UserInfo, UserProfile, UserRole};

/// A Spring-style page of results.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub content: Vec<T>,
    #[serde(default)]
    pub total_elements: u64,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub number: u32,
    #[serde(default)]
    pub size: u32,
    #[serde(default)]
    pub last: bool,
}

/// Endpoints that answer with either a bare array or a page of results.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Listing<T> {
    List(Vec<T>),
    Page(Page<T>),
}

impl<T> Listing<T> {
    pub fn into_items(self) -> Vec<T> {
        match self {
            Listing::List(items) => items,
            Listing::Page(page) => page.content,
        }
    }
}

/// A counter. Accepts a bare number, a numeric string, or `{"count": n}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Count(pub u64);

impl<'de> Deserialize<'de> for Count {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        count_from_value(&value)
            .map(Count)
            .ok_or_else(|| serde::de::Error::custom(format!("expected a count, got {}", value)))
    }
}

fn count_from_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Object(map) => map.get("count").and_then(count_from_value),
        _ => None,
    }
}

/// Ids arrive as numbers or strings; normalise to a string.
pub(crate) fn flexible_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(id_from_value))
}

pub(crate) fn id_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Lenient timestamp field: unparseable values become `None`.
pub(crate) fn timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => parse_timestamp(&s),
        Some(Value::Number(n)) => n.as_i64().and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    })
}

/// RFC 3339, zone-less `LocalDateTime` (read as UTC), or a bare date.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use serde_json::json;

    #[test]
    fn test_count_shapes() {
        assert_eq!(serde_json::from_value::<Count>(json!(4)).unwrap(), Count(4));
        assert_eq!(serde_json::from_value::<Count>(json!("12")).unwrap(), Count(12));
        assert_eq!(serde_json::from_value::<Count>(json!({"count": 3})).unwrap(), Count(3));
        assert!(serde_json::from_value::<Count>(json!([1])).is_err());
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let dt = parse_timestamp("2024-05-01T10:30:00Z").unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day(), dt.hour()), (2024, 5, 1, 10));

        let dt = parse_timestamp("2024-05-01T10:30:00.123").unwrap();
        assert_eq!(dt.minute(), 30);

        let dt = parse_timestamp("2024-05-01 08:00:00").unwrap();
        assert_eq!(dt.hour(), 8);

        let dt = parse_timestamp("2024-05-01").unwrap();
        assert_eq!(dt.hour(), 0);

        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_page_defaults() {
        let page: Page<u32> = serde_json::from_value(json!({"content": [1, 2], "totalElements": 2})).unwrap();
        assert_eq!(page.content, vec![1, 2]);
        assert_eq!(page.total_elements, 2);
        assert_eq!(page.total_pages, 0);
    }

    #[test]
    fn test_listing_accepts_array_or_page() {
        let list: Listing<u32> = serde_json::from_value(json!([1, 2, 3])).unwrap();
        assert_eq!(list.into_items(), vec![1, 2, 3]);

        let page: Listing<u32> = serde_json::from_value(json!({"content": [4], "number": 0})).unwrap();
        assert_eq!(page.into_items(), vec![4]);
    }

    #[test]
    fn test_id_from_value() {
        assert_eq!(id_from_value(&json!(7)).as_deref(), Some("7"));
        assert_eq!(id_from_value(&json!("abc")).as_deref(), Some("abc"));
        assert_eq!(id_from_value(&json!("")), None);
        assert_eq!(id_from_value(&json!(null)), None);
    }
}
