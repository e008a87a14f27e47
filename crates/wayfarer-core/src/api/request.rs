//! Request description shared by every endpoint.
//!
//! An `ApiRequest` is plain data: method, path relative to the base origin,
//! query parameters, body, extra headers and an optional timeout override.
//! It knows how to build its full URL and its de-duplication key; sending it
//! is the job of [`ApiClient`](super::ApiClient).

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use url::form_urlencoded;

use super::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One part of a multipart form upload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FormPart {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl FormPart {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file_name: None,
            content_type: None,
            data: value.into().into_bytes(),
        }
    }

    pub fn file(name: impl Into<String>, file_name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            file_name: Some(file_name.into()),
            content_type: None,
            data,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Json(Value),
    Bytes {
        content_type: Option<String>,
        data: Vec<u8>,
    },
    Multipart(Vec<FormPart>),
}

impl Body {
    /// Binary and multipart bodies must not carry the JSON content type.
    pub fn is_binary(&self) -> bool {
        !matches!(self, Body::Json(_))
    }

    /// Stable within a process; only used to tell concurrent requests apart.
    fn dedup_fragment(&self) -> String {
        match self {
            Body::Json(value) => value.to_string(),
            Body::Bytes { data, .. } => {
                let mut hasher = DefaultHasher::new();
                data.hash(&mut hasher);
                format!("bytes:{}:{:016x}", data.len(), hasher.finish())
            }
            Body::Multipart(parts) => {
                let mut hasher = DefaultHasher::new();
                parts.hash(&mut hasher);
                format!("multipart:{}:{:016x}", parts.len(), hasher.finish())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub params: Vec<(String, String)>,
    pub body: Option<Body>,
    pub headers: Vec<(String, String)>,
    pub timeout: Option<Duration>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            params: Vec::new(),
            body: None,
            headers: Vec::new(),
            timeout: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn body(mut self, body: Body) -> Self {
        self.body = Some(body);
        self
    }

    /// Serialize `body` as the JSON payload of this request.
    pub fn json<B: Serialize + ?Sized>(self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidRequest(format!("Failed to encode body: {}", e)))?;
        Ok(self.body(Body::Json(value)))
    }

    /// Base origin + path, with the query string appended after `?` or `&`
    /// depending on whether the path already has one.
    pub fn url(&self, base_url: &str) -> String {
        let mut url = format!("{}{}", base_url, self.path);
        if !self.params.is_empty() {
            let query = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(self.params.iter())
                .finish();
            url.push(if self.path.contains('?') { '&' } else { '?' });
            url.push_str(&query);
        }
        url
    }

    /// Deterministic identity of this logical request: method, path, query
    /// params sorted by name, and body. Two requests with equal keys are
    /// never in flight at the same time.
    pub fn dedup_key(&self) -> String {
        let mut params = self.params.clone();
        params.sort();
        let params = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(params.iter())
            .finish();
        let body = self
            .body
            .as_ref()
            .map(Body::dedup_fragment)
            .unwrap_or_else(|| "{}".to_string());
        format!("{}_{}_{}_{}", self.method, self.path, params, body)
    }
}
