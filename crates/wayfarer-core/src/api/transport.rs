//! The network seam of the request pipeline.
//!
//! `ApiClient` never talks to reqwest directly; it hands a fully resolved
//! `HttpRequest` to a `Transport`. The production transport wraps a pooled
//! `reqwest::Client`; tests drive the pipeline with a scripted transport.

use async_trait::async_trait;
use reqwest::{header, multipart, Client};
use tracing::debug;

use super::request::{Body, FormPart, Method};
use super::ApiError;

/// A request with URL and headers already resolved.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Body>,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one HTTP exchange. Any status code is a successful exchange;
    /// only failures to get a response at all are errors.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;
}

/// Transport backed by reqwest.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone, Default)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, ApiError> {
        // Timeouts are enforced per call by ApiClient.
        let client = Client::builder().build()?;
        Ok(Self { client })
    }

    fn build_form(parts: Vec<FormPart>) -> Result<multipart::Form, ApiError> {
        let mut form = multipart::Form::new();
        for part in parts {
            let mut p = multipart::Part::bytes(part.data);
            if let Some(file_name) = part.file_name {
                p = p.file_name(file_name);
            }
            if let Some(content_type) = part.content_type {
                p = p
                    .mime_str(&content_type)
                    .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
            }
            form = form.part(part.name, p);
        }
        Ok(form)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder = match request.body {
            None => builder,
            Some(Body::Json(value)) => builder.body(value.to_string()),
            Some(Body::Bytes { content_type, data }) => {
                let builder = match content_type {
                    Some(ct) => builder.header(header::CONTENT_TYPE, ct),
                    None => builder,
                };
                builder.body(data)
            }
            Some(Body::Multipart(parts)) => builder.multipart(Self::build_form(parts)?),
        };

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        debug!(url = %request.url, status, bytes = body.len(), "Response received");

        Ok(HttpResponse { status, body })
    }
}
