//! Scripted transport for exercising the request pipeline without a server.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Notify;

use super::request::Method;
use super::transport::{HttpRequest, HttpResponse, Transport};
use super::{ApiClient, ApiError};
use crate::auth::SessionStorage;

pub(crate) const TEST_BASE_URL: &str = "http://test";

#[derive(Clone)]
pub(crate) enum Reply {
    Respond(u16, String),
    /// Respond once the gate is notified.
    Gated(Arc<Notify>, u16, String),
    NetworkError,
    /// Never answer.
    Hang,
}

impl Reply {
    pub(crate) fn json(status: u16, body: Value) -> Self {
        Reply::Respond(status, body.to_string())
    }

    pub(crate) fn text(status: u16, body: &str) -> Self {
        Reply::Respond(status, body.to_string())
    }
}

/// Replies are queued per method and path (query string ignored). The last
/// queued reply for a route repeats forever; unknown routes answer 404.
#[derive(Default)]
pub(crate) struct MockTransport {
    replies: Mutex<HashMap<(Method, String), VecDeque<Reply>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn on(&self, method: Method, path: &str, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(reply);
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, method: Method, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method && path_of(&r.url) == path)
            .count()
    }

    fn next_reply(&self, method: Method, path: &str) -> Option<Reply> {
        let mut replies = self.replies.lock().unwrap();
        let queue = replies.get_mut(&(method, path.to_string()))?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

fn path_of(url: &str) -> &str {
    let path = url.strip_prefix(TEST_BASE_URL).unwrap_or(url);
    path.split_once('?').map(|(p, _)| p).unwrap_or(path)
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        self.requests.lock().unwrap().push(request.clone());
        let reply = self.next_reply(request.method, path_of(&request.url));

        match reply {
            None => Ok(HttpResponse::new(404, "")),
            Some(Reply::Respond(status, body)) => Ok(HttpResponse::new(status, body)),
            Some(Reply::Gated(gate, status, body)) => {
                gate.notified().await;
                Ok(HttpResponse::new(status, body))
            }
            Some(Reply::NetworkError) => Err(ApiError::Network("connection refused".to_string())),
            Some(Reply::Hang) => futures::future::pending().await,
        }
    }
}

pub(crate) fn test_client(transport: &Arc<MockTransport>, storage: Arc<dyn SessionStorage>) -> ApiClient {
    ApiClient::builder(TEST_BASE_URL)
        .transport(transport.clone())
        .storage(storage)
        .build()
        .unwrap()
}
