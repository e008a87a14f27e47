//! API client for the attractions / social backend.
//!
//! Every endpoint funnels through [`ApiClient::send`], which layers the
//! request pipeline: retry loop → de-duplication → header injection →
//! timeout → status classification → envelope unwrapping.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::auth::{MemoryStorage, SessionStorage, TOKEN_KEY};
use crate::config::Config;

use super::dedup::DeduplicationGuard;
use super::endpoints::{AttractionApi, SocialApi, UserApi};
use super::request::{ApiRequest, Body};
use super::response::Payload;
use super::retry::RetryPolicy;
use super::transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
use super::ApiError;

/// Header carrying the anti-forgery token.
pub const CSRF_HEADER: &str = "X-CSRF-Token";

/// Called with the login entry point after a 401 wiped the session.
pub type SessionExpiredHook = Arc<dyn Fn(&str) + Send + Sync>;

/// API client. Clone is cheap; clones share the transport, the session
/// storage and the set of in-flight requests.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    base_url: String,
    timeout: Duration,
    retry: RetryPolicy,
    csrf_token: Option<String>,
    login_path: String,
    transport: Arc<dyn Transport>,
    storage: Arc<dyn SessionStorage>,
    pending: Arc<DeduplicationGuard>,
    on_session_expired: Option<SessionExpiredHook>,
}

pub struct ApiClientBuilder {
    base_url: String,
    timeout: Duration,
    retry: RetryPolicy,
    csrf_token: Option<String>,
    login_path: String,
    transport: Option<Arc<dyn Transport>>,
    storage: Option<Arc<dyn SessionStorage>>,
    on_session_expired: Option<SessionExpiredHook>,
}

impl ApiClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn csrf_token(mut self, token: Option<String>) -> Self {
        self.csrf_token = token;
        self
    }

    pub fn login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = path.into();
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn storage(mut self, storage: Arc<dyn SessionStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn on_session_expired(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_session_expired = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> Result<ApiClient, ApiError> {
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new()?),
        };
        let storage: Arc<dyn SessionStorage> = match self.storage {
            Some(storage) => storage,
            None => Arc::new(MemoryStorage::new()),
        };

        Ok(ApiClient {
            inner: Arc::new(ClientInner {
                base_url: self.base_url,
                timeout: self.timeout,
                retry: self.retry,
                csrf_token: self.csrf_token,
                login_path: self.login_path,
                transport,
                storage,
                pending: Arc::new(DeduplicationGuard::new()),
                on_session_expired: self.on_session_expired,
            }),
        })
    }
}

impl ApiClient {
    /// Start building a client for `base_url` with default settings.
    pub fn builder(base_url: impl Into<String>) -> ApiClientBuilder {
        let defaults = Config::default();
        ApiClientBuilder {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: defaults.timeout(),
            retry: RetryPolicy::new(defaults.max_retries),
            csrf_token: None,
            login_path: defaults.login_path,
            transport: None,
            storage: None,
            on_session_expired: None,
        }
    }

    /// Builder preloaded with every setting from `config`.
    pub fn from_config(config: &Config) -> ApiClientBuilder {
        Self::builder(config.origin())
            .timeout(config.timeout())
            .retry(RetryPolicy::new(config.max_retries).with_backoff(config.retry_backoff()))
            .csrf_token(config.csrf_token.clone())
            .login_path(config.login_path.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn login_path(&self) -> &str {
        &self.inner.login_path
    }

    /// Durable session record shared with the session store.
    pub fn storage(&self) -> &Arc<dyn SessionStorage> {
        &self.inner.storage
    }

    pub fn pending(&self) -> &DeduplicationGuard {
        &self.inner.pending
    }

    /// Abort the in-flight call for `request`, if any.
    pub fn cancel(&self, request: &ApiRequest) -> bool {
        self.inner.pending.cancel(&request.dedup_key())
    }

    pub fn cancel_all(&self) -> usize {
        self.inner.pending.cancel_all()
    }

    // ===== Endpoint groups =====

    pub fn users(&self) -> UserApi<'_> {
        UserApi::new(self)
    }

    pub fn attractions(&self) -> AttractionApi<'_> {
        AttractionApi::new(self)
    }

    pub fn social(&self) -> SocialApi<'_> {
        SocialApi::new(self)
    }

    // ===== Request pipeline =====

    /// Send `request` and decode the unwrapped payload into `T`.
    pub async fn request<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T, ApiError> {
        self.send(request).await?.decode()
    }

    /// Send `request` with retries.
    pub async fn send(&self, request: &ApiRequest) -> Result<Payload, ApiError> {
        let result = self
            .inner
            .retry
            .run(|attempt| {
                if attempt > 0 {
                    debug!(path = %request.path, attempt, "Retrying request");
                }
                self.send_once(request)
            })
            .await;

        if let Err(ref e) = result {
            warn!(method = %request.method, path = %request.path, error = %e, "Request failed");
        }
        result
    }

    /// One attempt: no retries.
    pub async fn send_once(&self, request: &ApiRequest) -> Result<Payload, ApiError> {
        let pending = self.inner.pending.register(request.dedup_key())?;
        let timeout = request.timeout.unwrap_or(self.inner.timeout);

        let http = HttpRequest {
            method: request.method,
            url: request.url(&self.inner.base_url),
            headers: self.build_headers(request),
            body: request.body.clone(),
        };
        debug!(method = %http.method, url = %http.url, "Sending request");

        let exchange = tokio::time::timeout(timeout, self.inner.transport.send(http));
        let response = match pending.run(exchange).await? {
            Ok(result) => result?,
            Err(_) => return Err(ApiError::Timeout(timeout.as_millis() as u64)),
        };

        self.handle_response(response)
    }

    /// Defaults first, then caller headers replacing defaults with the same
    /// name (case-insensitive).
    fn build_headers(&self, request: &ApiRequest) -> Vec<(String, String)> {
        let mut headers: Vec<(String, String)> = Vec::new();

        let binary = request.body.as_ref().is_some_and(Body::is_binary);
        if !binary {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }
        if let Some(token) = self.inner.storage.get(TOKEN_KEY) {
            headers.push(("Authorization".to_string(), format!("Bearer {}", token)));
        }
        if let Some(ref csrf) = self.inner.csrf_token {
            headers.push((CSRF_HEADER.to_string(), csrf.clone()));
        }

        for (name, value) in &request.headers {
            match headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
                Some(existing) => existing.1 = value.clone(),
                None => headers.push((name.clone(), value.clone())),
            }
        }
        headers
    }

    fn handle_response(&self, response: HttpResponse) -> Result<Payload, ApiError> {
        match response.status {
            401 => {
                self.expire_session();
                return Err(ApiError::SessionExpired);
            }
            403 => return Err(ApiError::Forbidden),
            429 => return Err(ApiError::RateLimited),
            _ => {}
        }

        if !response.is_success() {
            return Err(ApiError::from_status(response.status, &response.text()));
        }

        Ok(Payload::from_body(&response.body))
    }

    /// Drop the persisted session and send the user to the login page.
    fn expire_session(&self) {
        warn!("Session rejected by backend, clearing stored session");
        if let Err(e) = self.inner.storage.clear() {
            warn!(error = %e, "Failed to clear stored session");
        }
        if let Some(ref hook) = self.inner.on_session_expired {
            hook(&self.inner.login_path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::request::{FormPart, Method};
    use crate::api::testing::{test_client, MockTransport, Reply};
    use crate::auth::USER_ID_KEY;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    #[tokio::test]
    async fn test_envelope_unwrapped_through_pipeline() {
        let transport = MockTransport::new();
        transport.on(Method::Get, "/user/api/users/1", Reply::json(200, json!({"data": {"id": 1, "name": "x"}})));
        transport.on(Method::Get, "/user/api/users/2", Reply::json(200, json!({"id": 2, "name": "y"})));
        let client = test_client(&transport, Arc::new(MemoryStorage::new()));

        let one: Value = client.request(&ApiRequest::get("/user/api/users/1")).await.unwrap();
        assert_eq!(one, json!({"id": 1, "name": "x"}));
        let two: Value = client.request(&ApiRequest::get("/user/api/users/2")).await.unwrap();
        assert_eq!(two, json!({"id": 2, "name": "y"}));
    }

    #[tokio::test]
    async fn test_default_headers_and_overrides() {
        let transport = MockTransport::new();
        transport.on(Method::Post, "/social/api/comments", Reply::json(200, json!({})));
        let storage = Arc::new(MemoryStorage::new());
        storage.set(TOKEN_KEY, "T").unwrap();
        let client = ApiClient::builder("http://test")
            .transport(transport.clone())
            .storage(storage)
            .csrf_token(Some("csrf-1".to_string()))
            .build()
            .unwrap();

        let req = ApiRequest::post("/social/api/comments")
            .header("userId", "7")
            .header("content-type", "application/json; charset=utf-8")
            .json(&json!({"content": "hi"}))
            .unwrap();
        client.send(&req).await.unwrap();

        let sent = &transport.requests()[0];
        assert_eq!(sent.header("Authorization"), Some("Bearer T"));
        assert_eq!(sent.header("X-CSRF-Token"), Some("csrf-1"));
        assert_eq!(sent.header("userId"), Some("7"));
        assert_eq!(sent.header("Content-Type"), Some("application/json; charset=utf-8"));
        assert_eq!(sent.headers.iter().filter(|(k, _)| k.eq_ignore_ascii_case("content-type")).count(), 1);
    }

    #[tokio::test]
    async fn test_multipart_suppresses_json_content_type() {
        let transport = MockTransport::new();
        transport.on(Method::Post, "/upload", Reply::text(200, "ok"));
        let client = test_client(&transport, Arc::new(MemoryStorage::new()));

        let image = FormPart::file("image", "a.png", vec![1, 2, 3]).with_content_type("image/png");
        let req = ApiRequest::post("/upload").body(Body::Multipart(vec![FormPart::text("blogId", "1"), image]));
        let payload = client.send(&req).await.unwrap();

        assert_eq!(payload, Payload::Raw("ok".to_string()));
        let sent = &transport.requests()[0];
        assert_eq!(sent.header("Content-Type"), None);
        assert_eq!(sent.header("Authorization"), None);
        match sent.body {
            Some(Body::Multipart(ref parts)) => {
                assert_eq!(parts[1].content_type.as_deref(), Some("image/png"));
                assert_eq!(parts[1].file_name.as_deref(), Some("a.png"));
            }
            ref other => panic!("unexpected body: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_query_params_reach_transport() {
        let transport = MockTransport::new();
        transport.on(Method::Get, "/social/api/likes/count", Reply::json(200, json!(3)));
        let client = test_client(&transport, Arc::new(MemoryStorage::new()));

        let req = ApiRequest::get("/social/api/likes/count").query("blogId", 5);
        let count: u64 = client.request(&req).await.unwrap();
        assert_eq!(count, 3);
        assert_eq!(transport.requests()[0].url, "http://test/social/api/likes/count?blogId=5");
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_is_rejected_without_network() {
        let gate = Arc::new(Notify::new());
        let transport = MockTransport::new();
        transport.on(Method::Get, "/slow", Reply::Gated(gate.clone(), 200, r#"{"data":1}"#.to_string()));
        let client = test_client(&transport, Arc::new(MemoryStorage::new()));
        let req = ApiRequest::get("/slow").query("page", 1);

        let first = client.send(&req);
        let second = async {
            tokio::task::yield_now().await;
            let result = client.send(&req).await;
            gate.notify_one();
            result
        };
        let (first, second) = tokio::join!(first, second);

        assert_eq!(first.unwrap(), Payload::Json(json!(1)));
        assert!(matches!(second, Err(ApiError::DuplicateRequest(_))));
        assert_eq!(transport.count(Method::Get, "/slow"), 1);
        assert!(client.pending().is_empty());
    }

    #[tokio::test]
    async fn test_same_request_allowed_after_settling() {
        let transport = MockTransport::new();
        transport.on(Method::Get, "/a", Reply::json(200, json!(1)));
        let client = test_client(&transport, Arc::new(MemoryStorage::new()));
        let req = ApiRequest::get("/a");

        client.send(&req).await.unwrap();
        client.send(&req).await.unwrap();
        assert_eq!(transport.count(Method::Get, "/a"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_not_retried() {
        let transport = MockTransport::new();
        transport.on(Method::Get, "/hang", Reply::Hang);
        let client = test_client(&transport, Arc::new(MemoryStorage::new()));

        let result = client.send(&ApiRequest::get("/hang")).await;
        assert!(matches!(result, Err(ApiError::Timeout(10_000))));
        assert_eq!(transport.count(Method::Get, "/hang"), 1);
        assert!(client.pending().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_per_request_timeout_override() {
        let transport = MockTransport::new();
        transport.on(Method::Get, "/hang", Reply::Hang);
        let client = test_client(&transport, Arc::new(MemoryStorage::new()));

        let req = ApiRequest::get("/hang").timeout(Duration::from_millis(250));
        let result = client.send(&req).await;
        assert!(matches!(result, Err(ApiError::Timeout(250))));
    }

    #[tokio::test]
    async fn test_transient_failure_attempted_four_times() {
        let transport = MockTransport::new();
        transport.on(Method::Get, "/flaky", Reply::json(500, json!({"message": "boom"})));
        let client = test_client(&transport, Arc::new(MemoryStorage::new()));

        let result = client.send(&ApiRequest::get("/flaky")).await;
        match result {
            Err(ApiError::RequestFailed { status, message }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(transport.count(Method::Get, "/flaky"), 4);
    }

    #[tokio::test]
    async fn test_network_error_then_success() {
        let transport = MockTransport::new();
        transport.on(Method::Get, "/x", Reply::NetworkError);
        transport.on(Method::Get, "/x", Reply::json(200, json!({"data": "ok"})));
        let client = test_client(&transport, Arc::new(MemoryStorage::new()));

        let value: String = client.request(&ApiRequest::get("/x")).await.unwrap();
        assert_eq!(value, "ok");
        assert_eq!(transport.count(Method::Get, "/x"), 2);
    }

    #[tokio::test]
    async fn test_unauthorized_clears_session_and_redirects() {
        let transport = MockTransport::new();
        transport.on(Method::Get, "/social/api/blogs", Reply::json(401, json!({"message": "expired"})));
        let storage = Arc::new(MemoryStorage::new());
        storage.set(TOKEN_KEY, "T").unwrap();
        storage.set(USER_ID_KEY, "7").unwrap();

        let redirects = Arc::new(AtomicUsize::new(0));
        let seen = redirects.clone();
        let client = ApiClient::builder("http://test")
            .transport(transport.clone())
            .storage(storage.clone())
            .on_session_expired(move |path| {
                assert_eq!(path, "/login");
                seen.fetch_add(1, Ordering::SeqCst);
            })
            .build()
            .unwrap();

        let result = client.send(&ApiRequest::get("/social/api/blogs")).await;
        assert!(matches!(result, Err(ApiError::SessionExpired)));
        assert_eq!(storage.get(TOKEN_KEY), None);
        assert_eq!(storage.get(USER_ID_KEY), None);

        // A 401 is retried like any other failure; later attempts go out
        // without the cleared token.
        assert_eq!(transport.count(Method::Get, "/social/api/blogs"), 4);
        assert_eq!(redirects.load(Ordering::SeqCst), 4);
        let requests = transport.requests();
        assert_eq!(requests[0].header("Authorization"), Some("Bearer T"));
        assert_eq!(requests[1].header("Authorization"), None);
    }

    #[tokio::test]
    async fn test_forbidden_and_rate_limited() {
        let transport = MockTransport::new();
        transport.on(Method::Get, "/admin", Reply::json(403, json!({})));
        transport.on(Method::Get, "/busy", Reply::text(429, ""));
        let client = ApiClient::builder("http://test")
            .transport(transport.clone())
            .retry(RetryPolicy::none())
            .build()
            .unwrap();

        assert!(matches!(client.send(&ApiRequest::get("/admin")).await, Err(ApiError::Forbidden)));
        assert!(matches!(client.send(&ApiRequest::get("/busy")).await, Err(ApiError::RateLimited)));
    }

    #[tokio::test]
    async fn test_non_json_error_uses_fallback_message() {
        let transport = MockTransport::new();
        transport.on(Method::Get, "/missing", Reply::text(404, "<html>nope</html>"));
        let client = ApiClient::builder("http://test")
            .transport(transport.clone())
            .retry(RetryPolicy::none())
            .build()
            .unwrap();

        let err = client.send(&ApiRequest::get("/missing")).await.unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.to_string(), "The requested resource does not exist");
    }

    #[tokio::test]
    async fn test_cancel_all_aborts_in_flight_call() {
        let transport = MockTransport::new();
        transport.on(Method::Get, "/hang", Reply::Hang);
        let client = test_client(&transport, Arc::new(MemoryStorage::new()));

        let hang = ApiRequest::get("/hang");
        let call = client.send(&hang);
        let cancel = async {
            tokio::task::yield_now().await;
            client.cancel_all()
        };
        let (result, cancelled) = tokio::join!(call, cancel);

        assert_eq!(cancelled, 1);
        assert!(matches!(result, Err(ApiError::Cancelled)));
        assert_eq!(transport.count(Method::Get, "/hang"), 1);
    }
}
