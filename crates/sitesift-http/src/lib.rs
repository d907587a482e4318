use sitesift_core::{Error, Result, SearchBackend, SearchRequest, SearchResponse};
use std::time::Duration;

pub mod pipeline;
pub mod sanitize;

fn env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn endpoint_from_env() -> Option<String> {
    env("SITESIFT_ENDPOINT")
}

fn timeout_ms_from_env() -> u64 {
    // The service re-indexes the target site per request, so responses can
    // be slow; still cap the wait even if callers configure something huge.
    env("SITESIFT_TIMEOUT_MS")
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(20_000)
        .clamp(1_000, 60_000)
}

/// The remote semantic-search service, reached over HTTP.
///
/// One POST per search: `{url, query, count}` out, a `SearchResponse` body
/// back. Non-success statuses are hard failures with no interpretation of
/// the body; transient faults surface to the caller as-is (retry policy is
/// explicitly not this crate's concern).
#[derive(Debug, Clone)]
pub struct HttpSearchBackend {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSearchBackend {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn from_env(client: reqwest::Client) -> Result<Self> {
        let endpoint = endpoint_from_env()
            .ok_or_else(|| Error::NotConfigured("missing SITESIFT_ENDPOINT".to_string()))?;
        Ok(Self::new(client, endpoint))
    }
}

#[async_trait::async_trait]
impl SearchBackend for HttpSearchBackend {
    async fn search(&self, req: &SearchRequest) -> Result<SearchResponse> {
        let resp = self
            .client
            .post(&self.endpoint)
            .json(req)
            .timeout(Duration::from_millis(timeout_ms_from_env()))
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Transport(format!("search HTTP {status}")));
        }

        let parsed: SearchResponse = resp
            .json()
            .await
            .map_err(|e| Error::Protocol(e.to_string()))?;
        tracing::trace!(results = parsed.results.len(), "search response parsed");
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::header, http::StatusCode, routing::post, Json, Router};
    use std::net::SocketAddr;
    use std::sync::Mutex;

    // Env vars are process-global; serialize tests that mutate them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    struct EnvGuard {
        k: &'static str,
        prev: Option<String>,
    }

    impl EnvGuard {
        fn set(k: &'static str, v: &str) -> Self {
            let prev = std::env::var(k).ok();
            std::env::set_var(k, v);
            Self { k, prev }
        }

        fn unset(k: &'static str) -> Self {
            let prev = std::env::var(k).ok();
            std::env::remove_var(k);
            Self { k, prev }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            if let Some(v) = self.prev.take() {
                std::env::set_var(self.k, v);
            } else {
                std::env::remove_var(self.k);
            }
        }
    }

    async fn serve(app: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn request() -> SearchRequest {
        SearchRequest::new("https://example.com", "rust ownership", 5).unwrap()
    }

    #[tokio::test]
    async fn posts_the_wire_contract_and_parses_the_response() {
        // Echo the request fields back so the test asserts the outbound
        // body shape, not just the inbound parse.
        let app = Router::new().route(
            "/api/search/",
            post(|Json(body): Json<serde_json::Value>| async move {
                Json(serde_json::json!({
                    "url": body["url"],
                    "query": body["query"],
                    "count": 42,
                    "results": [
                        {"ordinal": 0, "score": 0.91, "html_snippet": "<p>a</p>", "text_preview": "a", "tokens": 7},
                        {"ordinal": 1, "score": null, "html_snippet": "<p>b</p>", "text_preview": "b", "tokens": 9}
                    ]
                }))
            }),
        );
        let addr = serve(app).await;

        let backend =
            HttpSearchBackend::new(reqwest::Client::new(), format!("http://{addr}/api/search/"));
        let resp = backend.search(&request()).await.unwrap();

        assert_eq!(resp.url, "https://example.com");
        assert_eq!(resp.query, "rust ownership");
        assert_eq!(resp.count, 42);
        assert_eq!(resp.results.len(), 2);
        assert_eq!(resp.results[0].score, Some(0.91));
        assert_eq!(resp.results[1].score, None);
    }

    #[tokio::test]
    async fn non_success_status_is_a_transport_error() {
        let app = Router::new().route(
            "/api/search/",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let addr = serve(app).await;

        let backend =
            HttpSearchBackend::new(reqwest::Client::new(), format!("http://{addr}/api/search/"));
        let err = backend.search(&request()).await.unwrap_err();
        match err {
            Error::Transport(msg) => assert!(msg.contains("500"), "status in message: {msg}"),
            other => panic!("expected Transport, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_body_is_a_protocol_error() {
        let app = Router::new().route(
            "/api/search/",
            post(|| async { ([(header::CONTENT_TYPE, "application/json")], "{not json") }),
        );
        let addr = serve(app).await;

        let backend =
            HttpSearchBackend::new(reqwest::Client::new(), format!("http://{addr}/api/search/"));
        let err = backend.search(&request()).await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[test]
    fn from_env_requires_a_nonempty_endpoint() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());

        {
            let _g = EnvGuard::set("SITESIFT_ENDPOINT", "  ");
            assert!(matches!(
                HttpSearchBackend::from_env(reqwest::Client::new()),
                Err(Error::NotConfigured(_))
            ));
        }
        {
            let _g = EnvGuard::set("SITESIFT_ENDPOINT", "http://localhost:8000/api/search/");
            let backend = HttpSearchBackend::from_env(reqwest::Client::new()).unwrap();
            assert_eq!(backend.endpoint, "http://localhost:8000/api/search/");
        }
    }

    #[test]
    fn timeout_is_clamped_to_a_sane_range() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());

        {
            let _g = EnvGuard::unset("SITESIFT_TIMEOUT_MS");
            assert_eq!(timeout_ms_from_env(), 20_000);
        }
        {
            let _g = EnvGuard::set("SITESIFT_TIMEOUT_MS", "5");
            assert_eq!(timeout_ms_from_env(), 1_000);
        }
        {
            let _g = EnvGuard::set("SITESIFT_TIMEOUT_MS", "10000000");
            assert_eq!(timeout_ms_from_env(), 60_000);
        }
        {
            let _g = EnvGuard::set("SITESIFT_TIMEOUT_MS", "not-a-number");
            assert_eq!(timeout_ms_from_env(), 20_000);
        }
    }
}
