//! Local stand-in for the WhatsApp and DeepSeek APIs.
//!
//! Binds an axum server on a random port, answers every request with a fixed
//! status and JSON body, and records what it received.

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::Router;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

/// A URL nothing listens on, for provoking transport errors.
pub const UNREACHABLE_URL: &str = "http://127.0.0.1:1";

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub authorization: Option<String>,
    pub body: Value,
}

pub struct MockUpstream {
    pub url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    _handle: JoinHandle<()>,
}
impl MockUpstream {
    pub async fn spawn(status: StatusCode, response: Value) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);

        let router = Router::new().fallback(move |uri: Uri, headers: HeaderMap, body: Bytes| {
            let recorded = Arc::clone(&recorded);
            let response = response.clone();
            async move {
                recorded.lock().unwrap().push(RecordedRequest {
                    path: uri.path().to_string(),
                    authorization: headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string),
                    body: serde_json::from_slice(&body).unwrap_or(Value::Null),
                });
                (status, axum::Json(response))
            }
        });

        Self::serve(router, requests).await
    }

    /// Answers with `status` and then aborts the body mid-stream, so the status
    /// line arrives but the body can never be read.
    pub async fn spawn_with_broken_body(status: StatusCode) -> Self {
        let router = Router::new().fallback(move || async move {
            let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
                Ok(Bytes::from_static(b"{\"error\":")),
                Err(std::io::Error::other("connection reset")),
            ];
            (status, Body::from_stream(futures::stream::iter(chunks)))
        });

        Self::serve(router, Arc::new(Mutex::new(Vec::new()))).await
    }

    async fn serve(router: Router, requests: Arc<Mutex<Vec<RecordedRequest>>>) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock upstream");
        let url = format!("http://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .await
                .expect("Mock upstream failed");
        });

        Self {
            url,
            requests,
            _handle: handle,
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}
impl Drop for MockUpstream {
    fn drop(&mut self) {
        self._handle.abort();
    }
}
