use crate::http::types::HttpSuccess;
use crate::http::HttpState;
use crate::verifier::VerifyQuery;
use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use tracing::{error, info};

const HOME_PAGE: &str = r#"<h1>DeepSeek WhatsApp Bot</h1>
<p>Bot is running! Webhook endpoint: /webhook</p>
<p>Make sure to:</p>
<ul>
    <li>Configure your .env file with proper credentials</li>
    <li>Expose this server publicly (for example with ngrok)</li>
    <li>Configure the WhatsApp webhook URL</li>
</ul>
"#;

pub async fn home() -> Html<&'static str> {
    Html(HOME_PAGE)
}

pub async fn webhook_verify(
    State(state): State<HttpState>,
    query: Result<Query<VerifyQuery>, QueryRejection>,
) -> (StatusCode, String) {
    let Query(query) = match query {
        Ok(query) => query,
        Err(e) => {
            error!("Webhook verification failed: invalid query string: {e}");
            return (StatusCode::FORBIDDEN, "Verification failed".to_string());
        }
    };
    info!(
        "Webhook verification: mode={:?}, token={:?}",
        query.mode, query.token
    );

    match state.verifier.verify(query) {
        Some(challenge) => {
            info!("Webhook verified successfully!");
            (StatusCode::OK, challenge)
        }
        None => {
            error!("Webhook verification failed!");
            (StatusCode::FORBIDDEN, "Verification failed".to_string())
        }
    }
}

/// Always acknowledges with 200 "OK": the platform redelivers anything else.
pub async fn webhook_receive(
    State(state): State<HttpState>,
    body: Result<Bytes, BytesRejection>,
) -> (StatusCode, &'static str) {
    let body = match body {
        Ok(body) => body,
        Err(e) => {
            error!("Error processing webhook: failed to read body: {e}");
            return (StatusCode::OK, "OK");
        }
    };

    let payload = match serde_json::from_slice::<serde_json::Value>(&body) {
        Ok(payload) => payload,
        Err(e) => {
            error!("Error processing webhook: invalid JSON body: {e}");
            return (StatusCode::OK, "OK");
        }
    };
    info!("Received webhook data: {payload}");

    // Run on its own task so a panic while relaying still gets acknowledged.
    let relay = state.relay.clone();
    match tokio::spawn(async move { relay.handle(&payload).await }).await {
        Ok(outcome) => info!("Webhook handled: {outcome:?}"),
        Err(e) => error!("Error processing webhook: {e}"),
    }

    (StatusCode::OK, "OK")
}

pub async fn sys_version() -> HttpSuccess<&'static str> {
    HttpSuccess(crate::VERSION)
}
