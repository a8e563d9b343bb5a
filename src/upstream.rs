use crate::config::UpstreamConfig;
use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};

/// Failure talking to one of the outbound APIs. Never leaves the client that
/// produced it: callers see a fallback reply or a delivery flag instead.
#[derive(thiserror::Error, Debug)]
pub enum UpstreamError {
    #[error("API credentials not configured")]
    NotConfigured,
    #[error("unsuccessful status {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("no choices in response")]
    EmptyChoices,
}

/// Builds the HTTP client shared by the completion and WhatsApp clients.
pub fn build_client(config: &UpstreamConfig) -> Result<Client> {
    let mut builder = Client::builder();

    #[cfg(feature = "tls-rustls")]
    {
        builder = builder.use_rustls_tls();
    }

    #[cfg(feature = "tls-native")]
    {
        builder = builder.use_native_tls();
    }

    if let Some(timeout) = config.timeout() {
        builder = builder.timeout(timeout);
    }

    builder
        .build()
        .context("Failed to build upstream Reqwest client!")
}
