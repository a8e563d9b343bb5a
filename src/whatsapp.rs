use crate::config::WhatsAppConfig;
use crate::upstream::UpstreamError;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::{error, info, instrument};

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    messaging_product: &'static str,
    to: &'a str,
    #[serde(rename = "type")]
    message_type: &'static str,
    text: TextBody<'a>,
}

#[derive(Debug, Serialize)]
struct TextBody<'a> {
    body: &'a str,
}

/// Phone number ID and access token, present only when both are configured.
#[derive(Clone)]
struct SenderCredentials {
    token: String,
    phone_id: String,
}

#[derive(Clone)]
pub struct WhatsAppSender {
    api_base_url: String,
    api_version: String,
    credentials: Option<SenderCredentials>,
    client: Client,
}
impl WhatsAppSender {
    pub fn new(
        config: &WhatsAppConfig,
        token: Option<String>,
        phone_id: Option<String>,
        client: Client,
    ) -> Self {
        Self {
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
            credentials: token
                .zip(phone_id)
                .map(|(token, phone_id)| SenderCredentials { token, phone_id }),
            client,
        }
    }

    /// Sends a single text message, returning whether the API answered 200.
    /// There is exactly one attempt.
    #[instrument(skip(self, message), fields(message_length = message.len()))]
    pub async fn send_text(&self, to: &str, message: &str) -> bool {
        match self.try_send_text(to, message).await {
            Ok(()) => {
                info!("Message sent successfully to {to}");
                true
            }
            Err(UpstreamError::NotConfigured) => {
                error!("WhatsApp credentials not configured!");
                false
            }
            Err(e) => {
                error!("Failed to send message to {to}: {e}");
                false
            }
        }
    }

    async fn try_send_text(&self, to: &str, message: &str) -> Result<(), UpstreamError> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(UpstreamError::NotConfigured)?;

        let request = SendMessageRequest {
            messaging_product: "whatsapp",
            to,
            message_type: "text",
            text: TextBody { body: message },
        };

        let response = self
            .client
            .post(self.messages_url(&credentials.phone_id))
            .bearer_auth(&credentials.token)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(UpstreamError::Status { status, body });
        }
        Ok(())
    }

    fn messages_url(&self, phone_id: &str) -> String {
        format!(
            "{}/{}/{}/messages",
            self.api_base_url, self.api_version, phone_id
        )
    }
}
