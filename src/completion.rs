use crate::config::CompletionConfig;
use crate::upstream::UpstreamError;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

const COMPLETION_MODEL: &str = "deepseek-chat";
const COMPLETION_TEMPERATURE: f64 = 0.7;
const COMPLETION_MAX_TOKENS: u32 = 1000;

pub const REPLY_NOT_CONFIGURED: &str = "DeepSeek API key not configured!";
pub const REPLY_UNAVAILABLE: &str = "Sorry, I'm having trouble processing your request right now.";
pub const REPLY_ERROR: &str = "Sorry, I encountered an error while processing your message.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
struct CompletionRequest {
    model: &'static str,
    messages: Vec<ChatMessage>,
    temperature: f64,
    max_tokens: u32,
}
impl CompletionRequest {
    fn new(prompt: &str) -> Self {
        Self {
            model: COMPLETION_MODEL,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: COMPLETION_TEMPERATURE,
            max_tokens: COMPLETION_MAX_TOKENS,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: ChatMessage,
}

/// Outcome of a completion call. A fallback is a ready-made apology that can be
/// sent to the user in place of a real answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionReply {
    Text(String),
    Fallback(&'static str),
}
impl CompletionReply {
    pub fn as_str(&self) -> &str {
        match self {
            CompletionReply::Text(text) => text,
            CompletionReply::Fallback(text) => text,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, CompletionReply::Fallback(_))
    }
}
impl From<UpstreamError> for CompletionReply {
    fn from(error: UpstreamError) -> Self {
        CompletionReply::Fallback(match error {
            UpstreamError::NotConfigured => REPLY_NOT_CONFIGURED,
            UpstreamError::Status { .. } => REPLY_UNAVAILABLE,
            _ => REPLY_ERROR,
        })
    }
}

#[derive(Clone)]
pub struct CompletionClient {
    api_url: String,
    api_key: Option<String>,
    client: Client,
}
impl CompletionClient {
    pub fn new(config: &CompletionConfig, api_key: Option<String>, client: Client) -> Self {
        Self {
            api_url: config.api_url.clone(),
            api_key,
            client,
        }
    }

    /// Asks the model to answer `prompt`. Never fails: every error becomes a fallback.
    #[instrument(skip_all)]
    pub async fn reply(&self, prompt: &str) -> CompletionReply {
        match self.request(prompt).await {
            Ok(text) => CompletionReply::Text(text),
            Err(UpstreamError::NotConfigured) => {
                error!("DeepSeek API key not configured!");
                UpstreamError::NotConfigured.into()
            }
            Err(e) => {
                error!("DeepSeek API error: {e}");
                e.into()
            }
        }
    }

    async fn request(&self, prompt: &str) -> Result<String, UpstreamError> {
        let api_key = self.api_key.as_ref().ok_or(UpstreamError::NotConfigured)?;

        debug!("Sending completion request to {}", self.api_url);
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(&CompletionRequest::new(prompt))
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

        let body = response.text().await?;
        let completion: CompletionResponse = serde_json::from_str(&body)?;
        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or(UpstreamError::EmptyChoices)
    }
}
