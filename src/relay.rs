use crate::completion::{CompletionClient, CompletionReply};
use crate::config::AppConfig;
use crate::inbound::{extract_message, Extraction, InboundMessage, MessageKind};
use crate::whatsapp::WhatsAppSender;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

/// What a single webhook delivery resulted in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    NoMessage,
    Unsupported { message_type: String },
    EmptyText,
    Relayed {
        reply: CompletionReply,
        delivered: bool,
    },
}

/// Turns an inbound text message into a model reply sent back to its author.
#[derive(Clone)]
pub struct Relay {
    completion: CompletionClient,
    sender: WhatsAppSender,
}
impl Relay {
    pub fn new(completion: CompletionClient, sender: WhatsAppSender) -> Self {
        Self { completion, sender }
    }

    pub fn from_config(config: &AppConfig, client: Client) -> Self {
        let credentials = &config.credentials;
        Self::new(
            CompletionClient::new(
                &config.completion,
                credentials.deepseek_api_key.clone(),
                client.clone(),
            ),
            WhatsAppSender::new(
                &config.whatsapp,
                credentials.whatsapp_token.clone(),
                credentials.whatsapp_phone_id.clone(),
                client,
            ),
        )
    }

    /// Handles a parsed webhook body. Both upstream calls are awaited in turn,
    /// and none of their failures escape this function.
    #[instrument(skip_all)]
    pub async fn handle(&self, payload: &Value) -> RelayOutcome {
        let message = match extract_message(payload) {
            Extraction::Message(message) => message,
            Extraction::NoMessage => {
                debug!("Webhook delivery carries no message");
                return RelayOutcome::NoMessage;
            }
        };

        let InboundMessage { sender_id, kind } = message;
        let text = match kind {
            MessageKind::Text(text) => text,
            MessageKind::Other(message_type) => {
                info!("Received non-text message type: {message_type}");
                return RelayOutcome::Unsupported { message_type };
            }
        };

        info!("Received message from {sender_id}: {text}");
        if text.trim().is_empty() {
            info!("Ignoring empty text message from {sender_id}");
            return RelayOutcome::EmptyText;
        }

        let reply = self.completion.reply(&text).await;
        if reply.is_fallback() {
            warn!("Relaying fallback reply to {sender_id}");
        }
        info!("AI response: {}", reply.as_str());

        let delivered = self.sender.send_text(&sender_id, reply.as_str()).await;
        RelayOutcome::Relayed { reply, delivered }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::REPLY_UNAVAILABLE;
    use crate::config::{CompletionConfig, WhatsAppConfig};
    use crate::test_utils::MockUpstream;
    use reqwest::StatusCode;
    use serde_json::json;

    struct Harness {
        relay: Relay,
        completion: MockUpstream,
        whatsapp: MockUpstream,
    }

    async fn harness(completion_status: StatusCode, completion_body: Value) -> Harness {
        let completion = MockUpstream::spawn(completion_status, completion_body).await;
        let whatsapp = MockUpstream::spawn(StatusCode::OK, json!({"messages": []})).await;

        let client = Client::new();
        let relay = Relay::new(
            CompletionClient::new(
                &CompletionConfig {
                    api_url: format!("{}/v1/chat/completions", completion.url),
                },
                Some("sk-test".to_string()),
                client.clone(),
            ),
            WhatsAppSender::new(
                &WhatsAppConfig {
                    api_base_url: whatsapp.url.clone(),
                    api_version: "v20.0".to_string(),
                },
                Some("wa-token".to_string()),
                Some("10987".to_string()),
                client,
            ),
        );

        Harness {
            relay,
            completion,
            whatsapp,
        }
    }

    fn delivery(message: Value) -> Value {
        json!({
            "object": "whatsapp_business_account",
            "entry": [{"changes": [{"value": {"messages": [message]}}]}]
        })
    }

    fn answer(content: &str) -> Value {
        json!({"choices": [{"message": {"role": "assistant", "content": content}}]})
    }

    #[tokio::test]
    async fn test_text_message_is_relayed() {
        let h = harness(StatusCode::OK, answer("Hi! How can I help?")).await;
        let payload = delivery(json!({
            "from": "1555000111",
            "type": "text",
            "text": {"body": "Hello"}
        }));

        let outcome = h.relay.handle(&payload).await;
        assert_eq!(
            outcome,
            RelayOutcome::Relayed {
                reply: CompletionReply::Text("Hi! How can I help?".to_string()),
                delivered: true,
            }
        );

        let prompts = h.completion.requests();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].body["messages"][0]["content"], "Hello");

        let sent = h.whatsapp.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].body["to"], "1555000111");
        assert_eq!(sent[0].body["text"]["body"], "Hi! How can I help?");
    }

    #[tokio::test]
    async fn test_completion_failure_sends_fallback() {
        let h = harness(StatusCode::INTERNAL_SERVER_ERROR, json!({"error": "boom"})).await;
        let payload = delivery(json!({
            "from": "1555000111",
            "type": "text",
            "text": {"body": "Hello"}
        }));

        let outcome = h.relay.handle(&payload).await;
        assert_eq!(
            outcome,
            RelayOutcome::Relayed {
                reply: CompletionReply::Fallback(REPLY_UNAVAILABLE),
                delivered: true,
            }
        );

        let sent = h.whatsapp.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].body["to"], "1555000111");
        assert_eq!(sent[0].body["text"]["body"], REPLY_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_no_message_makes_no_calls() {
        let h = harness(StatusCode::OK, answer("unused")).await;
        let payload = json!({
            "entry": [{"changes": [{"value": {"statuses": [{"id": "wamid.1", "status": "delivered"}]}}]}]
        });

        assert_eq!(h.relay.handle(&payload).await, RelayOutcome::NoMessage);
        assert!(h.completion.requests().is_empty());
        assert!(h.whatsapp.requests().is_empty());
    }

    #[tokio::test]
    async fn test_non_text_message_makes_no_calls() {
        let h = harness(StatusCode::OK, answer("unused")).await;
        let payload = delivery(json!({
            "from": "1555000111",
            "type": "image",
            "image": {"id": "media-1"}
        }));

        assert_eq!(
            h.relay.handle(&payload).await,
            RelayOutcome::Unsupported {
                message_type: "image".to_string()
            }
        );
        assert!(h.completion.requests().is_empty());
        assert!(h.whatsapp.requests().is_empty());
    }

    #[tokio::test]
    async fn test_blank_text_makes_no_calls() {
        let h = harness(StatusCode::OK, answer("unused")).await;
        let payload = delivery(json!({
            "from": "1555000111",
            "type": "text",
            "text": {"body": "   "}
        }));

        assert_eq!(h.relay.handle(&payload).await, RelayOutcome::EmptyText);
        assert!(h.completion.requests().is_empty());
        assert!(h.whatsapp.requests().is_empty());
    }
}
