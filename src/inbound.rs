//! Extraction of the single message a WhatsApp webhook delivery carries.
//!
//! Only `entry[0].changes[0].value.messages[0]` is ever considered. Deliveries
//! without it (status updates, read receipts) are not errors.

use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    Text(String),
    /// Any non-text type, carrying the type name as reported by the platform.
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub sender_id: String,
    pub kind: MessageKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    NoMessage,
    Message(InboundMessage),
}

pub fn extract_message(payload: &Value) -> Extraction {
    first_message(payload)
        .and_then(parse_message)
        .map_or(Extraction::NoMessage, Extraction::Message)
}

fn first_message(payload: &Value) -> Option<&Value> {
    payload
        .get("entry")?
        .get(0)?
        .get("changes")?
        .get(0)?
        .get("value")?
        .get("messages")?
        .get(0)
}

fn parse_message(message: &Value) -> Option<InboundMessage> {
    let sender_id = message.get("from")?.as_str()?.to_string();
    let message_type = message.get("type").and_then(Value::as_str).unwrap_or_default();

    let kind = match message_type {
        "text" => MessageKind::Text(
            message
                .get("text")
                .and_then(|text| text.get("body"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        ),
        other => MessageKind::Other(other.to_string()),
    };

    Some(InboundMessage { sender_id, kind })
}
