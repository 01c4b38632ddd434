//! Wire types for the WhatsApp Cloud API.
//!
//! Covers the subset of the Graph API `/messages` response and the webhook
//! payload that the service consumes.
//!
//! See: <https://developers.facebook.com/docs/whatsapp/cloud-api/webhooks/payload-examples>

use serde::{Deserialize, Serialize};

// =============================================================================
// Send response
// =============================================================================

/// Response from the Graph API `/messages` endpoint.
///
/// A successful send carries `messages[0].id`; an unsuccessful one may
/// carry an `error` object, or neither. Callers treat a missing message ID
/// as a soft failure (skip logging, don't abort the handler).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SendMessageResponse {
    /// Provider-assigned IDs for accepted messages.
    #[serde(default)]
    pub messages: Vec<SentMessage>,
    /// Error object, present on provider-rejected requests.
    #[serde(default)]
    pub error: Option<ApiErrorBody>,
}

impl SendMessageResponse {
    /// The provider-assigned ID of the first accepted message, if any.
    #[must_use]
    pub fn message_id(&self) -> Option<&str> {
        self.messages.first().map(|m| m.id.as_str())
    }
}

/// One accepted message in a send response.
#[derive(Debug, Clone, Deserialize)]
pub struct SentMessage {
    /// Provider-assigned message ID.
    pub id: String,
}

/// Error object in a Graph API response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
    /// Error type name.
    #[serde(default, rename = "type")]
    pub error_type: String,
    /// Numeric error code.
    #[serde(default)]
    pub code: i64,
}

// =============================================================================
// Webhook payload
// =============================================================================

/// Top-level webhook payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

impl WebhookPayload {
    /// Iterate over every change value across all entries.
    pub fn values(&self) -> impl Iterator<Item = &ChangeValue> {
        self.entry
            .iter()
            .flat_map(|e| e.changes.iter())
            .map(|c| &c.value)
    }
}

/// One webhook entry (per WhatsApp Business Account).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookEntry {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub changes: Vec<WebhookChange>,
}

/// One change inside an entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookChange {
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub value: ChangeValue,
}

/// The value object carrying messages and delivery receipts.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub messages: Vec<InboundMessage>,
    #[serde(default)]
    pub statuses: Vec<StatusUpdate>,
}

/// One inbound message.
///
/// The wire type stays a plain string so unknown provider types (stickers,
/// reactions) decode fine and fall through to the unsupported placeholder.
/// `Serialize` re-emits the payload for the message log's metadata column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Sender phone number, digits only.
    pub from: String,
    /// Provider-assigned message ID.
    pub id: String,
    /// Unix-seconds timestamp string.
    #[serde(default)]
    pub timestamp: String,
    /// Wire type: text, image, document, audio, ...
    #[serde(rename = "type")]
    pub kind: String,
    /// Body for `text` messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<TextContent>,
    /// Payload for `image` messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<MediaContent>,
    /// Payload for `document` messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<DocumentContent>,
}

/// Text message body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextContent {
    #[serde(default)]
    pub body: String,
}

/// Media message payload (image, audio).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaContent {
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
}

/// Document message payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentContent {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
}

/// One delivery receipt.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdate {
    /// Message ID the receipt refers to.
    pub id: String,
    /// sent / delivered / read / failed.
    pub status: String,
    /// Unix-seconds timestamp string.
    #[serde(default)]
    pub timestamp: Option<String>,
    /// Recipient phone number.
    #[serde(default)]
    pub recipient_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_text_message_payload() {
        let payload: WebhookPayload = serde_json::from_value(serde_json::json!({
            "entry": [{
                "id": "WABA_ID",
                "changes": [{
                    "field": "messages",
                    "value": {
                        "messages": [{
                            "from": "2010000000",
                            "id": "wamid.ABC",
                            "timestamp": "1724832000",
                            "type": "text",
                            "text": { "body": "help" }
                        }]
                    }
                }]
            }]
        }))
        .expect("valid payload");

        let value = payload.values().next().expect("one value");
        let message = value.messages.first().expect("one message");
        assert_eq!(message.from, "2010000000");
        assert_eq!(message.kind, "text");
        assert_eq!(message.text.as_ref().expect("text body").body, "help");
    }

    #[test]
    fn test_decode_status_payload() {
        let payload: WebhookPayload = serde_json::from_value(serde_json::json!({
            "entry": [{
                "changes": [{
                    "value": {
                        "statuses": [{
                            "id": "wamid.OUT",
                            "status": "delivered",
                            "recipient_id": "2010000000",
                            "timestamp": "1724832000"
                        }]
                    }
                }]
            }]
        }))
        .expect("valid payload");

        let value = payload.values().next().expect("one value");
        let status = value.statuses.first().expect("one status");
        assert_eq!(status.status, "delivered");
        assert_eq!(status.id, "wamid.OUT");
    }

    #[test]
    fn test_decode_unknown_message_type() {
        let payload: WebhookPayload = serde_json::from_value(serde_json::json!({
            "entry": [{
                "changes": [{
                    "value": {
                        "messages": [{
                            "from": "2010000000",
                            "id": "wamid.STICKER",
                            "type": "sticker",
                            "sticker": { "id": "123" }
                        }]
                    }
                }]
            }]
        }))
        .expect("unknown types still decode");

        let value = payload.values().next().expect("one value");
        assert_eq!(value.messages.first().expect("message").kind, "sticker");
    }

    #[test]
    fn test_empty_payload_decodes() {
        let payload: WebhookPayload =
            serde_json::from_value(serde_json::json!({})).expect("empty payload");
        assert_eq!(payload.values().count(), 0);
    }

    #[test]
    fn test_send_response_message_id() {
        let response: SendMessageResponse = serde_json::from_value(serde_json::json!({
            "messaging_product": "whatsapp",
            "messages": [{ "id": "wamid.SENT" }]
        }))
        .expect("valid response");
        assert_eq!(response.message_id(), Some("wamid.SENT"));
    }

    #[test]
    fn test_send_response_without_id() {
        let response: SendMessageResponse =
            serde_json::from_value(serde_json::json!({ "messaging_product": "whatsapp" }))
                .expect("valid response");
        assert_eq!(response.message_id(), None);
    }

    #[test]
    fn test_send_response_error_body() {
        let response: SendMessageResponse = serde_json::from_value(serde_json::json!({
            "error": { "message": "Invalid parameter", "type": "OAuthException", "code": 100 }
        }))
        .expect("valid response");
        let error = response.error.expect("error body");
        assert_eq!(error.code, 100);
        assert_eq!(error.message, "Invalid parameter");
    }
}
