//! Message log domain type.

use chrono::{DateTime, Utc};
use serde_json::Value;

use waba_core::{MessageDirection, MessageStatus, MessageType};

/// One entry in the append-only message log (domain type).
///
/// Rows are write-once except `status` and the delivery timestamps, which
/// asynchronous delivery receipts update by `message_id`.
#[derive(Debug, Clone)]
pub struct WhatsAppMessage {
    /// Database row ID.
    pub id: i64,
    /// Provider-assigned message ID (unique).
    pub message_id: String,
    /// Phone number of the counterparty.
    pub phone_number: String,
    /// Inbound or outbound.
    pub direction: MessageDirection,
    /// Wire type as received; unknown inbound types are stored raw.
    pub message_type: String,
    /// Extracted text or placeholder.
    pub content: String,
    /// Raw provider payload for inbound messages.
    pub metadata: Option<Value>,
    /// Delivery status.
    pub status: MessageStatus,
    /// When the provider accepted the outbound send.
    pub sent_at: Option<DateTime<Utc>>,
    /// When the provider reported delivery.
    pub delivered_at: Option<DateTime<Utc>>,
    /// When the provider reported a read receipt.
    pub read_at: Option<DateTime<Utc>>,
    /// When the row was created.
    pub created_at: DateTime<Utc>,
}

impl WhatsAppMessage {
    /// The wire type parsed into the known enum, if recognized.
    #[must_use]
    pub fn known_type(&self) -> Option<MessageType> {
        match self.message_type.as_str() {
            "text" => Some(MessageType::Text),
            "image" => Some(MessageType::Image),
            "document" => Some(MessageType::Document),
            "audio" => Some(MessageType::Audio),
            "template" => Some(MessageType::Template),
            _ => None,
        }
    }
}
