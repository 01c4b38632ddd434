//! Inbound content extraction.

use crate::whatsapp::InboundMessage;

/// Placeholder for images without a caption.
pub const IMAGE_PLACEHOLDER: &str = "[Image]";
/// Placeholder for documents without a filename.
pub const DOCUMENT_PLACEHOLDER: &str = "[Document]";
/// Placeholder for voice messages.
pub const AUDIO_PLACEHOLDER: &str = "[Voice message]";
/// Placeholder for any other payload type.
pub const UNSUPPORTED_PLACEHOLDER: &str = "[Unsupported message]";

/// Map an inbound message to a display string.
///
/// Runs before every dispatch so all handlers operate on plain text. Pure
/// function of the payload: the same message always yields the same string.
#[must_use]
pub fn extract_content(message: &InboundMessage) -> String {
    match message.kind.as_str() {
        "text" => message
            .text
            .as_ref()
            .map(|t| t.body.clone())
            .unwrap_or_default(),
        "image" => message
            .image
            .as_ref()
            .and_then(|i| i.caption.clone())
            .unwrap_or_else(|| IMAGE_PLACEHOLDER.to_string()),
        "document" => message
            .document
            .as_ref()
            .and_then(|d| d.filename.clone())
            .unwrap_or_else(|| DOCUMENT_PLACEHOLDER.to_string()),
        "audio" => AUDIO_PLACEHOLDER.to_string(),
        _ => UNSUPPORTED_PLACEHOLDER.to_string(),
    }
}
