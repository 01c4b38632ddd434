//! WhatsApp-related errors.

use thiserror::Error;

/// Errors that can occur when talking to the WhatsApp Cloud API.
#[derive(Debug, Error)]
pub enum WhatsAppError {
    /// HTTP request failed (transport, timeout).
    #[error("WhatsApp request failed: {0}")]
    Request(String),

    /// Failed to parse the provider response.
    #[error("WhatsApp response error: {0}")]
    Response(String),

    /// The Graph API returned an error object.
    #[error("WhatsApp API error: {0}")]
    Api(String),

    /// Configuration error.
    #[error("WhatsApp configuration error: {0}")]
    Config(String),
}
