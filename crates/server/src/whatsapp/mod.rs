//! WhatsApp Cloud API integration.
//!
//! This module provides:
//! - [`WhatsAppClient`] for sending messages and marking them read
//! - Wire types for outbound sends and the inbound webhook payload
//!
//! # Flow
//!
//! 1. Meta delivers inbound messages and delivery receipts to the webhook
//! 2. The conversation engine decides the reply
//! 3. The client posts replies to the Graph API `/messages` endpoint
//! 4. Delivery receipts arrive later and update the logged message rows

mod client;
mod error;
mod types;

pub use client::WhatsAppClient;
pub use error::WhatsAppError;
pub use types::{
    ChangeValue, DocumentContent, InboundMessage, MediaContent, SendMessageResponse, StatusUpdate,
    TextContent, WebhookChange, WebhookEntry, WebhookPayload,
};
