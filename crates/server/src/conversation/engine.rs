//! Conversation orchestration.
//!
//! The engine owns the side-effectful half of the conversation cycle:
//! user lookup, message logging, read receipts, sending replies, and
//! activity tracking. The decision itself comes from [`super::script`].
//!
//! Processing for one phone number is serialized through a keyed mutex so
//! rapid bursts from the same user cannot interleave their
//! read-decide-write cycles. Different users proceed concurrently.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use waba_core::{
    ConversationStep, MessageStatus, MessageType, PhoneNumber, PhoneNumberError, UserStatus,
};

use super::content::extract_content;
use super::script::{self, Decision, UserView};
use super::smart_reply::ReplyPicker;
use crate::db::messages::StatusUpdateOutcome;
use crate::db::{MessageRepository, RepositoryError, UserRepository};
use crate::models::WhatsAppUser;
use crate::whatsapp::{InboundMessage, StatusUpdate, WhatsAppClient, WhatsAppError};

/// Errors from one conversation cycle.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Persistence failed.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// The provider call failed.
    #[error("whatsapp error: {0}")]
    WhatsApp(#[from] WhatsAppError),

    /// The sender phone number in the payload is malformed.
    #[error("invalid sender phone number: {0}")]
    InvalidPhone(#[from] PhoneNumberError),
}

/// Outbound side of the provider, as the engine needs it.
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Send a text reply. Returns the provider message ID when the
    /// provider assigned one.
    async fn send_text(
        &self,
        to: &PhoneNumber,
        body: &str,
    ) -> Result<Option<String>, WhatsAppError>;

    /// Mark an inbound message as read.
    async fn mark_as_read(&self, message_id: &str) -> Result<(), WhatsAppError>;
}

#[async_trait]
impl MessageSender for WhatsAppClient {
    async fn send_text(
        &self,
        to: &PhoneNumber,
        body: &str,
    ) -> Result<Option<String>, WhatsAppError> {
        let response = Self::send_text(self, to, body).await?;
        Ok(response.message_id().map(ToString::to_string))
    }

    async fn mark_as_read(&self, message_id: &str) -> Result<(), WhatsAppError> {
        Self::mark_as_read(self, message_id).await
    }
}

/// User persistence, as the engine needs it.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Get or create the user for a phone number.
    async fn find_or_create(&self, phone: &PhoneNumber) -> Result<WhatsAppUser, RepositoryError>;

    /// Persist a step transition with optional status and name changes.
    async fn apply_transition(
        &self,
        phone: &PhoneNumber,
        step: ConversationStep,
        status: Option<UserStatus>,
        name: Option<&str>,
    ) -> Result<(), RepositoryError>;

    /// Bump the message counter and last-activity timestamp.
    async fn record_activity(&self, phone: &PhoneNumber) -> Result<(), RepositoryError>;
}

#[async_trait]
impl UserStore for UserRepository {
    async fn find_or_create(&self, phone: &PhoneNumber) -> Result<WhatsAppUser, RepositoryError> {
        Self::find_or_create(self, phone).await
    }

    async fn apply_transition(
        &self,
        phone: &PhoneNumber,
        step: ConversationStep,
        status: Option<UserStatus>,
        name: Option<&str>,
    ) -> Result<(), RepositoryError> {
        Self::apply_transition(self, phone, step, status, name).await
    }

    async fn record_activity(&self, phone: &PhoneNumber) -> Result<(), RepositoryError> {
        Self::record_activity(self, phone).await
    }
}

/// Message-log persistence, as the engine needs it.
#[async_trait]
pub trait MessageLog: Send + Sync {
    /// Record an inbound message with its raw provider payload.
    async fn log_inbound(
        &self,
        message_id: &str,
        phone: &PhoneNumber,
        message_type: &str,
        content: &str,
        metadata: Option<&serde_json::Value>,
    ) -> Result<(), RepositoryError>;

    /// Record an outbound message accepted by the provider.
    async fn log_outbound(
        &self,
        message_id: &str,
        phone: &PhoneNumber,
        message_type: MessageType,
        content: &str,
    ) -> Result<(), RepositoryError>;

    /// Apply a delivery receipt.
    async fn update_status(
        &self,
        message_id: &str,
        status: MessageStatus,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<StatusUpdateOutcome, RepositoryError>;
}

#[async_trait]
impl MessageLog for MessageRepository {
    async fn log_inbound(
        &self,
        message_id: &str,
        phone: &PhoneNumber,
        message_type: &str,
        content: &str,
        metadata: Option<&serde_json::Value>,
    ) -> Result<(), RepositoryError> {
        Self::log_inbound(self, message_id, phone, message_type, content, metadata).await
    }

    async fn log_outbound(
        &self,
        message_id: &str,
        phone: &PhoneNumber,
        message_type: MessageType,
        content: &str,
    ) -> Result<(), RepositoryError> {
        Self::log_outbound(self, message_id, phone, message_type, content).await
    }

    async fn update_status(
        &self,
        message_id: &str,
        status: MessageStatus,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<StatusUpdateOutcome, RepositoryError> {
        Self::update_status(self, message_id, status, timestamp).await
    }
}

/// Orchestrates one conversation cycle per inbound message.
pub struct ConversationEngine {
    sender: Arc<dyn MessageSender>,
    users: Arc<dyn UserStore>,
    messages: Arc<dyn MessageLog>,
    picker: Arc<dyn ReplyPicker>,
    /// Per-phone-number serialization locks. Entries are never evicted;
    /// the per-entry cost is one mutex.
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl std::fmt::Debug for ConversationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationEngine")
            .field("locked_users", &self.locks.len())
            .finish_non_exhaustive()
    }
}

impl ConversationEngine {
    /// Wire the engine to its collaborators.
    pub fn new(
        sender: Arc<dyn MessageSender>,
        users: Arc<dyn UserStore>,
        messages: Arc<dyn MessageLog>,
        picker: Arc<dyn ReplyPicker>,
    ) -> Self {
        Self {
            sender,
            users,
            messages,
            picker,
            locks: DashMap::new(),
        }
    }

    /// Run the full cycle for one inbound message: look up the user, log
    /// and acknowledge the message, decide the replies, apply the
    /// transition, send, and record activity.
    ///
    /// A redelivered message (same provider message ID) is dropped after
    /// the duplicate is detected, without replying again.
    ///
    /// # Errors
    ///
    /// Returns `EngineError` if the sender phone is malformed or a
    /// required persistence step fails. Provider send failures for
    /// individual replies are logged and do not fail the cycle.
    #[instrument(skip(self, message), fields(message_id = %message.id, from = %message.from))]
    pub async fn handle_message(&self, message: &InboundMessage) -> Result<(), EngineError> {
        let phone = PhoneNumber::parse(&message.from)?;

        let lock = self.lock_for(&phone);
        let _guard = lock.lock().await;

        let user = self.users.find_or_create(&phone).await?;
        let content = extract_content(message);
        let metadata = serde_json::to_value(message).ok();

        match self
            .messages
            .log_inbound(&message.id, &phone, &message.kind, &content, metadata.as_ref())
            .await
        {
            Ok(()) => {}
            Err(RepositoryError::Conflict(_)) => {
                info!("duplicate delivery, skipping");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }

        if let Err(e) = self.sender.mark_as_read(&message.id).await {
            warn!(error = %e, "failed to mark message as read");
        }

        let decision = if user.is_new() {
            script::onboarding()
        } else {
            let view = UserView {
                name: user.name.clone(),
                message_count: user.message_count,
                created_at: user.created_at,
                last_message_at: user.last_message_at,
                status: user.status,
            };
            script::respond(user.step(), &content, &view, Utc::now(), self.picker.as_ref())
        };

        self.dispatch(&phone, decision).await?;

        // Always counted, even when every send failed.
        self.users.record_activity(&phone).await?;

        Ok(())
    }

    /// Apply a delivery receipt from the provider.
    ///
    /// Receipts with an unrecognized status kind or an unknown message ID
    /// are logged and dropped; neither is an error.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Repository` if the update query fails.
    #[instrument(skip(self, receipt), fields(message_id = %receipt.id, status = %receipt.status))]
    pub async fn handle_status_update(&self, receipt: &StatusUpdate) -> Result<(), EngineError> {
        let Some(status) = MessageStatus::parse(&receipt.status) else {
            warn!("unrecognized status kind, dropping receipt");
            return Ok(());
        };

        let timestamp = receipt
            .timestamp
            .as_deref()
            .and_then(|raw| raw.parse::<i64>().ok())
            .and_then(|secs| DateTime::from_timestamp(secs, 0));

        let outcome = self
            .messages
            .update_status(&receipt.id, status, timestamp)
            .await?;

        if outcome == StatusUpdateOutcome::NotFound {
            warn!("receipt for unknown message, dropping");
        }

        Ok(())
    }

    /// Persist the transition, then send each reply in order.
    async fn dispatch(&self, phone: &PhoneNumber, decision: Decision) -> Result<(), EngineError> {
        if let Some(transition) = &decision.transition {
            self.users
                .apply_transition(
                    phone,
                    transition.step,
                    transition.status,
                    transition.name.as_deref(),
                )
                .await?;
        }

        for reply in &decision.replies {
            match self.sender.send_text(phone, reply).await {
                Ok(Some(message_id)) => {
                    if let Err(e) = self
                        .messages
                        .log_outbound(&message_id, phone, MessageType::Text, reply)
                        .await
                    {
                        warn!(error = %e, "failed to log outbound message");
                    }
                }
                // Accepted but no ID assigned; nothing to log against.
                Ok(None) => warn!("provider accepted reply without a message ID"),
                Err(e) => warn!(error = %e, "failed to send reply"),
            }
        }

        Ok(())
    }

    fn lock_for(&self, phone: &PhoneNumber) -> Arc<Mutex<()>> {
        self.locks
            .entry(phone.as_str().to_owned())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
