//! Integration test support for Waba.
//!
//! Provides in-memory implementations of the conversation engine's
//! collaborators so full conversation flows can be exercised without a
//! database or a live Cloud API account.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p waba-integration-tests
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use waba_core::{ConversationStep, MessageStatus, MessageType, PhoneNumber, UserStatus};
use waba_server::conversation::smart_reply::ReplyPicker;
use waba_server::conversation::{ConversationEngine, MessageLog, MessageSender, UserStore};
use waba_server::db::RepositoryError;
use waba_server::db::messages::StatusUpdateOutcome;
use waba_server::models::WhatsAppUser;
use waba_server::whatsapp::{InboundMessage, StatusUpdate, TextContent, WhatsAppError};

/// In-memory user store with the same semantics as the Postgres
/// repository: new users start as `new`/`welcome` with a zero counter.
#[derive(Default)]
pub struct InMemoryUsers {
    users: Mutex<HashMap<String, WhatsAppUser>>,
    next_id: AtomicI64,
}

impl InMemoryUsers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a pre-existing user, for flows that start mid-conversation.
    pub fn seed(&self, user: WhatsAppUser) {
        self.users
            .lock()
            .expect("lock")
            .insert(user.phone_number.as_str().to_owned(), user);
    }

    /// Snapshot of one user's current row.
    #[must_use]
    pub fn get(&self, phone: &str) -> Option<WhatsAppUser> {
        self.users.lock().expect("lock").get(phone).cloned()
    }

    /// Merge keys into the user's session scratch storage, with the same
    /// top-level-key semantics as Postgres `jsonb ||`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub fn merge_session_data(
        &self,
        phone: &PhoneNumber,
        data: &serde_json::Value,
    ) -> Result<(), RepositoryError> {
        let mut users = self.users.lock().expect("lock");
        let user = users
            .get_mut(phone.as_str())
            .ok_or(RepositoryError::NotFound)?;
        let mut merged = match user.session_data.take() {
            Some(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        };
        if let serde_json::Value::Object(incoming) = data {
            for (key, value) in incoming {
                merged.insert(key.clone(), value.clone());
            }
        }
        user.session_data = Some(serde_json::Value::Object(merged));
        user.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl UserStore for InMemoryUsers {
    async fn find_or_create(&self, phone: &PhoneNumber) -> Result<WhatsAppUser, RepositoryError> {
        let mut users = self.users.lock().expect("lock");
        if let Some(user) = users.get(phone.as_str()) {
            return Ok(user.clone());
        }

        let now = Utc::now();
        let user = WhatsAppUser {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            phone_number: phone.clone(),
            name: None,
            status: UserStatus::New,
            current_step: "welcome".to_owned(),
            session_data: None,
            message_count: 0,
            first_message_at: Some(now),
            last_message_at: Some(now),
            created_at: now,
            updated_at: now,
        };
        users.insert(phone.as_str().to_owned(), user.clone());
        Ok(user)
    }

    async fn apply_transition(
        &self,
        phone: &PhoneNumber,
        step: ConversationStep,
        status: Option<UserStatus>,
        name: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let mut users = self.users.lock().expect("lock");
        let user = users
            .get_mut(phone.as_str())
            .ok_or(RepositoryError::NotFound)?;
        user.current_step = step.as_str().to_owned();
        if let Some(status) = status {
            user.status = status;
        }
        if let Some(name) = name {
            user.name = Some(name.to_owned());
        }
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn record_activity(&self, phone: &PhoneNumber) -> Result<(), RepositoryError> {
        let mut users = self.users.lock().expect("lock");
        let user = users
            .get_mut(phone.as_str())
            .ok_or(RepositoryError::NotFound)?;
        user.message_count += 1;
        let now = Utc::now();
        user.last_message_at = Some(now);
        user.updated_at = now;
        Ok(())
    }
}

/// One row in the in-memory message log.
#[derive(Debug, Clone)]
pub struct LoggedMessage {
    pub message_id: String,
    pub phone: String,
    pub direction: &'static str,
    pub message_type: String,
    pub content: String,
    pub status: MessageStatus,
    pub metadata: Option<serde_json::Value>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub read_at: Option<DateTime<Utc>>,
}

/// In-memory message log that deduplicates on the provider message ID.
#[derive(Default)]
pub struct InMemoryMessages {
    rows: Mutex<Vec<LoggedMessage>>,
}

impl InMemoryMessages {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All rows logged so far, in insertion order.
    #[must_use]
    pub fn rows(&self) -> Vec<LoggedMessage> {
        self.rows.lock().expect("lock").clone()
    }

    /// Rows for one direction.
    #[must_use]
    pub fn rows_in(&self, direction: &str) -> Vec<LoggedMessage> {
        self.rows()
            .into_iter()
            .filter(|row| row.direction == direction)
            .collect()
    }
}

#[async_trait]
impl MessageLog for InMemoryMessages {
    async fn log_inbound(
        &self,
        message_id: &str,
        phone: &PhoneNumber,
        message_type: &str,
        content: &str,
        metadata: Option<&serde_json::Value>,
    ) -> Result<(), RepositoryError> {
        let mut rows = self.rows.lock().expect("lock");
        if rows.iter().any(|row| row.message_id == message_id) {
            return Err(RepositoryError::Conflict("message already logged".to_owned()));
        }
        rows.push(LoggedMessage {
            message_id: message_id.to_owned(),
            phone: phone.as_str().to_owned(),
            direction: "inbound",
            message_type: message_type.to_owned(),
            content: content.to_owned(),
            status: MessageStatus::Received,
            metadata: metadata.cloned(),
            delivered_at: None,
            read_at: None,
        });
        Ok(())
    }

    async fn log_outbound(
        &self,
        message_id: &str,
        phone: &PhoneNumber,
        message_type: MessageType,
        content: &str,
    ) -> Result<(), RepositoryError> {
        let mut rows = self.rows.lock().expect("lock");
        if rows.iter().any(|row| row.message_id == message_id) {
            return Err(RepositoryError::Conflict("message already logged".to_owned()));
        }
        rows.push(LoggedMessage {
            message_id: message_id.to_owned(),
            phone: phone.as_str().to_owned(),
            direction: "outbound",
            message_type: message_type.as_str().to_owned(),
            content: content.to_owned(),
            status: MessageStatus::Sent,
            metadata: None,
            delivered_at: None,
            read_at: None,
        });
        Ok(())
    }

    async fn update_status(
        &self,
        message_id: &str,
        status: MessageStatus,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<StatusUpdateOutcome, RepositoryError> {
        let mut rows = self.rows.lock().expect("lock");
        let Some(row) = rows.iter_mut().find(|row| row.message_id == message_id) else {
            return Ok(StatusUpdateOutcome::NotFound);
        };
        row.status = status;
        let at = timestamp.unwrap_or_else(Utc::now);
        match status {
            MessageStatus::Delivered => row.delivered_at = Some(at),
            MessageStatus::Read => row.read_at = Some(at),
            _ => {}
        }
        Ok(StatusUpdateOutcome::Updated)
    }
}

/// Recording sender; can simulate provider responses without a message ID
/// (soft failure) or transport failures.
pub struct RecordingSender {
    sent: Mutex<Vec<(String, String)>>,
    read_receipts: Mutex<Vec<String>>,
    assign_ids: bool,
    fail_sends: bool,
}

impl RecordingSender {
    #[must_use]
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            read_receipts: Mutex::new(Vec::new()),
            assign_ids: true,
            fail_sends: false,
        }
    }

    /// Provider accepts sends but assigns no message ID.
    #[must_use]
    pub fn without_ids() -> Self {
        Self {
            assign_ids: false,
            ..Self::new()
        }
    }

    /// Provider rejects every send.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail_sends: true,
            ..Self::new()
        }
    }

    /// Every (recipient, body) pair sent so far.
    #[must_use]
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().expect("lock").clone()
    }

    /// Bodies sent so far.
    #[must_use]
    pub fn bodies(&self) -> Vec<String> {
        self.sent().into_iter().map(|(_, body)| body).collect()
    }

    /// Message IDs marked as read so far.
    #[must_use]
    pub fn read_receipts(&self) -> Vec<String> {
        self.read_receipts.lock().expect("lock").clone()
    }
}

impl Default for RecordingSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageSender for RecordingSender {
    async fn send_text(
        &self,
        to: &PhoneNumber,
        body: &str,
    ) -> Result<Option<String>, WhatsAppError> {
        if self.fail_sends {
            return Err(WhatsAppError::Request("connection refused".to_owned()));
        }
        let mut sent = self.sent.lock().expect("lock");
        sent.push((to.as_str().to_owned(), body.to_owned()));
        if self.assign_ids {
            Ok(Some(format!("wamid.OUT{}", sent.len())))
        } else {
            Ok(None)
        }
    }

    async fn mark_as_read(&self, message_id: &str) -> Result<(), WhatsAppError> {
        self.read_receipts
            .lock()
            .expect("lock")
            .push(message_id.to_owned());
        Ok(())
    }
}

/// Picker that always selects a fixed index, making the generic smart
/// reply deterministic.
pub struct FixedPicker(pub usize);

impl ReplyPicker for FixedPicker {
    fn pick(&self, len: usize) -> usize {
        self.0 % len
    }
}

/// Everything a conversation-flow test needs, wired together.
pub struct TestHarness {
    pub engine: ConversationEngine,
    pub sender: Arc<RecordingSender>,
    pub users: Arc<InMemoryUsers>,
    pub messages: Arc<InMemoryMessages>,
}

impl TestHarness {
    #[must_use]
    pub fn new() -> Self {
        Self::with_sender(RecordingSender::new())
    }

    #[must_use]
    pub fn with_sender(sender: RecordingSender) -> Self {
        let sender = Arc::new(sender);
        let users = Arc::new(InMemoryUsers::new());
        let messages = Arc::new(InMemoryMessages::new());
        let engine = ConversationEngine::new(
            Arc::clone(&sender) as Arc<dyn MessageSender>,
            Arc::clone(&users) as Arc<dyn UserStore>,
            Arc::clone(&messages) as Arc<dyn MessageLog>,
            Arc::new(FixedPicker(0)),
        );
        Self {
            engine,
            sender,
            users,
            messages,
        }
    }

    /// Seed a user already past onboarding, in the given step.
    pub fn seed_active_user(&self, phone: &str, name: Option<&str>, step: &str) {
        let now = Utc::now();
        self.users.seed(WhatsAppUser {
            id: 999,
            phone_number: PhoneNumber::parse(phone).expect("valid phone"),
            name: name.map(ToOwned::to_owned),
            status: UserStatus::Active,
            current_step: step.to_owned(),
            session_data: None,
            message_count: 3,
            first_message_at: Some(now),
            last_message_at: Some(now),
            created_at: now,
            updated_at: now,
        });
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Build an inbound text message payload.
#[must_use]
pub fn inbound_text(from: &str, id: &str, body: &str) -> InboundMessage {
    InboundMessage {
        from: from.to_owned(),
        id: id.to_owned(),
        timestamp: "1724832000".to_owned(),
        kind: "text".to_owned(),
        text: Some(TextContent {
            body: body.to_owned(),
        }),
        image: None,
        document: None,
    }
}

/// Build a delivery receipt payload.
#[must_use]
pub fn receipt(id: &str, status: &str) -> StatusUpdate {
    StatusUpdate {
        id: id.to_owned(),
        status: status.to_owned(),
        timestamp: Some("1724832060".to_owned()),
        recipient_id: Some("201000000001".to_owned()),
    }
}
