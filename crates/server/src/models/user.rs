//! Chatbot user domain type.

use chrono::{DateTime, Utc};
use serde_json::Value;

use waba_core::{ConversationStep, PhoneNumber, UserStatus};

/// A chatbot user, one per phone number (domain type).
#[derive(Debug, Clone)]
pub struct WhatsAppUser {
    /// Database row ID.
    pub id: i64,
    /// The user's phone number (unique).
    pub phone_number: PhoneNumber,
    /// Display name captured during onboarding, stored verbatim.
    pub name: Option<String>,
    /// Lifecycle status.
    pub status: UserStatus,
    /// Raw persisted step value. Unknown values are tolerated and
    /// dispatched to the conversation handler.
    pub current_step: String,
    /// Open-ended scratch storage shared across steps.
    pub session_data: Option<Value>,
    /// Number of inbound messages processed for this user.
    pub message_count: i32,
    /// When the first inbound message arrived.
    pub first_message_at: Option<DateTime<Utc>>,
    /// When the most recent inbound message arrived.
    pub last_message_at: Option<DateTime<Utc>>,
    /// When the row was created.
    pub created_at: DateTime<Utc>,
    /// When the row was last updated.
    pub updated_at: DateTime<Utc>,
}

impl WhatsAppUser {
    /// Whether this user should be routed to onboarding.
    ///
    /// Kept as the exact `status == new OR message_count == 0` check the
    /// dialogue has always used. A directly-seeded active user with zero
    /// messages is therefore re-onboarded; see DESIGN.md before changing.
    #[must_use]
    pub fn is_new(&self) -> bool {
        self.status == UserStatus::New || self.message_count == 0
    }

    /// The parsed step, or `None` for unknown/legacy values.
    #[must_use]
    pub fn step(&self) -> Option<ConversationStep> {
        ConversationStep::parse(&self.current_step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(status: UserStatus, message_count: i32) -> WhatsAppUser {
        WhatsAppUser {
            id: 1,
            phone_number: PhoneNumber::parse("2010000000").expect("valid phone"),
            name: None,
            status,
            current_step: "conversation".to_string(),
            session_data: None,
            message_count,
            first_message_at: None,
            last_message_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_is_new_for_new_status() {
        assert!(user(UserStatus::New, 5).is_new());
    }

    #[test]
    fn test_is_new_for_zero_messages() {
        // The OR-condition means an active user with zero messages is
        // still treated as new.
        assert!(user(UserStatus::Active, 0).is_new());
    }

    #[test]
    fn test_not_new_once_active_with_messages() {
        assert!(!user(UserStatus::Active, 1).is_new());
    }

    #[test]
    fn test_unknown_step_parses_to_none() {
        let mut u = user(UserStatus::Active, 3);
        u.current_step = "order_details".to_string();
        assert!(u.step().is_none());
    }
}
