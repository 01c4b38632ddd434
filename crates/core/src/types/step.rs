//! Conversation step tracking.

use core::fmt;

use serde::{Deserialize, Serialize};

/// A user's position in the scripted dialogue, persisted between messages.
///
/// The step is stored as a plain string in the database so that legacy or
/// unknown values never fail to load; [`ConversationStep::parse`] returns
/// `None` for anything unrecognized and the dispatcher treats that as
/// [`ConversationStep::Conversation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStep {
    /// Initial marker set when the user row is created, before onboarding.
    Welcome,
    /// Waiting for any reply after the welcome message.
    AwaitingResponse,
    /// Expecting a name string.
    AwaitingName,
    /// Steady-state command dispatch.
    Conversation,
    /// Numbered-menu selection mode (single-shot).
    Menu,
}

impl ConversationStep {
    /// Parse a persisted step value. Returns `None` for unknown values.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "welcome" => Some(Self::Welcome),
            "awaiting_response" => Some(Self::AwaitingResponse),
            "awaiting_name" => Some(Self::AwaitingName),
            "conversation" => Some(Self::Conversation),
            "menu" => Some(Self::Menu),
            _ => None,
        }
    }

    /// The string form stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Welcome => "welcome",
            Self::AwaitingResponse => "awaiting_response",
            Self::AwaitingName => "awaiting_name",
            Self::Conversation => "conversation",
            Self::Menu => "menu",
        }
    }
}

impl fmt::Display for ConversationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_steps() {
        assert_eq!(
            ConversationStep::parse("welcome"),
            Some(ConversationStep::Welcome)
        );
        assert_eq!(
            ConversationStep::parse("awaiting_response"),
            Some(ConversationStep::AwaitingResponse)
        );
        assert_eq!(
            ConversationStep::parse("awaiting_name"),
            Some(ConversationStep::AwaitingName)
        );
        assert_eq!(
            ConversationStep::parse("conversation"),
            Some(ConversationStep::Conversation)
        );
        assert_eq!(ConversationStep::parse("menu"), Some(ConversationStep::Menu));
    }

    #[test]
    fn test_parse_unknown_step() {
        assert_eq!(ConversationStep::parse("order_details"), None);
        assert_eq!(ConversationStep::parse(""), None);
    }

    #[test]
    fn test_round_trip() {
        for step in [
            ConversationStep::Welcome,
            ConversationStep::AwaitingResponse,
            ConversationStep::AwaitingName,
            ConversationStep::Conversation,
            ConversationStep::Menu,
        ] {
            assert_eq!(ConversationStep::parse(step.as_str()), Some(step));
        }
    }
}
