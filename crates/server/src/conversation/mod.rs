//! Conversation state machine.
//!
//! This module owns each user's position in the scripted dialogue and
//! decides the replies for every inbound message:
//!
//! - [`content`] - extracts display text from any inbound payload
//! - [`script`] - the pure decision layer: step + text in, replies +
//!   transition out
//! - [`smart_reply`] - keyword fallback used when no command matches
//! - [`engine`] - orchestration: persistence, sending, activity tracking,
//!   per-user serialization

pub mod content;
pub mod engine;
pub mod script;
pub mod smart_reply;

pub use content::extract_content;
pub use engine::{ConversationEngine, EngineError, MessageLog, MessageSender, UserStore};
pub use script::{Decision, Transition, UserView};
pub use smart_reply::{RandomPicker, ReplyPicker};
