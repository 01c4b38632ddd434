//! Shared domain types.

mod phone;
mod status;
mod step;

pub use phone::{PhoneNumber, PhoneNumberError};
pub use status::{MessageDirection, MessageStatus, MessageType, UserStatus};
pub use step::ConversationStep;
