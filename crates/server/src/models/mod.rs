//! Domain types for users and the message log.
//!
//! These types represent validated domain objects separate from database
//! row types.

pub mod message;
pub mod user;

pub use message::WhatsAppMessage;
pub use user::WhatsAppUser;
