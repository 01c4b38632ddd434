//! Waba Core - Shared types library.
//!
//! This crate provides common types used across all Waba components:
//! - `server` - Webhook service and conversation engine
//! - `cli` - Command-line tools for migrations, manual sends and statistics
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Phone number newtype, conversation steps and status enums

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
