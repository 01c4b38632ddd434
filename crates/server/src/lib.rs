//! Waba server library.
//!
//! This crate provides the webhook service functionality as a library,
//! allowing it to be tested and reused.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod conversation;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod state;
pub mod whatsapp;
