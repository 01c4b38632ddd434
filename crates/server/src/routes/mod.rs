//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                  - Liveness check
//! GET  /health/ready            - Readiness check (database ping)
//!
//! # Webhook (called by the provider)
//! GET  /whatsapp/webhook        - Subscription verification handshake
//! POST /whatsapp/webhook        - Inbound messages and delivery receipts
//!
//! # Operator API
//! POST /api/whatsapp/send       - Send a text/image/document message
//! POST /api/whatsapp/template   - Send a pre-approved template message
//! GET  /api/whatsapp/stats      - Aggregate user and message counters
//! GET  /api/whatsapp/stats/{phone} - Per-user profile and counters
//! GET  /api/whatsapp/test       - Service descriptor for smoke tests
//! ```

use axum::Router;

use crate::state::AppState;

pub mod api;
pub mod webhook;

/// Build the full application router.
pub fn routes() -> Router<AppState> {
    Router::new().merge(webhook::router()).merge(api::router())
}
