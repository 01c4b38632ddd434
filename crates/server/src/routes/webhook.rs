//! WhatsApp webhook endpoints.
//!
//! The provider calls `GET /whatsapp/webhook` once to verify the
//! subscription, then posts batched messages and delivery receipts to the
//! same path. The receive handler always answers `200 OK`; anything else
//! makes the provider retry and eventually disable the subscription.

use axum::{
    Json,
    Router,
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
};
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::{error, info, instrument, warn};

use waba_core::PhoneNumber;

use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::whatsapp::{InboundMessage, WebhookPayload};

/// Reply sent best-effort when a message fails processing.
const PROCESSING_APOLOGY: &str =
    "Something went wrong while processing your message. Please try again later.";

/// Create webhook routes.
pub fn router() -> Router<AppState> {
    Router::new().route("/whatsapp/webhook", get(verify).post(receive))
}

/// Subscription verification query parameters.
#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode")]
    mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    challenge: Option<String>,
}

/// Handle the provider's verification handshake.
///
/// Echoes the challenge when the mode is `subscribe` and the token matches
/// the configured value; responds `403 Forbidden` otherwise.
#[instrument(skip(state, params))]
async fn verify(
    State(state): State<AppState>,
    Query(params): Query<VerifyParams>,
) -> Result<String> {
    let expected = state.config().whatsapp.webhook_verify_token.expose_secret();

    match check_verification(&params, expected) {
        Some(challenge) => {
            info!("webhook subscription verified");
            Ok(challenge)
        }
        None => {
            warn!("webhook verification rejected");
            Err(AppError::Forbidden)
        }
    }
}

/// Pure verification check: returns the challenge to echo on success.
fn check_verification(params: &VerifyParams, expected_token: &str) -> Option<String> {
    if params.mode.as_deref() != Some("subscribe") {
        return None;
    }
    let token = params.verify_token.as_deref()?;
    if !constant_time_compare(token, expected_token) {
        return None;
    }
    params.challenge.clone()
}

/// Handle an inbound webhook batch.
///
/// Every message and receipt in the batch is processed independently; a
/// failure on one is reported to the user best-effort and never aborts the
/// batch or the response.
#[instrument(skip(state, body))]
async fn receive(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> impl IntoResponse {
    // Lenient decode: valid JSON that is not a webhook batch is
    // acknowledged and dropped rather than bounced back to the provider.
    let payload: WebhookPayload = match serde_json::from_value(body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "unrecognized webhook payload, acknowledging anyway");
            return "OK";
        }
    };

    for value in payload.values() {
        for message in &value.messages {
            if let Err(e) = state.engine().handle_message(message).await {
                error!(
                    message_id = %message.id,
                    error = %e,
                    "failed to process inbound message"
                );
                sentry::capture_error(&e);
                send_apology(&state, message).await;
            }
        }

        for receipt in &value.statuses {
            if let Err(e) = state.engine().handle_status_update(receipt).await {
                error!(message_id = %receipt.id, error = %e, "failed to apply receipt");
                sentry::capture_error(&e);
            }
        }
    }

    "OK"
}

/// Best-effort failure notice to the sender. Errors here are only logged.
async fn send_apology(state: &AppState, message: &InboundMessage) {
    let Ok(phone) = PhoneNumber::parse(&message.from) else {
        return;
    };
    if let Err(e) = state.whatsapp().send_text(&phone, PROCESSING_APOLOGY).await {
        warn!(error = %e, "failed to send processing apology");
    }
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(mode: Option<&str>, token: Option<&str>, challenge: Option<&str>) -> VerifyParams {
        VerifyParams {
            mode: mode.map(ToString::to_string),
            verify_token: token.map(ToString::to_string),
            challenge: challenge.map(ToString::to_string),
        }
    }

    #[test]
    fn test_verification_success_echoes_challenge() {
        let result = check_verification(
            &params(Some("subscribe"), Some("secret-token"), Some("12345")),
            "secret-token",
        );
        assert_eq!(result.as_deref(), Some("12345"));
    }

    #[test]
    fn test_verification_wrong_token() {
        let result = check_verification(
            &params(Some("subscribe"), Some("wrong"), Some("12345")),
            "secret-token",
        );
        assert!(result.is_none());
    }

    #[test]
    fn test_verification_wrong_mode() {
        let result = check_verification(
            &params(Some("unsubscribe"), Some("secret-token"), Some("12345")),
            "secret-token",
        );
        assert!(result.is_none());
    }

    #[test]
    fn test_verification_missing_params() {
        assert!(check_verification(&params(None, None, None), "secret-token").is_none());
        assert!(
            check_verification(&params(Some("subscribe"), None, Some("1")), "secret-token")
                .is_none()
        );
        assert!(
            check_verification(
                &params(Some("subscribe"), Some("secret-token"), None),
                "secret-token"
            )
            .is_none()
        );
    }

    #[test]
    fn test_constant_time_compare_equal() {
        assert!(constant_time_compare("hello", "hello"));
        assert!(constant_time_compare("", ""));
    }

    #[test]
    fn test_constant_time_compare_not_equal() {
        assert!(!constant_time_compare("hello", "world"));
        assert!(!constant_time_compare("hello", "hell"));
        assert!(!constant_time_compare("hello", "helloo"));
    }
}
