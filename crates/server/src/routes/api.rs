//! Operator API for manual sends and statistics.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, instrument};

use waba_core::{MessageDirection, MessageType, PhoneNumber, UserStatus};

use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::whatsapp::SendMessageResponse;

/// Create operator API routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/whatsapp/send", post(send_message))
        .route("/api/whatsapp/template", post(send_template))
        .route("/api/whatsapp/stats", get(stats))
        .route("/api/whatsapp/stats/{phone}", get(user_stats))
        .route("/api/whatsapp/test", get(test_descriptor))
}

/// Manual send request body.
#[derive(Debug, Deserialize)]
struct SendRequest {
    phone: String,
    #[serde(rename = "type", default = "default_message_kind")]
    kind: String,
    message: Option<String>,
    link: Option<String>,
    filename: Option<String>,
    #[serde(default)]
    caption: String,
}

fn default_message_kind() -> String {
    "text".to_string()
}

/// Manual template send request body.
#[derive(Debug, Deserialize)]
struct TemplateRequest {
    phone: String,
    template: String,
    #[serde(default = "default_language")]
    language_code: String,
    #[serde(default)]
    parameters: Vec<String>,
}

fn default_language() -> String {
    "en".to_string()
}

/// Send a message on behalf of an operator.
///
/// Validates the per-type required fields, then logs the outbound row when
/// the provider assigns a message ID. A response without one is a failure.
#[instrument(skip(state, request), fields(kind = %request.kind))]
async fn send_message(
    State(state): State<AppState>,
    Json(request): Json<SendRequest>,
) -> Result<Json<Value>> {
    let phone = parse_phone(&request.phone)?;

    let (response, message_type, content) = match request.kind.as_str() {
        "text" => {
            let body = require(request.message.as_deref(), "message")?;
            let response = state.whatsapp().send_text(&phone, body).await?;
            (response, MessageType::Text, body.to_string())
        }
        "image" => {
            let link = require(request.link.as_deref(), "link")?;
            let response = state
                .whatsapp()
                .send_image(&phone, link, &request.caption)
                .await?;
            (response, MessageType::Image, link.to_string())
        }
        "document" => {
            let link = require(request.link.as_deref(), "link")?;
            let filename = require(request.filename.as_deref(), "filename")?;
            let response = state
                .whatsapp()
                .send_document(&phone, link, filename, &request.caption)
                .await?;
            (response, MessageType::Document, filename.to_string())
        }
        other => {
            return Err(AppError::BadRequest(format!(
                "unsupported message type: {other}"
            )));
        }
    };

    let message_id = finish_send(&state, &phone, &response, message_type, &content).await?;

    info!(to = %phone, %message_id, "operator message sent");

    Ok(Json(json!({
        "success": true,
        "data": { "message_id": message_id }
    })))
}

/// Send a pre-approved template message on behalf of an operator.
#[instrument(skip(state, request), fields(template = %request.template))]
async fn send_template(
    State(state): State<AppState>,
    Json(request): Json<TemplateRequest>,
) -> Result<Json<Value>> {
    let phone = parse_phone(&request.phone)?;

    let response = state
        .whatsapp()
        .send_template(
            &phone,
            &request.template,
            &request.language_code,
            &request.parameters,
        )
        .await?;

    let message_id = finish_send(
        &state,
        &phone,
        &response,
        MessageType::Template,
        &request.template,
    )
    .await?;

    info!(to = %phone, %message_id, "operator template sent");

    Ok(Json(json!({
        "success": true,
        "data": { "message_id": message_id }
    })))
}

/// Aggregate user and message counters.
#[instrument(skip(state))]
async fn stats(State(state): State<AppState>) -> Result<Json<Value>> {
    let users = state.users();
    let messages = state.messages();

    Ok(Json(json!({
        "success": true,
        "data": {
            "users": {
                "total": users.count_total().await?,
                "new": users.count_by_status(UserStatus::New).await?,
                "active": users.count_by_status(UserStatus::Active).await?,
                "blocked": users.count_by_status(UserStatus::Blocked).await?,
            },
            "messages": {
                "total": messages.count_total().await?,
                "today": messages.count_today().await?,
                "inbound": messages.count_by_direction(MessageDirection::Inbound).await?,
                "outbound": messages.count_by_direction(MessageDirection::Outbound).await?,
            },
        }
    })))
}

/// Profile and message counters for one user.
#[instrument(skip(state))]
async fn user_stats(
    State(state): State<AppState>,
    Path(phone): Path<String>,
) -> Result<Json<Value>> {
    let phone = parse_phone(&phone)?;
    let user = require_found(
        state.users().find_by_phone(&phone).await?,
        &format!("user {phone}"),
    )?;

    let messages = state.messages();
    let inbound = messages
        .count_for_user(&phone, Some(MessageDirection::Inbound))
        .await?;
    let outbound = messages
        .count_for_user(&phone, Some(MessageDirection::Outbound))
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "phone": user.phone_number.as_str(),
            "name": user.name,
            "status": user.status.as_str(),
            "current_step": user.current_step,
            "message_count": user.message_count,
            "first_message_at": user.first_message_at,
            "last_message_at": user.last_message_at,
            "messages": { "inbound": inbound, "outbound": outbound },
        }
    })))
}

/// Static service descriptor, for smoke tests and uptime checks.
#[allow(clippy::unused_async)]
async fn test_descriptor() -> Json<Value> {
    Json(json!({
        "success": true,
        "service": "waba-server",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "GET /whatsapp/webhook",
            "POST /whatsapp/webhook",
            "POST /api/whatsapp/send",
            "POST /api/whatsapp/template",
            "GET /api/whatsapp/stats",
            "GET /api/whatsapp/stats/{phone}",
        ],
    }))
}

/// Log the outbound row; a provider response without a message ID is a
/// hard failure for operator sends.
async fn finish_send(
    state: &AppState,
    phone: &PhoneNumber,
    response: &SendMessageResponse,
    message_type: MessageType,
    content: &str,
) -> Result<String> {
    let message_id = response
        .message_id()
        .ok_or_else(|| AppError::Internal("provider returned no message ID".to_string()))?;

    state
        .messages()
        .log_outbound(message_id, phone, message_type, content)
        .await?;

    Ok(message_id.to_string())
}

fn parse_phone(raw: &str) -> Result<PhoneNumber> {
    PhoneNumber::parse(raw).map_err(|e| AppError::BadRequest(e.to_string()))
}

fn require<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(AppError::BadRequest(format!("missing field: {field}"))),
    }
}

fn require_found<T>(value: Option<T>, what: &str) -> Result<T> {
    value.ok_or_else(|| AppError::NotFound(what.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_present() {
        assert_eq!(require(Some("hello"), "message").expect("present"), "hello");
    }

    #[test]
    fn test_require_missing_or_blank() {
        assert!(require(None, "message").is_err());
        assert!(require(Some("   "), "message").is_err());
    }

    #[test]
    fn test_send_request_defaults_to_text() {
        let request: SendRequest =
            serde_json::from_str(r#"{"phone": "201000000001", "message": "hi"}"#)
                .expect("decodes");
        assert_eq!(request.kind, "text");
        assert_eq!(request.message.as_deref(), Some("hi"));
    }

    #[test]
    fn test_require_found_maps_none_to_not_found() {
        let missing: Option<i64> = None;
        let err = require_found(missing, "user 201000000001").expect_err("not found");
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(err.to_string(), "Not found: user 201000000001");

        assert_eq!(require_found(Some(7), "user").expect("present"), 7);
    }

    #[test]
    fn test_template_request_defaults() {
        let request: TemplateRequest =
            serde_json::from_str(r#"{"phone": "201000000001", "template": "welcome"}"#)
                .expect("decodes");
        assert_eq!(request.language_code, "en");
        assert!(request.parameters.is_empty());
    }
}
