//! Message log repository.
//!
//! The log is append-only: rows are written once when a message passes
//! through, and only the delivery-status fields are updated afterwards by
//! provider receipts.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use waba_core::{MessageDirection, MessageStatus, MessageType, PhoneNumber};

use super::RepositoryError;
use crate::models::WhatsAppMessage;

const MESSAGE_COLUMNS: &str = "id, message_id, phone_number, direction, type, content, \
     metadata, status, sent_at, delivered_at, read_at, created_at";

/// Outcome of a delivery-receipt status update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusUpdateOutcome {
    /// A matching row was updated.
    Updated,
    /// No row with that message ID exists; the receipt is dropped.
    NotFound,
}

/// Raw database row for a logged message.
#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: i64,
    message_id: String,
    phone_number: String,
    direction: String,
    #[sqlx(rename = "type")]
    message_type: String,
    content: String,
    metadata: Option<serde_json::Value>,
    status: String,
    sent_at: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
    read_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<MessageRow> for WhatsAppMessage {
    type Error = RepositoryError;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        let direction = match row.direction.as_str() {
            "inbound" => MessageDirection::Inbound,
            "outbound" => MessageDirection::Outbound,
            other => {
                return Err(RepositoryError::DataCorruption(format!(
                    "invalid message direction in database: {other}"
                )));
            }
        };
        let status = MessageStatus::parse(&row.status).ok_or_else(|| {
            RepositoryError::DataCorruption(format!(
                "invalid message status in database: {}",
                row.status
            ))
        })?;

        Ok(Self {
            id: row.id,
            message_id: row.message_id,
            phone_number: row.phone_number,
            direction,
            message_type: row.message_type,
            content: row.content,
            metadata: row.metadata,
            status,
            sent_at: row.sent_at,
            delivered_at: row.delivered_at,
            read_at: row.read_at,
            created_at: row.created_at,
        })
    }
}

/// Repository for message log operations.
#[derive(Clone)]
pub struct MessageRepository {
    pool: PgPool,
}

impl MessageRepository {
    /// Create a new message repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record an inbound message with its raw provider payload.
    ///
    /// The wire type is stored as received, so unknown provider types
    /// (stickers, reactions) still get logged.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the message ID was already
    /// logged (provider redelivery).
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn log_inbound(
        &self,
        message_id: &str,
        phone: &PhoneNumber,
        message_type: &str,
        content: &str,
        metadata: Option<&serde_json::Value>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO whatsapp_messages \
                 (message_id, phone_number, direction, type, content, metadata, status) \
             VALUES ($1, $2, 'inbound', $3, $4, $5, 'received')",
        )
        .bind(message_id)
        .bind(phone.as_str())
        .bind(message_type)
        .bind(content)
        .bind(metadata)
        .execute(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        Ok(())
    }

    /// Record an outbound message accepted by the provider.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the message ID was already
    /// logged.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn log_outbound(
        &self,
        message_id: &str,
        phone: &PhoneNumber,
        message_type: MessageType,
        content: &str,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO whatsapp_messages \
                 (message_id, phone_number, direction, type, content, status, sent_at) \
             VALUES ($1, $2, 'outbound', $3, $4, 'sent', NOW())",
        )
        .bind(message_id)
        .bind(phone.as_str())
        .bind(message_type.as_str())
        .bind(content)
        .execute(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        Ok(())
    }

    /// Apply a delivery receipt to a previously logged message.
    ///
    /// Sets `delivered_at`/`read_at` for the matching receipt kinds, using
    /// the provider timestamp when present and `NOW()` otherwise. A receipt
    /// for an unknown message ID is reported as
    /// [`StatusUpdateOutcome::NotFound`], never an error.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update_status(
        &self,
        message_id: &str,
        status: MessageStatus,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<StatusUpdateOutcome, RepositoryError> {
        let result = sqlx::query(
            "UPDATE whatsapp_messages \
             SET status = $2, \
                 delivered_at = CASE WHEN $2 = 'delivered' \
                     THEN COALESCE($3, NOW()) ELSE delivered_at END, \
                 read_at = CASE WHEN $2 = 'read' \
                     THEN COALESCE($3, NOW()) ELSE read_at END \
             WHERE message_id = $1",
        )
        .bind(message_id)
        .bind(status.as_str())
        .bind(timestamp)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(StatusUpdateOutcome::NotFound);
        }

        Ok(StatusUpdateOutcome::Updated)
    }

    /// Total number of logged messages.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_total(&self) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM whatsapp_messages")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Number of messages logged today (server date).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_today(&self) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM whatsapp_messages WHERE created_at::date = CURRENT_DATE",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Number of messages in the given direction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_by_direction(
        &self,
        direction: MessageDirection,
    ) -> Result<i64, RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM whatsapp_messages WHERE direction = $1")
                .bind(direction.as_str())
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    /// Number of messages for one phone number, optionally filtered by
    /// direction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_for_user(
        &self,
        phone: &PhoneNumber,
        direction: Option<MessageDirection>,
    ) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM whatsapp_messages \
             WHERE phone_number = $1 AND ($2::text IS NULL OR direction = $2)",
        )
        .bind(phone.as_str())
        .bind(direction.map(MessageDirection::as_str))
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// The most recent messages for one phone number, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored row is invalid.
    pub async fn recent_for_user(
        &self,
        phone: &PhoneNumber,
        limit: i64,
    ) -> Result<Vec<WhatsAppMessage>, RepositoryError> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM whatsapp_messages \
             WHERE phone_number = $1 \
             ORDER BY created_at DESC \
             LIMIT $2"
        );
        let rows: Vec<MessageRow> = sqlx::query_as(&sql)
            .bind(phone.as_str())
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(WhatsAppMessage::try_from).collect()
    }
}

/// Map a unique violation on `message_id` to `Conflict`.
fn map_unique_violation(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict("message already logged".to_owned());
    }
    RepositoryError::Database(e)
}
