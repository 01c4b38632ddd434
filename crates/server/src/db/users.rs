//! User repository for database operations.
//!
//! Provides database access for chatbot users. Queries are runtime-checked
//! (`query_as`/`query_scalar`) so the crate builds without a live database.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use waba_core::{ConversationStep, PhoneNumber, UserStatus};

use super::RepositoryError;
use crate::models::WhatsAppUser;

const USER_COLUMNS: &str = "id, phone_number, name, status, current_step, session_data, \
     message_count, first_message_at, last_message_at, created_at, updated_at";

/// Raw database row for a user.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i64,
    phone_number: String,
    name: Option<String>,
    status: String,
    current_step: String,
    session_data: Option<serde_json::Value>,
    message_count: i32,
    first_message_at: Option<DateTime<Utc>>,
    last_message_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for WhatsAppUser {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let phone_number = PhoneNumber::parse(&row.phone_number).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid phone number in database: {e}"))
        })?;
        let status = UserStatus::parse(&row.status).ok_or_else(|| {
            RepositoryError::DataCorruption(format!("invalid user status in database: {}", row.status))
        })?;

        Ok(Self {
            id: row.id,
            phone_number,
            name: row.name,
            status,
            current_step: row.current_step,
            session_data: row.session_data,
            message_count: row.message_count,
            first_message_at: row.first_message_at,
            last_message_at: row.last_message_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for user database operations.
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by phone number.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored row is invalid.
    pub async fn find_by_phone(
        &self,
        phone: &PhoneNumber,
    ) -> Result<Option<WhatsAppUser>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM whatsapp_users WHERE phone_number = $1");
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(phone.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(WhatsAppUser::try_from).transpose()
    }

    /// Get an existing user or create a fresh one in the `new`/`welcome`
    /// state with both activity timestamps set.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored row is invalid.
    pub async fn find_or_create(
        &self,
        phone: &PhoneNumber,
    ) -> Result<WhatsAppUser, RepositoryError> {
        let sql = format!(
            "INSERT INTO whatsapp_users \
                 (phone_number, status, current_step, first_message_at, last_message_at) \
             VALUES ($1, 'new', 'welcome', NOW(), NOW()) \
             ON CONFLICT (phone_number) DO NOTHING \
             RETURNING {USER_COLUMNS}"
        );
        let inserted: Option<UserRow> = sqlx::query_as(&sql)
            .bind(phone.as_str())
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = inserted {
            return row.try_into();
        }

        // Row already existed; the conflict arm returns nothing.
        self.find_by_phone(phone)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Apply a conversation transition: always sets the step, optionally
    /// the status and the captured name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn apply_transition(
        &self,
        phone: &PhoneNumber,
        step: ConversationStep,
        status: Option<UserStatus>,
        name: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE whatsapp_users \
             SET current_step = $2, \
                 status = COALESCE($3, status), \
                 name = COALESCE($4, name), \
                 updated_at = NOW() \
             WHERE phone_number = $1",
        )
        .bind(phone.as_str())
        .bind(step.as_str())
        .bind(status.map(UserStatus::as_str))
        .bind(name)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Record inbound activity: bump the message counter and the
    /// last-activity timestamp.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn record_activity(&self, phone: &PhoneNumber) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE whatsapp_users \
             SET message_count = message_count + 1, \
                 last_message_at = NOW(), \
                 updated_at = NOW() \
             WHERE phone_number = $1",
        )
        .bind(phone.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Merge keys into the user's session scratch storage.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn merge_session_data(
        &self,
        phone: &PhoneNumber,
        data: &serde_json::Value,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE whatsapp_users \
             SET session_data = COALESCE(session_data, '{}'::jsonb) || $2, \
                 updated_at = NOW() \
             WHERE phone_number = $1",
        )
        .bind(phone.as_str())
        .bind(data)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Total number of users.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_total(&self) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM whatsapp_users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Number of users with the given status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_by_status(&self, status: UserStatus) -> Result<i64, RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM whatsapp_users WHERE status = $1")
                .bind(status.as_str())
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    /// Top users ordered by message count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored row is invalid.
    pub async fn top_by_message_count(
        &self,
        limit: i64,
    ) -> Result<Vec<WhatsAppUser>, RepositoryError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM whatsapp_users \
             ORDER BY message_count DESC \
             LIMIT $1"
        );
        let rows: Vec<UserRow> = sqlx::query_as(&sql).bind(limit).fetch_all(&self.pool).await?;

        rows.into_iter().map(WhatsAppUser::try_from).collect()
    }
}
