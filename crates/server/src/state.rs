//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ServerConfig;
use crate::conversation::{ConversationEngine, RandomPicker};
use crate::db::{MessageRepository, UserRepository};
use crate::whatsapp::{WhatsAppClient, WhatsAppError};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: PgPool,
    whatsapp: WhatsAppClient,
    users: UserRepository,
    messages: MessageRepository,
    engine: ConversationEngine,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the WhatsApp HTTP client cannot be built.
    pub fn new(config: ServerConfig, pool: PgPool) -> Result<Self, WhatsAppError> {
        let whatsapp = WhatsAppClient::new(&config.whatsapp)?;
        let users = UserRepository::new(pool.clone());
        let messages = MessageRepository::new(pool.clone());

        let engine = ConversationEngine::new(
            Arc::new(whatsapp.clone()),
            Arc::new(users.clone()),
            Arc::new(messages.clone()),
            Arc::new(RandomPicker),
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                whatsapp,
                users,
                messages,
                engine,
            }),
        })
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the WhatsApp Cloud API client.
    #[must_use]
    pub fn whatsapp(&self) -> &WhatsAppClient {
        &self.inner.whatsapp
    }

    /// Get a reference to the user repository.
    #[must_use]
    pub fn users(&self) -> &UserRepository {
        &self.inner.users
    }

    /// Get a reference to the message log repository.
    #[must_use]
    pub fn messages(&self) -> &MessageRepository {
        &self.inner.messages
    }

    /// Get a reference to the conversation engine.
    #[must_use]
    pub fn engine(&self) -> &ConversationEngine {
        &self.inner.engine
    }
}
