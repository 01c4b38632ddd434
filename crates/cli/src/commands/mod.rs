//! CLI command implementations.

pub mod migrate;
pub mod send;
pub mod stats;

use secrecy::SecretString;

/// Load the database URL from `WABA_DATABASE_URL` with a `DATABASE_URL`
/// fallback, after loading `.env` if present.
pub fn database_url() -> Result<SecretString, CliError> {
    dotenvy::dotenv().ok();

    std::env::var("WABA_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CliError::MissingEnvVar("WABA_DATABASE_URL"))
}

/// Errors shared by the CLI commands.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid phone number: {0}")]
    InvalidPhone(#[from] waba_core::PhoneNumberError),

    #[error("Configuration error: {0}")]
    Config(#[from] waba_server::config::ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Repository error: {0}")]
    Repository(#[from] waba_server::db::RepositoryError),

    #[error("WhatsApp error: {0}")]
    WhatsApp(#[from] waba_server::whatsapp::WhatsAppError),

    #[error("{0}")]
    Usage(String),
}
