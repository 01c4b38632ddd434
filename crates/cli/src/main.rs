//! Waba CLI - Database migrations and operator tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! waba-cli migrate
//!
//! # Send a manual text message
//! waba-cli send 201000000001 "Hello from the operator"
//!
//! # Send a template message
//! waba-cli send 201000000001 --type template --template hello_world
//!
//! # Overall statistics
//! waba-cli stats
//!
//! # Per-user statistics
//! waba-cli stats --user 201000000001
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `send` - Send a message through the Cloud API
//! - `stats` - Show user and message statistics

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "waba-cli")]
#[command(author, version, about = "Waba CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Send a message through the WhatsApp Cloud API
    Send {
        /// Recipient phone number in international format
        phone: String,

        /// Message body (ignored for template sends)
        #[arg(default_value = "")]
        message: String,

        /// Message kind: text or template
        #[arg(short = 't', long = "type", default_value = "text")]
        kind: String,

        /// Template name (required when --type template)
        #[arg(long)]
        template: Option<String>,

        /// Template language code
        #[arg(long, default_value = "en")]
        language: String,

        /// Template body parameters
        #[arg(long, num_args = 0..)]
        params: Vec<String>,
    },
    /// Show statistics, overall or for one user
    Stats {
        /// Phone number for per-user detail
        #[arg(short, long)]
        user: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Send {
            phone,
            message,
            kind,
            template,
            language,
            params,
        } => {
            commands::send::run(&phone, &message, &kind, template.as_deref(), &language, &params)
                .await?;
        }
        Commands::Stats { user } => commands::stats::run(user.as_deref()).await?,
    }
    Ok(())
}
