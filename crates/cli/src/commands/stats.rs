//! Statistics command.
//!
//! Prints either an overall summary or per-user detail, using the same
//! repositories as the server.

use secrecy::ExposeSecret;
use sqlx::PgPool;

use waba_core::{MessageDirection, PhoneNumber, UserStatus};
use waba_server::db::{MessageRepository, UserRepository};

use super::{CliError, database_url};

/// Print statistics, overall or for one phone number.
pub async fn run(user: Option<&str>) -> Result<(), CliError> {
    let database_url = database_url()?;
    let pool = PgPool::connect(database_url.expose_secret()).await?;

    match user {
        Some(phone) => user_stats(&pool, phone).await,
        None => overall_stats(&pool).await,
    }
}

#[allow(clippy::print_stdout)]
async fn overall_stats(pool: &PgPool) -> Result<(), CliError> {
    let users = UserRepository::new(pool.clone());
    let messages = MessageRepository::new(pool.clone());

    println!("Users");
    println!("  total:    {}", users.count_total().await?);
    println!("  new:      {}", users.count_by_status(UserStatus::New).await?);
    println!("  active:   {}", users.count_by_status(UserStatus::Active).await?);
    println!("  blocked:  {}", users.count_by_status(UserStatus::Blocked).await?);

    println!("Messages");
    println!("  total:    {}", messages.count_total().await?);
    println!("  today:    {}", messages.count_today().await?);
    println!(
        "  inbound:  {}",
        messages.count_by_direction(MessageDirection::Inbound).await?
    );
    println!(
        "  outbound: {}",
        messages.count_by_direction(MessageDirection::Outbound).await?
    );

    println!("Most active users");
    for user in users.top_by_message_count(5).await? {
        println!(
            "  {:<16} {:>5} messages  ({})",
            user.phone_number,
            user.message_count,
            user.name.as_deref().unwrap_or("-")
        );
    }

    Ok(())
}

#[allow(clippy::print_stdout)]
async fn user_stats(pool: &PgPool, phone: &str) -> Result<(), CliError> {
    let phone = PhoneNumber::parse(phone)?;
    let users = UserRepository::new(pool.clone());
    let messages = MessageRepository::new(pool.clone());

    let Some(user) = users.find_by_phone(&phone).await? else {
        println!("No user found for {phone}");
        return Ok(());
    };

    println!("User {phone}");
    println!("  name:          {}", user.name.as_deref().unwrap_or("-"));
    println!("  status:        {}", user.status);
    println!("  current step:  {}", user.current_step);
    println!("  message count: {}", user.message_count);
    println!(
        "  first message: {}",
        user.first_message_at
            .map_or_else(|| "-".to_string(), |t| t.to_rfc3339())
    );
    println!(
        "  last message:  {}",
        user.last_message_at
            .map_or_else(|| "-".to_string(), |t| t.to_rfc3339())
    );

    println!("Messages");
    println!(
        "  inbound:  {}",
        messages
            .count_for_user(&phone, Some(MessageDirection::Inbound))
            .await?
    );
    println!(
        "  outbound: {}",
        messages
            .count_for_user(&phone, Some(MessageDirection::Outbound))
            .await?
    );

    println!("Recent messages");
    for message in messages.recent_for_user(&phone, 5).await? {
        println!(
            "  [{}] {:<8} {:<8} {}",
            message.created_at.format("%Y-%m-%d %H:%M"),
            message.direction,
            message.message_type,
            truncate(&message.content, 60)
        );
    }

    Ok(())
}

/// Truncate long message content for one-line display.
fn truncate(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        return content.to_string();
    }
    let truncated: String = content.chars().take(max_chars).collect();
    format!("{truncated}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_content() {
        assert_eq!(truncate("hello", 60), "hello");
    }

    #[test]
    fn test_truncate_long_content() {
        let long = "a".repeat(100);
        let result = truncate(&long, 60);
        assert_eq!(result.chars().count(), 63);
        assert!(result.ends_with("..."));
    }

    #[test]
    fn test_truncate_multibyte_boundary() {
        let arabic = "م".repeat(100);
        let result = truncate(&arabic, 60);
        assert!(result.ends_with("..."));
    }
}
