//! Manual send command.
//!
//! Sends one message through the Cloud API using the same client and
//! configuration as the server. Useful for smoke-testing credentials.

use waba_core::PhoneNumber;
use waba_server::config::WhatsAppConfig;
use waba_server::whatsapp::WhatsAppClient;

use super::CliError;

/// Send one text or template message and print the provider's message ID.
pub async fn run(
    phone: &str,
    message: &str,
    kind: &str,
    template: Option<&str>,
    language: &str,
    params: &[String],
) -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let to = PhoneNumber::parse(phone)?;
    let config = WhatsAppConfig::from_env()?;
    let client = WhatsAppClient::new(&config)?;

    let response = match kind {
        "text" => {
            if message.is_empty() {
                return Err(CliError::Usage("text sends need a message body".to_string()));
            }
            client.send_text(&to, message).await?
        }
        "template" => {
            let name = template
                .ok_or_else(|| CliError::Usage("template sends need --template".to_string()))?;
            client.send_template(&to, name, language, params).await?
        }
        other => {
            return Err(CliError::Usage(format!("unsupported message type: {other}")));
        }
    };

    #[allow(clippy::print_stdout)]
    match response.message_id() {
        Some(id) => println!("Sent. Provider message ID: {id}"),
        None => println!("Provider accepted the request but returned no message ID"),
    }

    Ok(())
}
