//! WhatsApp Cloud API client.
//!
//! Posts messages to the Graph API `/messages` endpoint and marks inbound
//! messages as read.

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{debug, error, instrument};

use waba_core::PhoneNumber;

use super::error::WhatsAppError;
use super::types::SendMessageResponse;
use crate::config::WhatsAppConfig;

/// Graph API base URL.
const GRAPH_API_BASE: &str = "https://graph.facebook.com";

/// WhatsApp Cloud API client for sending messages.
#[derive(Clone)]
pub struct WhatsAppClient {
    /// HTTP client with the configured request timeout.
    client: Client,
    /// Cloud API bearer token.
    access_token: SecretString,
    /// `{base}/{version}/{phone_number_id}` prefix for all calls.
    base_url: String,
}

impl std::fmt::Debug for WhatsAppClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhatsAppClient")
            .field("access_token", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl WhatsAppClient {
    /// Create a new client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `WhatsAppError::Config` if the HTTP client cannot be built.
    pub fn new(config: &WhatsAppConfig) -> Result<Self, WhatsAppError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| WhatsAppError::Config(e.to_string()))?;

        Ok(Self {
            client,
            access_token: config.access_token.clone(),
            base_url: format!(
                "{GRAPH_API_BASE}/{}/{}",
                config.api_version, config.phone_number_id
            ),
        })
    }

    /// Client against an arbitrary base URL, for tests against a local stub.
    #[must_use]
    pub fn with_base_url(access_token: SecretString, base_url: String) -> Self {
        Self {
            client: Client::new(),
            access_token,
            base_url,
        }
    }

    /// Send a free-form text message.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the provider rejects it.
    #[instrument(skip(self, body), fields(to = %to))]
    pub async fn send_text(
        &self,
        to: &PhoneNumber,
        body: &str,
    ) -> Result<SendMessageResponse, WhatsAppError> {
        #[derive(Serialize)]
        struct TextMessage<'a> {
            messaging_product: &'static str,
            to: &'a str,
            #[serde(rename = "type")]
            kind: &'static str,
            text: TextBody<'a>,
        }

        #[derive(Serialize)]
        struct TextBody<'a> {
            body: &'a str,
        }

        self.post_messages(&TextMessage {
            messaging_product: "whatsapp",
            to: to.as_str(),
            kind: "text",
            text: TextBody { body },
        })
        .await
    }

    /// Send a pre-approved template message.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the provider rejects it.
    #[instrument(skip(self, parameters), fields(to = %to, template = %name))]
    pub async fn send_template(
        &self,
        to: &PhoneNumber,
        name: &str,
        language_code: &str,
        parameters: &[String],
    ) -> Result<SendMessageResponse, WhatsAppError> {
        #[derive(Serialize)]
        struct TemplateMessage<'a> {
            messaging_product: &'static str,
            to: &'a str,
            #[serde(rename = "type")]
            kind: &'static str,
            template: Template<'a>,
        }

        #[derive(Serialize)]
        struct Template<'a> {
            name: &'a str,
            language: Language<'a>,
            components: Vec<Component<'a>>,
        }

        #[derive(Serialize)]
        struct Language<'a> {
            code: &'a str,
        }

        #[derive(Serialize)]
        struct Component<'a> {
            #[serde(rename = "type")]
            kind: &'static str,
            parameters: Vec<Parameter<'a>>,
        }

        #[derive(Serialize)]
        struct Parameter<'a> {
            #[serde(rename = "type")]
            kind: &'static str,
            text: &'a str,
        }

        let components = if parameters.is_empty() {
            Vec::new()
        } else {
            vec![Component {
                kind: "body",
                parameters: parameters
                    .iter()
                    .map(|p| Parameter {
                        kind: "text",
                        text: p,
                    })
                    .collect(),
            }]
        };

        self.post_messages(&TemplateMessage {
            messaging_product: "whatsapp",
            to: to.as_str(),
            kind: "template",
            template: Template {
                name,
                language: Language {
                    code: language_code,
                },
                components,
            },
        })
        .await
    }

    /// Send an image by URL.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the provider rejects it.
    #[instrument(skip(self, link, caption), fields(to = %to))]
    pub async fn send_image(
        &self,
        to: &PhoneNumber,
        link: &str,
        caption: &str,
    ) -> Result<SendMessageResponse, WhatsAppError> {
        #[derive(Serialize)]
        struct ImageMessage<'a> {
            messaging_product: &'static str,
            to: &'a str,
            #[serde(rename = "type")]
            kind: &'static str,
            image: Image<'a>,
        }

        #[derive(Serialize)]
        struct Image<'a> {
            link: &'a str,
            caption: &'a str,
        }

        self.post_messages(&ImageMessage {
            messaging_product: "whatsapp",
            to: to.as_str(),
            kind: "image",
            image: Image { link, caption },
        })
        .await
    }

    /// Send a document by URL.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the provider rejects it.
    #[instrument(skip(self, link, filename, caption), fields(to = %to))]
    pub async fn send_document(
        &self,
        to: &PhoneNumber,
        link: &str,
        filename: &str,
        caption: &str,
    ) -> Result<SendMessageResponse, WhatsAppError> {
        #[derive(Serialize)]
        struct DocumentMessage<'a> {
            messaging_product: &'static str,
            to: &'a str,
            #[serde(rename = "type")]
            kind: &'static str,
            document: Document<'a>,
        }

        #[derive(Serialize)]
        struct Document<'a> {
            link: &'a str,
            filename: &'a str,
            caption: &'a str,
        }

        self.post_messages(&DocumentMessage {
            messaging_product: "whatsapp",
            to: to.as_str(),
            kind: "document",
            document: Document {
                link,
                filename,
                caption,
            },
        })
        .await
    }

    /// Mark an inbound message as read.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the provider rejects it.
    #[instrument(skip(self), fields(message_id = %message_id))]
    pub async fn mark_as_read(&self, message_id: &str) -> Result<(), WhatsAppError> {
        #[derive(Serialize)]
        struct MarkRead<'a> {
            messaging_product: &'static str,
            status: &'static str,
            message_id: &'a str,
        }

        self.post_messages(&MarkRead {
            messaging_product: "whatsapp",
            status: "read",
            message_id,
        })
        .await?;

        Ok(())
    }

    /// POST a body to the `/messages` endpoint and decode the response.
    async fn post_messages<T: Serialize>(
        &self,
        body: &T,
    ) -> Result<SendMessageResponse, WhatsAppError> {
        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .bearer_auth(self.access_token.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| WhatsAppError::Request(e.to_string()))?;

        let result: SendMessageResponse = response
            .json()
            .await
            .map_err(|e| WhatsAppError::Response(e.to_string()))?;

        if let Some(api_error) = &result.error {
            error!(
                code = api_error.code,
                error_type = %api_error.error_type,
                "WhatsApp API error"
            );
            return Err(WhatsAppError::Api(api_error.message.clone()));
        }

        debug!(message_id = ?result.message_id(), "WhatsApp API call accepted");

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config() -> WhatsAppConfig {
        WhatsAppConfig {
            access_token: SecretString::from("graph-token"),
            phone_number_id: "123456789".to_string(),
            api_version: "v22.0".to_string(),
            webhook_verify_token: SecretString::from("verify"),
            request_timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_base_url_layout() {
        let client = WhatsAppClient::new(&config()).expect("client builds");
        assert_eq!(
            client.base_url,
            "https://graph.facebook.com/v22.0/123456789"
        );
    }

    #[test]
    fn test_debug_redacts_token() {
        let client = WhatsAppClient::new(&config()).expect("client builds");
        let debug_output = format!("{client:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("graph-token"));
    }
}
