//! Client for an OpenAI-compatible chat-completions endpoint.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{
    fallback_observation, sanitize_generated, ComposedMessage, MessageFields, MessageSource,
};
use crate::config::TextGenConfig;
use crate::errors::AppError;
use crate::models::QuoteType;

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    temperature: f32,
    messages: Vec<Message>,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

const SYSTEM_PROMPT: &str = "You rewrite free-text vehicle maintenance notes into the observation \
paragraph of a WhatsApp message sent to a supplier. Reply with plain text only: no markdown, \
no greeting, no signature, at most three sentences. Keep part numbers, quantities and vehicle \
identifiers exactly as written.";

/// Rewrites quote notes through the text-generation API, falling back to a local template.
pub struct TextGenerator {
    client: reqwest::Client,
    config: TextGenConfig,
}

impl TextGenerator {
    pub fn new(config: TextGenConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    /// Compose the message for `fields`. Never fails: any generation problem
    /// is logged and the local observation is used instead.
    pub async fn compose(&self, fields: &MessageFields, description: &str) -> ComposedMessage {
        if description.trim().is_empty() || !self.is_configured() {
            return ComposedMessage::new(
                fields,
                fallback_observation(description),
                MessageSource::Fallback,
            );
        }

        match self.generate_observation(fields, description).await {
            Ok(observation) => ComposedMessage::new(fields, observation, MessageSource::Generated),
            Err(e) => {
                tracing::warn!("Falling back to local observation template: {}", e);
                ComposedMessage::new(
                    fields,
                    fallback_observation(description),
                    MessageSource::Fallback,
                )
            }
        }
    }

    /// Ask the endpoint for an observation and clean up the reply.
    pub async fn generate_observation(
        &self,
        fields: &MessageFields,
        description: &str,
    ) -> Result<String, AppError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::TextGeneration("No API key configured".to_string()))?;

        let request = ChatRequest {
            model: self.config.model.clone(),
            temperature: 0.2,
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: user_prompt(fields, description),
                },
            ],
        };

        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::TextGeneration(format!(
                "Endpoint returned {}: {}",
                status, body
            )));
        }

        let body: ChatResponse = response.json().await?;
        let raw = body
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| AppError::TextGeneration("Empty response".to_string()))?;

        let observation = sanitize_generated(raw);
        if observation.is_empty() {
            return Err(AppError::TextGeneration(
                "Response contained no text".to_string(),
            ));
        }

        tracing::debug!("Generated observation ({} chars)", observation.len());
        Ok(observation)
    }
}

fn user_prompt(fields: &MessageFields, description: &str) -> String {
    let kind = match fields.quote_type {
        QuoteType::Request => "quote request",
        QuoteType::Approval => "quote approval",
    };
    let numbers = fields.quote_numbers();
    format!(
        "Message type: {}\nSupplier: {}\nVehicle prefix: {}\nQuote numbers: {}\nNotes:\n{}",
        kind,
        fields.supplier_name,
        fields.prefix,
        if numbers.is_empty() { "-" } else { numbers.as_str() },
        description.trim()
    )
}
