use crate::config::Config;
use crate::errors::AppError;
use crate::models::ExtractedFields;
use crate::prompt::{user_prompt, SYSTEM_PROMPT};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Turns a call transcript into structured lead fields.
#[async_trait]
pub trait ExtractionProvider: Send + Sync {
    async fn extract(&self, transcript: &str) -> Result<ExtractedFields, AppError>;
}

/// Client for an OpenAI-compatible chat completions endpoint.
#[derive(Clone)]
pub struct OpenAiExtractor {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl OpenAiExtractor {
    /// Creates a new `OpenAiExtractor`.
    ///
    /// # Arguments
    ///
    /// * `config` - Supplies the API key, base URL, model and request timeout.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Configuration` when `OPENAI_API_KEY` is not set.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let api_key = config
            .openai_api_key
            .clone()
            .ok_or_else(|| AppError::Configuration("Missing OPENAI_API_KEY".to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.llm_timeout_secs))
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create extraction client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: config.openai_base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.openai_model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ExtractionProvider for OpenAiExtractor {
    async fn extract(&self, transcript: &str) -> Result<ExtractedFields, AppError> {
        let url = format!("{}/chat/completions", self.base_url);
        tracing::debug!(
            "Requesting extraction from {} (model: {}, transcript: {} chars)",
            url,
            self.model,
            transcript.len()
        );

        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": user_prompt(transcript) },
            ],
            "response_format": { "type": "json_object" },
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("Extraction request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!("Extraction provider returned error {}: {}", status, error_text);
            return Err(AppError::ExternalApiError(format!(
                "Extraction provider returned status {}: {}",
                status, error_text
            )));
        }

        let completion: ChatCompletion = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse extraction response: {}", e))
        })?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| {
                AppError::ExtractionError("Empty response from extraction provider".to_string())
            })?;

        parse_extraction(&content)
    }
}

/// Parses the provider's message content into extracted fields.
///
/// Accepts a bare JSON object or one wrapped in a markdown code fence.
pub fn parse_extraction(content: &str) -> Result<ExtractedFields, AppError> {
    let json_text = strip_code_fence(content);
    let value: serde_json::Value = serde_json::from_str(json_text).map_err(|e| {
        AppError::ExtractionError(format!("Extraction response is not valid JSON: {}", e))
    })?;

    if !value.is_object() {
        return Err(AppError::ExtractionError(
            "Extraction response is not a JSON object".to_string(),
        ));
    }

    Ok(serde_json::from_value(value)?)
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the language tag line, e.g. ```json
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or(rest);
    rest.trim_end().trim_end_matches("```").trim()
}
