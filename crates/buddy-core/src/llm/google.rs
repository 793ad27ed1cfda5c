//! Google (Gemini) model client

use super::{ModelClient, ModelError, Prompt};
use crate::config::ModelConfig;
use crate::error::{BuddyError, BuddyResult};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::instrument;

/// Gemini `generateContent` client
pub struct GeminiClient {
    http_client: Client,
    base_url: String,
    model: String,
    api_key: String,
    temperature: f32,
    max_output_tokens: u32,
    timeout_secs: u64,
}

impl GeminiClient {
    /// Create a client from model configuration; the API key is required
    pub fn new(config: &ModelConfig) -> BuddyResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                BuddyError::config_with_context(
                    "Google API key not provided",
                    "set GOOGLE_API_KEY or GEMINI_API_KEY",
                )
            })?;

        let http_client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| BuddyError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            timeout_secs: config.request_timeout.as_secs(),
        })
    }

    fn request_body(&self, prompt: &Prompt) -> Value {
        let mut body = json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": prompt.user }],
            }],
            "generationConfig": {
                "temperature": prompt.temperature.unwrap_or(self.temperature),
                "maxOutputTokens": prompt.max_output_tokens.unwrap_or(self.max_output_tokens),
            },
        });
        if let Some(system) = &prompt.system {
            body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
        }
        body
    }
}

/// Concatenate the text parts of the first candidate
fn parse_response(response: &Value) -> Result<String, ModelError> {
    let parts = response["candidates"][0]["content"]["parts"]
        .as_array()
        .ok_or_else(|| {
            let reason = response["promptFeedback"]["blockReason"]
                .as_str()
                .unwrap_or("no candidates returned");
            ModelError::Api(format!("Gemini returned no content: {}", reason))
        })?;

    let text: String = parts
        .iter()
        .filter_map(|part| part["text"].as_str())
        .collect();

    if text.trim().is_empty() {
        return Err(ModelError::Api("Gemini returned empty text".to_string()));
    }
    Ok(text)
}

#[async_trait]
impl ModelClient for GeminiClient {
    #[instrument(skip(self, prompt), fields(model = %self.model), level = "debug")]
    async fn generate(&self, prompt: &Prompt) -> Result<String, ModelError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let response = self
            .http_client
            .post(&url)
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ModelError::Timeout(self.timeout_secs)
                } else {
                    ModelError::Api(format!("Google request failed: {}", e.without_url()))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ModelError::Api(format!(
                "Google API error (status {}): {}",
                status, error_text
            )));
        }

        let response_json: Value = response.json().await.map_err(|e| {
            if e.is_timeout() {
                ModelError::Timeout(self.timeout_secs)
            } else {
                ModelError::Api(format!("Failed to parse Google response: {}", e))
            }
        })?;

        parse_response(&response_json)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_key() -> ModelConfig {
        ModelConfig {
            api_key: Some("test-key".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_key_rejected() {
        let result = GeminiClient::new(&ModelConfig::default());
        assert!(matches!(result, Err(BuddyError::Config { .. })));
    }

    #[test]
    fn test_request_body_includes_system_instruction() {
        let client = GeminiClient::new(&config_with_key()).unwrap();
        let prompt = Prompt::new("What is Rust?")
            .with_system("Be brief.")
            .with_max_output_tokens(100);
        let body = client.request_body(&prompt);

        assert_eq!(body["contents"][0]["parts"][0]["text"], "What is Rust?");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "Be brief.");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 100);
    }

    #[test]
    fn test_request_body_without_system() {
        let client = GeminiClient::new(&config_with_key()).unwrap();
        let body = client.request_body(&Prompt::new("hi"));
        assert!(body.get("systemInstruction").is_none());
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 2048);
    }

    #[test]
    fn test_parse_response_joins_parts() {
        let response = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Hello, " }, { "text": "world" }] }
            }]
        });
        assert_eq!(parse_response(&response).unwrap(), "Hello, world");
    }

    #[test]
    fn test_parse_blocked_response() {
        let response = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        let err = parse_response(&response).unwrap_err();
        assert!(matches!(err, ModelError::Api(msg) if msg.contains("SAFETY")));
    }
}
