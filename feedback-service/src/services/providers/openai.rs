//! OpenAI Responses API provider.
//!
//! Sends one `POST {base_url}/responses` per completion and pulls the model
//! text out of whichever response shape comes back.

use super::{CompletionProvider, CompletionRequest, OutputFormat, ProviderError};
use crate::config::CompletionConfig;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::Serialize;
use serde_json::{json, Value};
use service_core::observability::TracedClientExt;
use std::time::Duration;

/// OpenAI Responses API client.
pub struct OpenAiProvider {
    client: Client,
    api_key: Option<Secret<String>>,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    input: [InputMessage<'a>; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    text: Value,
}

#[derive(Debug, Serialize)]
struct InputMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl OpenAiProvider {
    pub fn new(config: &CompletionConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/responses", self.base_url)
    }
}

fn text_format(format: &OutputFormat) -> Value {
    match format {
        OutputFormat::JsonSchema { name, schema } => json!({
            "format": {
                "type": "json_schema",
                "name": name,
                "strict": true,
                "schema": schema,
            }
        }),
        OutputFormat::JsonObject => json!({ "format": { "type": "json_object" } }),
    }
}

/// Model text from a Responses API payload.
///
/// Checks the top-level `output_text` convenience field first, then the first
/// non-empty `text` inside `output[].content[]`.
pub fn extract_output_text(payload: &Value) -> Option<String> {
    let direct = payload
        .get("output_text")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty());

    if let Some(text) = direct {
        return Some(text.to_string());
    }

    payload
        .get("output")
        .and_then(Value::as_array)?
        .iter()
        .filter_map(|item| item.get("content").and_then(Value::as_array))
        .flatten()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .map(str::trim)
        .find(|text| !text.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| ProviderError::NotConfigured("OPENAI_API_KEY is not set".to_string()))?;

        let body = ResponsesRequest {
            model: &request.model,
            input: [
                InputMessage {
                    role: "system",
                    content: &request.system,
                },
                InputMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: request.temperature,
            max_output_tokens: request.max_output_tokens,
            text: text_format(&request.format),
        };

        tracing::debug!(
            model = %request.model,
            system_len = request.system.len(),
            user_len = request.user.len(),
            "Sending request to Responses API"
        );

        let response = self
            .client
            .traced_post(&self.endpoint())
            .bearer_auth(api_key.expose_secret())
            .json(&body)
            .send(request.request_id.as_deref())
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        extract_output_text(&payload).ok_or(ProviderError::EmptyOutput)
    }
}
