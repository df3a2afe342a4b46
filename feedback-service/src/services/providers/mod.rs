//! Completion provider abstraction.
//!
//! The evaluator only needs "send this prompt pair, give me the model's
//! text"; the OpenAI Responses client and the test mock both sit behind
//! [`CompletionProvider`].

pub mod mock;
pub mod openai;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use mock::MockCompletionProvider;
pub use openai::{extract_output_text, OpenAiProvider};

/// Error type for provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    /// Upstream answered with a non-success status. `body` is the raw payload.
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    /// Transport failure or timeout.
    #[error("Network error: {0}")]
    Network(String),

    /// Success status but no output text anywhere in the payload.
    #[error("No output text in completion response")]
    EmptyOutput,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// How the model is told to shape its output.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputFormat {
    /// Strict JSON-schema constrained output.
    JsonSchema { name: &'static str, schema: Value },
    /// Any JSON object; the shape is described in the instructions.
    JsonObject,
}

/// One completion call: a system/user message pair plus sampling settings.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub system: String,
    pub user: String,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub format: OutputFormat,
    /// Forwarded as `x-request-id` for correlation.
    pub request_id: Option<String>,
}

/// Trait for JSON completion backends.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Issue exactly one completion call and return the model's output text.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError>;
}
