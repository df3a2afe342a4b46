//! The per-request pipeline: prompt, one completion call, normalization.

use serde_json::Value;
use std::sync::Arc;

use super::normalizer::{normalize, parse_evaluation};
use super::prompt::build_completion;
use super::providers::CompletionProvider;
use crate::config::{CompletionConfig, VariantConfig};
use crate::dtos::FeedbackRequest;
use crate::error::FeedbackError;

/// Stateless across requests; cloning shares the provider.
#[derive(Clone)]
pub struct FeedbackEvaluator {
    provider: Arc<dyn CompletionProvider>,
    completion: CompletionConfig,
    variant: VariantConfig,
}

impl FeedbackEvaluator {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        completion: CompletionConfig,
        variant: VariantConfig,
    ) -> Self {
        Self {
            provider,
            completion,
            variant,
        }
    }

    pub fn variant(&self) -> &VariantConfig {
        &self.variant
    }

    /// Evaluate a validated request and return the response body.
    pub async fn evaluate(
        &self,
        request: &FeedbackRequest,
        request_id: Option<String>,
    ) -> Result<Value, FeedbackError> {
        let call = build_completion(request, &self.completion, &self.variant, request_id);

        let raw = self.provider.complete(&call).await?;

        let evaluation = parse_evaluation(&raw)?;
        tracing::debug!(fields = evaluation.len(), "Parsed model evaluation");

        Ok(normalize(evaluation, self.variant.schema, request))
    }
}
