//! Request-level error taxonomy for the feedback endpoint.
//!
//! Every variant is terminal for the request and renders as a JSON envelope
//! `{error, required?, details?}`.

use axum::{
    extract::rejection::BytesRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::any::Any;
use thiserror::Error;

use crate::services::providers::ProviderError;

#[derive(Debug, Error)]
pub enum FeedbackError {
    #[error("Missing required field(s): {}", .missing.join(", "))]
    Validation { missing: Vec<&'static str> },

    #[error("Method not allowed")]
    MethodNotAllowed,

    /// The body could not be read, e.g. it exceeds the size limit.
    #[error("Unreadable request body: {details}")]
    UnreadableBody { status: StatusCode, details: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Completion request failed: {details}")]
    Upstream { details: String },

    #[error("Completion returned no output text")]
    MissingModelOutput,

    #[error("Model output is not a JSON object")]
    MalformedModelOutput { raw: String },

    #[error("Unexpected error: {0}")]
    Unexpected(#[from] anyhow::Error),
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    required: Option<Vec<&'static str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl FeedbackError {
    pub fn status(&self) -> StatusCode {
        match self {
            FeedbackError::Validation { .. } => StatusCode::BAD_REQUEST,
            FeedbackError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            FeedbackError::UnreadableBody { status, .. } => *status,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn envelope(self) -> ErrorEnvelope {
        let (error, required, details) = match self {
            FeedbackError::Validation { missing } => {
                let error = format!("Missing {} (string).", missing.join(" and "));
                (error, Some(missing), None)
            }
            FeedbackError::MethodNotAllowed => {
                ("Use POST with JSON body.".to_string(), None, None)
            }
            FeedbackError::UnreadableBody { details, .. } => {
                ("Could not read request body".to_string(), None, Some(details))
            }
            FeedbackError::Configuration(msg) => {
                ("Server is not configured".to_string(), None, Some(msg))
            }
            FeedbackError::Upstream { details } => {
                ("Completion request failed".to_string(), None, Some(details))
            }
            FeedbackError::MissingModelOutput => (
                "No output text returned from the completion service.".to_string(),
                None,
                None,
            ),
            FeedbackError::MalformedModelOutput { raw } => {
                ("Model returned invalid JSON".to_string(), None, Some(raw))
            }
            FeedbackError::Unexpected(err) => {
                ("Server error".to_string(), None, Some(format!("{:#}", err)))
            }
        };

        ErrorEnvelope {
            error,
            required,
            details,
        }
    }
}

impl From<BytesRejection> for FeedbackError {
    fn from(rejection: BytesRejection) -> Self {
        FeedbackError::UnreadableBody {
            status: rejection.status(),
            details: rejection.body_text(),
        }
    }
}

impl From<ProviderError> for FeedbackError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotConfigured(msg) => FeedbackError::Configuration(msg),
            ProviderError::Api { body, .. } => FeedbackError::Upstream { details: body },
            ProviderError::Network(msg) => FeedbackError::Upstream { details: msg },
            ProviderError::EmptyOutput => FeedbackError::MissingModelOutput,
            ProviderError::InvalidResponse(msg) => FeedbackError::Upstream { details: msg },
        }
    }
}

impl IntoResponse for FeedbackError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Feedback request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %self, "Feedback request rejected");
        }

        (status, Json(self.envelope())).into_response()
    }
}

/// Response for a panic caught while serving a request.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "handler panicked".to_string()
    };

    FeedbackError::Unexpected(anyhow::anyhow!(message)).into_response()
}
