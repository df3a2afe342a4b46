use axum::extract::rejection::BytesRejection;
use axum::{body::Bytes, extract::State, Extension, Json};
use serde_json::Value;
use service_core::middleware::tracing::RequestId;

use crate::dtos::FeedbackRequest;
use crate::error::FeedbackError;
use crate::startup::AppState;

/// `POST /api/feedback`: validate, evaluate with the model, return the
/// coaching body.
#[tracing::instrument(
    skip_all,
    fields(
        variant = tracing::field::Empty,
        scenario_id = tracing::field::Empty,
        channel = tracing::field::Empty
    )
)]
pub async fn submit_feedback(
    State(state): State<AppState>,
    request_id: Option<Extension<RequestId>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<Value>, FeedbackError> {
    let variant = state.evaluator.variant();
    let span = tracing::Span::current();
    span.record("variant", variant.schema.as_str());

    let body = body?;
    let request = FeedbackRequest::from_body(&body, &variant.default_channel)?;

    span.record("channel", request.channel.as_str());
    if let Some(id) = &request.scenario_id {
        span.record("scenario_id", tracing::field::display(id));
    }

    tracing::info!(
        member_statement_len = request.member_statement.len(),
        learner_response_len = request.learner_response.len(),
        "Evaluating learner response"
    );

    let request_id = request_id.map(|Extension(id)| id.0);
    let body = state.evaluator.evaluate(&request, request_id).await?;

    tracing::info!("Feedback generated");
    Ok(Json(body))
}

pub async fn method_not_allowed() -> FeedbackError {
    FeedbackError::MethodNotAllowed
}
