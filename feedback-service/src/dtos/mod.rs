use serde::{Deserialize, Deserializer};
use serde_json::Value;
use validator::Validate;

use crate::error::FeedbackError;

/// Wire names of the required fields, in the order they are reported.
const REQUIRED_FIELDS: [(&str, &str); 2] = [
    ("member_statement", "memberStatement"),
    ("learner_response", "learnerResponse"),
];

/// Inbound body as sent by the authoring tool. Every field is optional at
/// this stage; non-string values for text fields read as absent.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackPayload {
    #[serde(default)]
    pub scenario_id: Option<Value>,

    #[serde(default, deserialize_with = "string_or_none")]
    pub channel: Option<String>,

    #[serde(default, deserialize_with = "string_or_none")]
    #[validate(required, length(min = 1, message = "memberStatement cannot be empty"))]
    pub member_statement: Option<String>,

    #[serde(default, deserialize_with = "string_or_none")]
    #[validate(required, length(min = 1, message = "learnerResponse cannot be empty"))]
    pub learner_response: Option<String>,
}

/// A validated feedback request.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackRequest {
    /// Echoed back untouched; `None` for absent or null.
    pub scenario_id: Option<Value>,
    pub channel: String,
    pub member_statement: String,
    pub learner_response: String,
}

impl FeedbackRequest {
    /// Parse and validate a raw request body.
    ///
    /// An empty or unparseable body is treated as `{}`, so it fails with both
    /// required fields listed.
    pub fn from_body(body: &[u8], default_channel: &str) -> Result<Self, FeedbackError> {
        let payload = if body.iter().all(u8::is_ascii_whitespace) {
            FeedbackPayload::default()
        } else {
            serde_json::from_slice::<FeedbackPayload>(body).unwrap_or_else(|e| {
                tracing::debug!(error = %e, "Request body is not a JSON object");
                FeedbackPayload::default()
            })
        };

        payload.into_request(default_channel)
    }
}

impl FeedbackPayload {
    pub fn into_request(self, default_channel: &str) -> Result<FeedbackRequest, FeedbackError> {
        if let Err(errors) = self.validate() {
            let field_errors = errors.field_errors();
            let missing = REQUIRED_FIELDS
                .iter()
                .filter(|(field, wire)| {
                    field_errors.contains_key(*field) || field_errors.contains_key(*wire)
                })
                .map(|(_, wire)| *wire)
                .collect::<Vec<_>>();

            return Err(FeedbackError::Validation { missing });
        }

        let (Some(member_statement), Some(learner_response)) =
            (self.member_statement, self.learner_response)
        else {
            return Err(FeedbackError::Validation {
                missing: REQUIRED_FIELDS.iter().map(|(_, wire)| *wire).collect(),
            });
        };

        let channel = self
            .channel
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| default_channel.to_string());

        Ok(FeedbackRequest {
            scenario_id: self.scenario_id.filter(|id| !id.is_null()),
            channel,
            member_statement,
            learner_response,
        })
    }
}

fn string_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}
