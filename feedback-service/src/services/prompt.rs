//! Prompt and output-schema construction for the empathy rubric.

use serde_json::{json, Value};

use super::providers::{CompletionRequest, OutputFormat};
use crate::config::{CompletionConfig, SchemaVariant, VariantConfig};
use crate::dtos::FeedbackRequest;

const RUBRIC: &str = r#"You are an empathy coach for US health insurance customer service agents.

Evaluate the learner response against THREE criteria:
1) Empathy first: Does the learner acknowledge/name the member's emotion BEFORE problem-solving?
2) Emotion match: Did the learner acknowledge an emotion that reasonably matches the member's likely emotion(s) in the statement?
   - Allow close matches (e.g., "concerned" vs "worried").
   - Do NOT require perfect wording. But if the learner labels the wrong emotion (e.g., "excited" when the member is anxious), mark as not matching.
3) Offer to help: Does the learner move beyond empathy by offering help / next step (e.g., "Let me look into that," "I can help explain," "Let's review options")?

Important rules:
- Do NOT judge insurance technical accuracy. Only judge communication behaviors above.
- Be friendly, concise, and coaching-focused.
- If learner misses any criteria: give specific feedback on what's missing and provide 1-2 good example responses.
- If learner meets all three: give positive reinforcement and provide 1-2 alternative strong example responses.
- Examples should be short and realistic. Start examples with empathy language first, then offer help/next step."#;

const RUBRIC_OUTPUT: &str = r#"Return STRICT JSON only, with exactly these keys:
- "empathy_first": boolean
- "emotion_match": boolean
- "offer_to_help": boolean
- "expected_emotions": 1-3 strings naming the member's likely emotions
- "learner_emotion_language": the emotion words/phrases the learner used, or "none"
- "feedback": friendly, specific coaching in 2-4 sentences
- "examples": 1-2 short example responses"#;

const SCORED_OUTPUT: &str = r#"Return JSON only, shaped exactly like this:
{
  "scenarioId": string,
  "scores": { "empathyFirst": 0 or 1, "correctEmotion": 0 or 1, "offerHelp": 0 or 1 },
  "overall": "pass" or "needs_work",
  "detectedEmotion": the member's most likely emotion,
  "feedback": 2-3 sentences of coaching, without example responses,
  "examples": 1-2 short example responses,
  "rewriteSuggestion": a complete improved response the learner could say (not praise of their response)
}
"overall" is "pass" only when all three scores are 1."#;

const COACHING_OUTPUT: &str = r#"Return JSON only, shaped exactly like this:
{
  "scenarioId": string,
  "scores": { "empathyFirst": 0 or 1, "correctEmotion": 0 or 1, "offerHelp": 0 or 1 },
  "overall": "pass" or "needs_work",
  "detectedEmotion": the member's most likely emotion,
  "coachingMessage": 2-4 sentences for the learner: what worked, what is missing, and one example sentence they could say
}
"overall" is "pass" only when all three scores are 1."#;

/// The system/user pair sent to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

pub fn build_prompt(request: &FeedbackRequest, variant: SchemaVariant) -> Prompt {
    Prompt {
        system: system_instruction(variant),
        user: user_content(request),
    }
}

pub fn system_instruction(variant: SchemaVariant) -> String {
    let output = match variant {
        SchemaVariant::Rubric => RUBRIC_OUTPUT,
        SchemaVariant::Scored => SCORED_OUTPUT,
        SchemaVariant::Coaching => COACHING_OUTPUT,
    };
    format!("{}\n\n{}", RUBRIC, output)
}

/// Interpolates the request verbatim; JSON encoding of the outbound body is
/// the only escaping applied.
pub fn user_content(request: &FeedbackRequest) -> String {
    let scenario_id = match &request.scenario_id {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(id)) => id.clone(),
        Some(other) => other.to_string(),
    };

    format!(
        "ScenarioId: {}\nChannel: {}\nMember statement: \"\"\"{}\"\"\"\nLearner response: \"\"\"{}\"\"\"",
        scenario_id, request.channel, request.member_statement, request.learner_response
    )
}

fn score() -> Value {
    json!({ "type": "integer", "enum": [0, 1] })
}

fn scores_schema() -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "properties": {
            "empathyFirst": score(),
            "correctEmotion": score(),
            "offerHelp": score()
        },
        "required": ["empathyFirst", "correctEmotion", "offerHelp"]
    })
}

/// Strict JSON schema for a variant's output. Every property is required, as
/// strict mode demands.
pub fn output_schema(variant: SchemaVariant) -> Value {
    match variant {
        SchemaVariant::Rubric => json!({
            "type": "object",
            "additionalProperties": false,
            "properties": {
                "empathy_first": { "type": "boolean" },
                "emotion_match": { "type": "boolean" },
                "offer_to_help": { "type": "boolean" },
                "expected_emotions": {
                    "type": "array",
                    "items": { "type": "string" },
                    "minItems": 1,
                    "maxItems": 3
                },
                "learner_emotion_language": {
                    "type": "string",
                    "description": "What emotion words/phrases the learner used (or 'none')."
                },
                "feedback": {
                    "type": "string",
                    "description": "Friendly, specific coaching. Keep to 2-4 sentences."
                },
                "examples": {
                    "type": "array",
                    "items": { "type": "string" },
                    "minItems": 1,
                    "maxItems": 2
                }
            },
            "required": [
                "empathy_first",
                "emotion_match",
                "offer_to_help",
                "expected_emotions",
                "learner_emotion_language",
                "feedback",
                "examples"
            ]
        }),
        SchemaVariant::Scored => json!({
            "type": "object",
            "additionalProperties": false,
            "properties": {
                "scenarioId": { "type": ["string", "null"] },
                "scores": scores_schema(),
                "overall": { "type": "string", "enum": ["pass", "needs_work"] },
                "detectedEmotion": { "type": "string" },
                "feedback": { "type": "string" },
                "examples": {
                    "type": "array",
                    "items": { "type": "string" },
                    "minItems": 1,
                    "maxItems": 2
                },
                "rewriteSuggestion": { "type": "string" }
            },
            "required": [
                "scenarioId",
                "scores",
                "overall",
                "detectedEmotion",
                "feedback",
                "examples",
                "rewriteSuggestion"
            ]
        }),
        SchemaVariant::Coaching => json!({
            "type": "object",
            "additionalProperties": false,
            "properties": {
                "scenarioId": { "type": ["string", "null"] },
                "scores": scores_schema(),
                "overall": { "type": "string", "enum": ["pass", "needs_work"] },
                "detectedEmotion": { "type": "string" },
                "coachingMessage": { "type": "string" }
            },
            "required": [
                "scenarioId",
                "scores",
                "overall",
                "detectedEmotion",
                "coachingMessage"
            ]
        }),
    }
}

fn schema_name(variant: SchemaVariant) -> &'static str {
    match variant {
        SchemaVariant::Rubric => "empathy_feedback_v1",
        SchemaVariant::Scored => "empathy_feedback_scored",
        SchemaVariant::Coaching => "empathy_feedback_coaching",
    }
}

pub fn output_format(variant: SchemaVariant, strict: bool) -> OutputFormat {
    if strict {
        OutputFormat::JsonSchema {
            name: schema_name(variant),
            schema: output_schema(variant),
        }
    } else {
        OutputFormat::JsonObject
    }
}

/// Pair the prompt with model settings into a single completion call.
pub fn build_completion(
    request: &FeedbackRequest,
    completion: &CompletionConfig,
    variant: &VariantConfig,
    request_id: Option<String>,
) -> CompletionRequest {
    let Prompt { system, user } = build_prompt(request, variant.schema);

    CompletionRequest {
        model: completion.model.clone(),
        system,
        user,
        temperature: completion.temperature,
        max_output_tokens: completion.max_output_tokens,
        format: output_format(variant.schema, variant.strict_schema),
        request_id,
    }
}
