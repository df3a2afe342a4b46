//! Turns the model's raw JSON text into the response body, synthesizing the
//! coaching message where the model does not write one.

use serde_json::{Map, Value};

use super::text::{
    cap_sentences, collapse_whitespace, is_generic_praise, replace_trailing_punctuation,
    terminate_sentence,
};
use crate::config::SchemaVariant;
use crate::dtos::FeedbackRequest;
use crate::error::FeedbackError;

pub type Evaluation = Map<String, Value>;

pub const COACHING_MESSAGE: &str = "coachingMessage";

const MAX_EXAMPLE_SENTENCES: usize = 2;

/// Criteria keys for the `scores` object and for the flat rubric fields.
const SCORE_KEYS: [&str; 3] = ["empathyFirst", "correctEmotion", "offerHelp"];
const RUBRIC_KEYS: [&str; 3] = ["empathy_first", "emotion_match", "offer_to_help"];

/// Parse model output. No repair is attempted: anything other than a JSON
/// object is malformed.
pub fn parse_evaluation(raw: &str) -> Result<Evaluation, FeedbackError> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(evaluation)) => Ok(evaluation),
        Ok(_) | Err(_) => Err(FeedbackError::MalformedModelOutput {
            raw: raw.to_string(),
        }),
    }
}

/// Build the response body from a parsed evaluation.
pub fn normalize(
    mut evaluation: Evaluation,
    variant: SchemaVariant,
    request: &FeedbackRequest,
) -> Value {
    if variant.model_writes_coaching() {
        if !evaluation.contains_key(COACHING_MESSAGE) {
            tracing::warn!(%variant, "Model output has no coachingMessage");
        }
    } else {
        let message = synthesize_coaching_message(&evaluation);
        evaluation.insert(COACHING_MESSAGE.to_string(), Value::String(message));
    }

    if let Some(scenario_id) = &request.scenario_id {
        let echoed = evaluation
            .get("scenarioId")
            .map(|id| !id.is_null())
            .unwrap_or(false);
        if !echoed {
            evaluation.insert("scenarioId".to_string(), scenario_id.clone());
        }
    }

    Value::Object(evaluation)
}

/// `feedback`, followed by one example sentence when an example is available.
pub fn synthesize_coaching_message(evaluation: &Evaluation) -> String {
    let feedback = evaluation
        .get("feedback")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let example = select_example(evaluation);

    if example.is_empty() {
        return collapse_whitespace(feedback);
    }

    let lead = if is_perfect(evaluation) {
        "You could also say:"
    } else {
        "You could say:"
    };

    collapse_whitespace(&format!(
        "{} {} {}",
        feedback,
        lead,
        terminate_sentence(&example)
    ))
}

/// A usable rewrite suggestion wins; otherwise the first one or two
/// `examples`. Empty when neither is usable.
pub fn select_example(evaluation: &Evaluation) -> String {
    let rewrite = evaluation
        .get("rewriteSuggestion")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|rewrite| !rewrite.is_empty());

    if let Some(rewrite) = rewrite {
        if !is_generic_praise(rewrite) {
            return cap_sentences(rewrite, MAX_EXAMPLE_SENTENCES);
        }
        tracing::debug!("Rewrite suggestion rejected as generic praise");
    }

    let examples: Vec<&str> = evaluation
        .get("examples")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|example| !example.is_empty())
                .collect()
        })
        .unwrap_or_default();

    match examples.as_slice() {
        [first, second, ..] => cap_sentences(
            &format!("{} {}", replace_trailing_punctuation(first), second),
            MAX_EXAMPLE_SENTENCES,
        ),
        [only] => cap_sentences(only, MAX_EXAMPLE_SENTENCES),
        [] => String::new(),
    }
}

/// All three criteria satisfied, read from `scores` or the flat rubric
/// fields. A criterion counts when it is `true` or the number 1.
pub fn is_perfect(evaluation: &Evaluation) -> bool {
    let satisfied = |value: Option<&Value>| match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64() == Some(1.0),
        _ => false,
    };

    if let Some(scores) = evaluation.get("scores").and_then(Value::as_object) {
        return SCORE_KEYS.iter().all(|key| satisfied(scores.get(*key)));
    }

    RUBRIC_KEYS
        .iter()
        .all(|key| satisfied(evaluation.get(*key)))
}
