mod common;

use common::{valid_request, TestApp, TEST_API_KEY};
use feedback_service::config::SchemaVariant;
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

// =============================================================================
// Health Check
// =============================================================================

#[tokio::test]
async fn health_check_works() {
    let app = TestApp::spawn(SchemaVariant::Scored).await;

    let response = app
        .client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "feedback-service");
}

// =============================================================================
// Validation and methods
// =============================================================================

#[tokio::test]
async fn missing_member_statement_is_rejected_before_upstream() {
    let app = TestApp::spawn(SchemaVariant::Scored).await;
    app.expect_no_upstream_call().await;

    let response = app
        .post_feedback(&json!({ "learnerResponse": "Let me help." }))
        .await;

    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["required"], json!(["memberStatement"]));
    assert!(body["error"].as_str().unwrap().contains("memberStatement"));
}

#[tokio::test]
async fn null_and_empty_fields_are_rejected() {
    let app = TestApp::spawn(SchemaVariant::Scored).await;
    app.expect_no_upstream_call().await;

    let response = app
        .post_feedback(&json!({ "memberStatement": null, "learnerResponse": "" }))
        .await;

    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["required"], json!(["memberStatement", "learnerResponse"]));
}

#[tokio::test]
async fn get_is_method_not_allowed() {
    let app = TestApp::spawn(SchemaVariant::Scored).await;
    app.expect_no_upstream_call().await;

    let response = app.client.get(app.feedback_url()).send().await.unwrap();

    assert_eq!(response.status().as_u16(), 405);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Use POST with JSON body." }));
}

#[tokio::test]
async fn plain_options_succeeds_without_body() {
    let app = TestApp::spawn(SchemaVariant::Scored).await;
    app.expect_no_upstream_call().await;

    let response = app
        .client
        .request(reqwest::Method::OPTIONS, app.feedback_url())
        .send()
        .await
        .unwrap();

    assert!(response.status().is_success());
    assert!(response.bytes().await.unwrap().is_empty());
}

#[tokio::test]
async fn oversized_body_returns_json_error() {
    let app = TestApp::spawn(SchemaVariant::Scored).await;
    app.expect_no_upstream_call().await;

    let response = app
        .post_feedback(&json!({
            "memberStatement": "a".repeat(3 * 1024 * 1024),
            "learnerResponse": "Let me help."
        }))
        .await;

    assert_eq!(response.status().as_u16(), 413);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Could not read request body");
    assert!(body["details"].is_string());
}

#[tokio::test]
async fn cors_preflight_is_answered() {
    let app = TestApp::spawn(SchemaVariant::Scored).await;
    app.expect_no_upstream_call().await;

    let response = app
        .client
        .request(reqwest::Method::OPTIONS, app.feedback_url())
        .header("Origin", "https://lms.example.com")
        .header("Access-Control-Request-Method", "POST")
        .header("Access-Control-Request-Headers", "content-type")
        .send()
        .await
        .unwrap();

    assert!(response.status().is_success());
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
    let methods = response.headers()["access-control-allow-methods"]
        .to_str()
        .unwrap()
        .to_string();
    assert!(methods.contains("POST"));
    assert!(response.bytes().await.unwrap().is_empty());
}

// =============================================================================
// Completion results
// =============================================================================

#[tokio::test]
async fn perfect_scores_use_also_say() {
    let app = TestApp::spawn(SchemaVariant::Scored).await;
    let model_output = json!({
        "scenarioId": "S-101",
        "scores": { "empathyFirst": 1, "correctEmotion": 1, "offerHelp": 1 },
        "overall": "pass",
        "detectedEmotion": "worried",
        "feedback": "Nice work!",
        "examples": ["I understand this is frustrating", "Let me look into that for you"]
    });
    app.mock_output_text(&model_output.to_string()).await;

    let response = app.post_feedback(&valid_request()).await;

    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body["coachingMessage"],
        "Nice work! You could also say: I understand this is frustrating. Let me look into that for you."
    );
    assert_eq!(body["overall"], "pass");
    assert_eq!(body["scenarioId"], "S-101");
}

#[tokio::test]
async fn missed_score_uses_could_say() {
    let app = TestApp::spawn(SchemaVariant::Scored).await;
    let model_output = json!({
        "scores": { "empathyFirst": 1, "correctEmotion": 0, "offerHelp": 1 },
        "overall": "needs_work",
        "feedback": "Nice work!",
        "examples": ["I understand this is frustrating", "Let me look into that for you"]
    });
    app.mock_output_text(&model_output.to_string()).await;

    let body: Value = app.post_feedback(&valid_request()).await.json().await.unwrap();

    let message = body["coachingMessage"].as_str().unwrap();
    assert!(message.contains("You could say:"));
    assert!(!message.contains("You could also say:"));
}

#[tokio::test]
async fn generic_praise_rewrite_is_skipped() {
    let app = TestApp::spawn(SchemaVariant::Scored).await;
    let model_output = json!({
        "scores": { "empathyFirst": 1, "correctEmotion": 1, "offerHelp": 1 },
        "feedback": "Strong start.",
        "examples": ["That sounds stressful", "Let me check the claim"],
        "rewriteSuggestion": "Great job! Keep up the great work."
    });
    app.mock_output_text(&model_output.to_string()).await;

    let body: Value = app.post_feedback(&valid_request()).await.json().await.unwrap();

    assert_eq!(
        body["coachingMessage"],
        "Strong start. You could also say: That sounds stressful. Let me check the claim."
    );
    assert_eq!(body["rewriteSuggestion"], "Great job! Keep up the great work.");
}

#[tokio::test]
async fn model_coaching_message_is_passed_through() {
    let app = TestApp::spawn(SchemaVariant::Coaching).await;
    let message = "You named the worry  first, nice!\nNext time, offer a step: \"Let me pull up that claim.\"";
    let model_output = json!({
        "scenarioId": "S-101",
        "scores": { "empathyFirst": 1, "correctEmotion": 1, "offerHelp": 0 },
        "overall": "needs_work",
        "detectedEmotion": "worried",
        "coachingMessage": message
    });
    app.mock_output_text(&model_output.to_string()).await;

    let body: Value = app.post_feedback(&valid_request()).await.json().await.unwrap();

    assert_eq!(body["coachingMessage"].as_str(), Some(message));
}

#[tokio::test]
async fn nested_output_content_is_accepted() {
    let app = TestApp::spawn(SchemaVariant::Rubric).await;
    let model_output = json!({
        "empathy_first": true,
        "emotion_match": true,
        "offer_to_help": true,
        "expected_emotions": ["worried", "confused"],
        "learner_emotion_language": "worried",
        "feedback": "You led with empathy and offered a next step.",
        "examples": ["I can see why that bill is worrying. Let me review the claim."]
    });
    app.mock_completion(
        200,
        json!({
            "id": "resp_nested",
            "output": [{
                "type": "message",
                "role": "assistant",
                "content": [{ "type": "output_text", "text": model_output.to_string() }]
            }]
        }),
    )
    .await;

    let response = app.post_feedback(&valid_request()).await;

    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["expected_emotions"], json!(["worried", "confused"]));
    assert_eq!(
        body["coachingMessage"],
        "You led with empathy and offered a next step. You could also say: I can see why that bill is worrying. Let me review the claim."
    );
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn non_json_model_output_returns_raw_text() {
    let app = TestApp::spawn(SchemaVariant::Scored).await;
    app.mock_output_text("Here is my feedback: great empathy!").await;

    let response = app.post_feedback(&valid_request()).await;

    assert_eq!(response.status().as_u16(), 500);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["details"], "Here is my feedback: great empathy!");
}

#[tokio::test]
async fn upstream_error_body_is_reported() {
    let app = TestApp::spawn(SchemaVariant::Scored).await;
    let upstream_error = json!({ "error": { "message": "Rate limit reached", "type": "requests" } });
    app.mock_completion(429, upstream_error.clone()).await;

    let response = app.post_feedback(&valid_request()).await;

    assert_eq!(response.status().as_u16(), 500);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Completion request failed");
    let details: Value = serde_json::from_str(body["details"].as_str().unwrap()).unwrap();
    assert_eq!(details, upstream_error);
}

#[tokio::test]
async fn empty_completion_is_an_error() {
    let app = TestApp::spawn(SchemaVariant::Scored).await;
    app.mock_completion(200, json!({ "id": "resp_empty", "output": [] }))
        .await;

    let response = app.post_feedback(&valid_request()).await;

    assert_eq!(response.status().as_u16(), 500);
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body["error"],
        "No output text returned from the completion service."
    );
}

#[tokio::test]
async fn missing_credential_fails_without_upstream_call() {
    let app = TestApp::spawn_with(SchemaVariant::Scored, None).await;
    app.expect_no_upstream_call().await;

    let response = app.post_feedback(&valid_request()).await;

    assert_eq!(response.status().as_u16(), 500);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Server is not configured");
}

// =============================================================================
// Outbound request shape
// =============================================================================

#[tokio::test]
async fn outbound_request_carries_prompt_and_settings() {
    let app = TestApp::spawn(SchemaVariant::Scored).await;
    Mock::given(method("POST"))
        .and(path("/responses"))
        .and(header("authorization", format!("Bearer {}", TEST_API_KEY).as_str()))
        .and(header("x-request-id", "trace-me-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "output_text": r#"{"feedback":"ok","examples":[]}"#
        })))
        .expect(1)
        .mount(&app.upstream)
        .await;

    let response = app
        .client
        .post(app.feedback_url())
        .header("x-request-id", "trace-me-1")
        .json(&valid_request())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.headers()["x-request-id"], "trace-me-1");

    let body = &app.upstream_bodies().await[0];
    assert_eq!(body["model"], "gpt-4o-mini");
    assert_eq!(body["max_output_tokens"], 260);
    assert_eq!(body["input"][0]["role"], "system");
    assert_eq!(body["input"][1]["role"], "user");
    assert_eq!(body["text"]["format"]["type"], "json_object");

    let user = body["input"][1]["content"].as_str().unwrap();
    assert!(user.starts_with("ScenarioId: S-101\nChannel: phone\n"));
    assert!(user.contains("Learner response: \"\"\"I can hear how worried you are"));
}

#[tokio::test]
async fn strict_variant_sends_json_schema() {
    let app = TestApp::spawn(SchemaVariant::Coaching).await;
    app.mock_output_text(r#"{"coachingMessage":"ok"}"#).await;

    let response = app
        .post_feedback(&json!({
            "memberStatement": "Why is my deductible so high?",
            "learnerResponse": "Deductibles reset every January."
        }))
        .await;
    assert_eq!(response.status().as_u16(), 200);

    let body = &app.upstream_bodies().await[0];
    assert_eq!(body["text"]["format"]["type"], "json_schema");
    assert_eq!(body["text"]["format"]["strict"], true);
    assert_eq!(body["text"]["format"]["name"], "empathy_feedback_coaching");

    let user = body["input"][1]["content"].as_str().unwrap();
    assert!(user.starts_with("ScenarioId: \nChannel: chat\n"));
}
