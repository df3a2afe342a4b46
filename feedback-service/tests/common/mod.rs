use feedback_service::config::{
    CompletionConfig, CorsConfig, FeedbackConfig, SchemaVariant, VariantConfig,
};
use feedback_service::startup::{Application, FEEDBACK_PATH};
use serde_json::{json, Value};
use service_core::config::Config;
use wiremock::matchers::{any, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TEST_API_KEY: &str = "sk-test-key";

pub struct TestApp {
    pub address: String,
    /// Stands in for the completion API. Expectations are checked on drop.
    pub upstream: MockServer,
    pub client: reqwest::Client,
}

impl TestApp {
    pub async fn spawn(variant: SchemaVariant) -> Self {
        Self::spawn_with(variant, Some(TEST_API_KEY)).await
    }

    pub async fn spawn_with(variant: SchemaVariant, api_key: Option<&str>) -> Self {
        let upstream = MockServer::start().await;

        let config = FeedbackConfig {
            common: Config { port: 0 },
            completion: CompletionConfig::new(api_key.map(str::to_string), upstream.uri()),
            variant: VariantConfig::new(variant),
            cors: CorsConfig::default(),
        };

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");
        let port = app.port();

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        Self {
            address: format!("http://127.0.0.1:{}", port),
            upstream,
            client: reqwest::Client::new(),
        }
    }

    pub fn feedback_url(&self) -> String {
        format!("{}{}", self.address, FEEDBACK_PATH)
    }

    pub async fn post_feedback(&self, body: &Value) -> reqwest::Response {
        self.client
            .post(self.feedback_url())
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// The completion API answers once with `payload`.
    pub async fn mock_completion(&self, status: u16, payload: Value) {
        Mock::given(method("POST"))
            .and(path("/responses"))
            .respond_with(ResponseTemplate::new(status).set_body_json(payload))
            .expect(1)
            .mount(&self.upstream)
            .await;
    }

    /// The completion API answers once with `text` as the model output.
    pub async fn mock_output_text(&self, text: &str) {
        self.mock_completion(200, json!({ "id": "resp_test", "output_text": text }))
            .await;
    }

    /// Fail the test if anything reaches the completion API.
    pub async fn expect_no_upstream_call(&self) {
        Mock::given(any())
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&self.upstream)
            .await;
    }

    /// JSON bodies of every request the completion API received.
    pub async fn upstream_bodies(&self) -> Vec<Value> {
        self.upstream
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .map(|request| serde_json::from_slice(&request.body).expect("upstream body is JSON"))
            .collect()
    }
}

pub fn valid_request() -> Value {
    json!({
        "scenarioId": "S-101",
        "channel": "phone",
        "memberStatement": "I just got a bill for a visit my plan said was covered. I'm really worried.",
        "learnerResponse": "I can hear how worried you are about this bill. Let me look into the claim with you."
    })
}
