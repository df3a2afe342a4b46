use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::fmt;
use std::str::FromStr;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TEMPERATURE: f32 = 0.2;
const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 260;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CHANNEL: &str = "chat";
const DEFAULT_ALLOWED_ORIGIN: &str = "*";

#[derive(Debug, Clone)]
pub struct FeedbackConfig {
    pub common: core_config::Config,
    pub completion: CompletionConfig,
    pub variant: VariantConfig,
    pub cors: CorsConfig,
}

/// Settings for the outbound completion API.
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    /// Absent credential is reported per request, not at startup.
    pub api_key: Option<Secret<String>>,
    pub base_url: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub timeout_secs: u64,
}

/// Which fields the model is asked for and who writes the coaching message.
#[derive(Debug, Clone)]
pub struct VariantConfig {
    pub schema: SchemaVariant,
    /// Strict JSON-schema constrained output instead of a prose description.
    pub strict_schema: bool,
    pub default_channel: String,
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    /// `*` or a single deployed origin.
    pub allowed_origin: String,
}

/// Response schema requested from the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaVariant {
    /// Boolean rubric fields plus expected emotions; message synthesized here.
    Rubric,
    /// Numeric scores, verdict and rewrite suggestion; message synthesized here.
    Scored,
    /// The model writes `coachingMessage` itself.
    Coaching,
}

impl SchemaVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaVariant::Rubric => "rubric",
            SchemaVariant::Scored => "scored",
            SchemaVariant::Coaching => "coaching",
        }
    }

    /// Whether the model output already carries the final coaching message.
    pub fn model_writes_coaching(&self) -> bool {
        matches!(self, SchemaVariant::Coaching)
    }

    pub fn default_strict_schema(&self) -> bool {
        !matches!(self, SchemaVariant::Scored)
    }
}

impl fmt::Display for SchemaVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemaVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rubric" => Ok(SchemaVariant::Rubric),
            "scored" => Ok(SchemaVariant::Scored),
            "coaching" => Ok(SchemaVariant::Coaching),
            other => Err(format!(
                "unknown schema variant '{}' (expected rubric, scored or coaching)",
                other
            )),
        }
    }
}

impl VariantConfig {
    pub fn new(schema: SchemaVariant) -> Self {
        Self {
            schema,
            strict_schema: schema.default_strict_schema(),
            default_channel: DEFAULT_CHANNEL.to_string(),
        }
    }
}

impl CompletionConfig {
    pub fn new(api_key: Option<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.map(Secret::new),
            base_url: base_url.into(),
            model: DEFAULT_MODEL.to_string(),
            temperature: Some(DEFAULT_TEMPERATURE),
            max_output_tokens: Some(DEFAULT_MAX_OUTPUT_TOKENS),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origin: DEFAULT_ALLOWED_ORIGIN.to_string(),
        }
    }
}

impl FeedbackConfig {
    pub fn load() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;

        let api_key = env_var("OPENAI_API_KEY");
        if api_key.is_none() {
            tracing::warn!("OPENAI_API_KEY is not set; feedback requests will fail");
        }

        let schema = parse_setting(
            "FEEDBACK_SCHEMA_VARIANT",
            env_var("FEEDBACK_SCHEMA_VARIANT"),
            SchemaVariant::Scored,
        )?;

        Ok(FeedbackConfig {
            common,
            completion: CompletionConfig {
                api_key: api_key.map(Secret::new),
                base_url: env_var("OPENAI_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
                model: env_var("FEEDBACK_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                temperature: Some(parse_setting(
                    "FEEDBACK_TEMPERATURE",
                    env_var("FEEDBACK_TEMPERATURE"),
                    DEFAULT_TEMPERATURE,
                )?),
                max_output_tokens: Some(parse_setting(
                    "FEEDBACK_MAX_OUTPUT_TOKENS",
                    env_var("FEEDBACK_MAX_OUTPUT_TOKENS"),
                    DEFAULT_MAX_OUTPUT_TOKENS,
                )?),
                timeout_secs: parse_setting(
                    "FEEDBACK_TIMEOUT_SECS",
                    env_var("FEEDBACK_TIMEOUT_SECS"),
                    DEFAULT_TIMEOUT_SECS,
                )?,
            },
            variant: VariantConfig {
                schema,
                strict_schema: parse_setting(
                    "FEEDBACK_STRICT_SCHEMA",
                    env_var("FEEDBACK_STRICT_SCHEMA"),
                    schema.default_strict_schema(),
                )?,
                default_channel: env_var("FEEDBACK_DEFAULT_CHANNEL")
                    .unwrap_or_else(|| DEFAULT_CHANNEL.to_string()),
            },
            cors: CorsConfig {
                allowed_origin: env_var("FEEDBACK_ALLOWED_ORIGIN")
                    .unwrap_or_else(|| DEFAULT_ALLOWED_ORIGIN.to_string()),
            },
        })
    }
}

/// Non-empty environment value.
fn env_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_setting<T>(key: &str, raw: Option<String>, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| {
            AppError::ConfigError(anyhow::anyhow!("{} has invalid value '{}': {}", key, value, e))
        }),
    }
}
