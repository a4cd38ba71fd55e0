/// Model Invocation Adapter: the single point of entry for every model call.
///
/// ARCHITECTURAL RULE: pipeline and enrichment code never talk to a vendor API directly.
/// They hold a `ModelInvoker`, which wraps one `ModelBackend` (Anthropic, OpenAI or Gemini)
/// and offers two output modes: free text and schema-validated structured output.
///
/// No retries here. Stage retries belong to the orchestrator.
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

pub mod anthropic;
pub mod gemini;
pub mod openai;
pub mod prompts;

pub use anthropic::AnthropicBackend;
pub use gemini::GeminiBackend;
pub use openai::OpenAiBackend;
pub use prompts::PromptPair;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited (status 429): {0}")]
    RateLimited(String),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Schema validation failed: {0}")]
    Schema(String),

    #[error("Model returned empty content")]
    EmptyContent,

    #[error("Model call exceeded {0:?}")]
    Timeout(Duration),
}

impl LlmError {
    /// Short, stable name of the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            LlmError::Http(_) => "HttpError",
            LlmError::Api { .. } => "ApiError",
            LlmError::RateLimited(_) => "RateLimited",
            LlmError::Parse(_) => "ParseError",
            LlmError::Schema(_) => "SchemaError",
            LlmError::EmptyContent => "EmptyContent",
            LlmError::Timeout(_) => "Timeout",
        }
    }

    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::Http(_) | LlmError::RateLimited(_) | LlmError::Timeout(_) => true,
            LlmError::Api { status, .. } => *status >= 500,
            LlmError::Parse(_) | LlmError::Schema(_) | LlmError::EmptyContent => false,
        }
    }
}

/// Model vendors with a backend implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    OpenAi,
    Gemini,
}

impl Provider {
    pub fn key_var(&self) -> &'static str {
        match self {
            Provider::Anthropic => "ANTHROPIC_API_KEY",
            Provider::OpenAi => "OPENAI_API_KEY",
            Provider::Gemini => "GEMINI_API_KEY",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Provider::Anthropic => "anthropic",
            Provider::OpenAi => "openai",
            Provider::Gemini => "gemini",
        };
        f.write_str(name)
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "anthropic" | "claude" => Ok(Provider::Anthropic),
            "openai" => Ok(Provider::OpenAi),
            "gemini" | "google" => Ok(Provider::Gemini),
            other => Err(format!("unknown model provider '{other}'")),
        }
    }
}

/// A `provider:model` pair, e.g. `openai:gpt-4o-mini`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub provider: Provider,
    pub model: String,
}

impl FromStr for ModelSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (provider, model) = s
            .split_once(':')
            .ok_or_else(|| format!("expected 'provider:model', got '{s}'"))?;
        let model = model.trim();
        if model.is_empty() {
            return Err(format!("model name missing in '{s}'"));
        }
        Ok(ModelSpec {
            provider: provider.parse()?,
            model: model.to_string(),
        })
    }
}

impl fmt::Display for ModelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.model)
    }
}

/// JSON Schema the reply must satisfy, plus a name some vendors require.
#[derive(Debug, Clone)]
pub struct ResponseSchema {
    pub name: &'static str,
    pub schema: Value,
}

/// One vendor-neutral request.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub system: &'a str,
    pub user: &'a str,
    pub max_tokens: u32,
    pub temperature: f32,
    pub response_schema: Option<&'a ResponseSchema>,
}

#[derive(Debug, Clone, Default)]
pub struct Completion {
    pub text: String,
    pub input_tokens: Option<u32>,
    pub output_tokens: Option<u32>,
}

/// Vendor backend. Implementations translate the request into their wire shape
/// and return the raw reply text.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    fn provider(&self) -> Provider;
    fn model(&self) -> &str;
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<Completion, LlmError>;
}

/// A record type the model may be asked to emit.
/// `validate` runs after deserialization for checks serde cannot express.
pub trait StructuredOutput: DeserializeOwned + JsonSchema {
    const SCHEMA_NAME: &'static str;

    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Call bounds for one invoker.
#[derive(Debug, Clone, Copy)]
pub struct InvokeSettings {
    pub timeout: Duration,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for InvokeSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            max_tokens: 2048,
            temperature: 0.3,
        }
    }
}

/// Backend plus call bounds. Cheap to clone.
#[derive(Clone)]
pub struct ModelInvoker {
    backend: Arc<dyn ModelBackend>,
    settings: InvokeSettings,
}

impl ModelInvoker {
    pub fn new(backend: Arc<dyn ModelBackend>, settings: InvokeSettings) -> Self {
        Self { backend, settings }
    }

    pub fn model(&self) -> &str {
        self.backend.model()
    }

    pub fn label(&self) -> String {
        format!("{}:{}", self.backend.provider(), self.backend.model())
    }

    /// Free-text mode: the trimmed reply text.
    pub async fn invoke_text(&self, prompt: &PromptPair) -> Result<String, LlmError> {
        let completion = self.send(prompt, None).await?;
        let text = completion.text.trim();
        if text.is_empty() {
            return Err(LlmError::EmptyContent);
        }
        Ok(text.to_string())
    }

    /// Structured mode: the reply parsed as `T` and checked by `T::validate`.
    pub async fn invoke_structured<T: StructuredOutput>(
        &self,
        prompt: &PromptPair,
    ) -> Result<T, LlmError> {
        let schema = ResponseSchema {
            name: T::SCHEMA_NAME,
            schema: serde_json::to_value(schemars::schema_for!(T))?,
        };
        let completion = self.send(prompt, Some(&schema)).await?;
        parse_structured(&completion.text)
    }

    async fn send(
        &self,
        prompt: &PromptPair,
        schema: Option<&ResponseSchema>,
    ) -> Result<Completion, LlmError> {
        let request = CompletionRequest {
            system: &prompt.system,
            user: &prompt.user,
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            response_schema: schema,
        };

        let completion = tokio::time::timeout(self.settings.timeout, self.backend.complete(&request))
            .await
            .map_err(|_| LlmError::Timeout(self.settings.timeout))??;

        debug!(
            model = %self.label(),
            input_tokens = ?completion.input_tokens,
            output_tokens = ?completion.output_tokens,
            "Model call succeeded"
        );
        Ok(completion)
    }
}

/// Builds the backend named by `spec`.
pub fn build_backend(
    spec: &ModelSpec,
    api_key: &str,
    timeout: Duration,
) -> Result<Arc<dyn ModelBackend>, LlmError> {
    let key = api_key.to_string();
    let model = spec.model.clone();
    let backend: Arc<dyn ModelBackend> = match spec.provider {
        Provider::Anthropic => Arc::new(AnthropicBackend::new(key, model, timeout)?),
        Provider::OpenAi => Arc::new(OpenAiBackend::new(key, model, timeout)?),
        Provider::Gemini => Arc::new(GeminiBackend::new(key, model, timeout)?),
    };
    Ok(backend)
}

/// Parses and validates a structured reply.
pub fn parse_structured<T: StructuredOutput>(text: &str) -> Result<T, LlmError> {
    let text = strip_json_fences(text);
    if text.is_empty() {
        return Err(LlmError::EmptyContent);
    }
    let value: T = serde_json::from_str(text)?;
    value.validate().map_err(LlmError::Schema)?;
    Ok(value)
}

/// Maps a non-success HTTP response to an `LlmError`, pulling out the vendor message if it parses.
pub(crate) async fn error_from_response(response: reqwest::Response) -> LlmError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or(body);
    if status == 429 {
        LlmError::RateLimited(message)
    } else {
        LlmError::Api { status, message }
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted backend shared by tests across the crate.

    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;

    pub enum Reply {
        Text(String),
        Fail(LlmError),
        /// Answers with text derived from the user prompt.
        Echo(fn(&str) -> Result<String, LlmError>),
    }

    /// Replays queued replies in order; once the queue is drained, the last
    /// `fallback` reply repeats.
    pub struct ScriptedBackend {
        replies: Mutex<VecDeque<Reply>>,
        fallback: fn() -> Reply,
        calls: AtomicUsize,
        pub seen_schemas: Mutex<Vec<&'static str>>,
    }

    impl ScriptedBackend {
        pub fn new(replies: Vec<Reply>, fallback: fn() -> Reply) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                fallback,
                calls: AtomicUsize::new(0),
                seen_schemas: Mutex::new(Vec::new()),
            }
        }

        pub fn failing() -> Self {
            Self::new(vec![], || {
                Reply::Fail(LlmError::Api {
                    status: 503,
                    message: "backend unavailable".to_string(),
                })
            })
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ModelBackend for ScriptedBackend {
        fn provider(&self) -> Provider {
            Provider::OpenAi
        }

        fn model(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, request: &CompletionRequest<'_>) -> Result<Completion, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(schema) = request.response_schema {
                self.seen_schemas.lock().unwrap().push(schema.name);
            }
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(self.fallback);
            let text = match reply {
                Reply::Text(text) => text,
                Reply::Fail(err) => return Err(err),
                Reply::Echo(f) => f(request.user)?,
            };
            Ok(Completion {
                text,
                ..Completion::default()
            })
        }
    }

    pub fn invoker(backend: Arc<ScriptedBackend>) -> ModelInvoker {
        ModelInvoker::new(backend, InvokeSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{invoker, Reply, ScriptedBackend};
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, JsonSchema)]
    struct Bounded {
        value: u32,
    }

    impl StructuredOutput for Bounded {
        const SCHEMA_NAME: &'static str = "bounded";

        fn validate(&self) -> Result<(), String> {
            if self.value > 10 {
                return Err(format!("value {} exceeds 10", self.value));
            }
            Ok(())
        }
    }

    fn prompt() -> PromptPair {
        PromptPair::new("system", "user")
    }

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_model_spec_parses_provider_and_model() {
        let spec: ModelSpec = "gemini:gemini-2.5-flash".parse().unwrap();
        assert_eq!(spec.provider, Provider::Gemini);
        assert_eq!(spec.model, "gemini-2.5-flash");
        assert_eq!(spec.to_string(), "gemini:gemini-2.5-flash");
    }

    #[test]
    fn test_model_spec_rejects_bad_input() {
        assert!("gpt-4o-mini".parse::<ModelSpec>().is_err());
        assert!("openai:".parse::<ModelSpec>().is_err());
        assert!("mistral:large".parse::<ModelSpec>().is_err());
    }

    #[test]
    fn test_retryable_classification() {
        assert!(LlmError::RateLimited("slow down".into()).is_retryable());
        assert!(LlmError::Api { status: 502, message: String::new() }.is_retryable());
        assert!(!LlmError::Api { status: 400, message: String::new() }.is_retryable());
        assert!(!LlmError::Schema("bad".into()).is_retryable());
    }

    #[tokio::test]
    async fn test_invoke_text_trims_reply() {
        let backend = Arc::new(ScriptedBackend::new(
            vec![Reply::Text("  hello world \n".to_string())],
            || Reply::Text(String::new()),
        ));
        let text = invoker(backend).invoke_text(&prompt()).await.unwrap();
        assert_eq!(text, "hello world");
    }

    #[tokio::test]
    async fn test_invoke_text_empty_reply_is_error() {
        let backend = Arc::new(ScriptedBackend::new(vec![], || Reply::Text("   ".to_string())));
        let err = invoker(backend).invoke_text(&prompt()).await.unwrap_err();
        assert!(matches!(err, LlmError::EmptyContent));
    }

    #[tokio::test]
    async fn test_invoke_structured_parses_fenced_json_and_sends_schema() {
        let backend = Arc::new(ScriptedBackend::new(
            vec![Reply::Text("```json\n{\"value\": 7}\n```".to_string())],
            || Reply::Text(String::new()),
        ));
        let parsed: Bounded = invoker(backend.clone())
            .invoke_structured(&prompt())
            .await
            .unwrap();
        assert_eq!(parsed.value, 7);
        assert_eq!(backend.seen_schemas.lock().unwrap().as_slice(), ["bounded"]);
    }

    #[tokio::test]
    async fn test_invoke_structured_rejects_out_of_range() {
        let backend = Arc::new(ScriptedBackend::new(
            vec![Reply::Text("{\"value\": 11}".to_string())],
            || Reply::Text(String::new()),
        ));
        let err = invoker(backend)
            .invoke_structured::<Bounded>(&prompt())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Schema(_)));
        assert_eq!(err.kind(), "SchemaError");
    }

    #[tokio::test]
    async fn test_invoke_structured_rejects_wrong_shape() {
        let backend = Arc::new(ScriptedBackend::new(
            vec![Reply::Text("{\"other\": 1}".to_string())],
            || Reply::Text(String::new()),
        ));
        let err = invoker(backend)
            .invoke_structured::<Bounded>(&prompt())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Parse(_)));
    }

    struct SlowBackend;

    #[async_trait]
    impl ModelBackend for SlowBackend {
        fn provider(&self) -> Provider {
            Provider::Gemini
        }

        fn model(&self) -> &str {
            "slow"
        }

        async fn complete(&self, _request: &CompletionRequest<'_>) -> Result<Completion, LlmError> {
            tokio::time::sleep(Duration::from_secs(600)).await;
            Ok(Completion::default())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_invoke_times_out() {
        let invoker = ModelInvoker::new(
            Arc::new(SlowBackend),
            InvokeSettings {
                timeout: Duration::from_secs(5),
                ..InvokeSettings::default()
            },
        );
        let err = invoker.invoke_text(&prompt()).await.unwrap_err();
        assert!(matches!(err, LlmError::Timeout(_)));
    }
}
