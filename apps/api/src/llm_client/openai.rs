//! OpenAI Chat Completions backend. Structured calls use `response_format: json_schema`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{error_from_response, Completion, CompletionRequest, LlmError, ModelBackend, Provider};

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
    refusal: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Clone)]
pub struct OpenAiBackend {
    client: Client,
    api_key: String,
    model: String,
}

impl OpenAiBackend {
    pub fn new(api_key: String, model: String, timeout: Duration) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            api_key,
            model,
        })
    }

    fn build_request<'a>(&'a self, request: &CompletionRequest<'a>) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: request.system,
                },
                ChatMessage {
                    role: "user",
                    content: request.user,
                },
            ],
            response_format: request.response_schema.map(|schema| {
                json!({
                    "type": "json_schema",
                    "json_schema": {
                        "name": schema.name,
                        "schema": schema.schema,
                        "strict": false,
                    }
                })
            }),
        }
    }
}

#[async_trait]
impl ModelBackend for OpenAiBackend {
    fn provider(&self) -> Provider {
        Provider::OpenAi
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<Completion, LlmError> {
        let body = self.build_request(request);

        let response = self
            .client
            .post(OPENAI_API_URL)
            .bearer_auth(self.api_key.trim())
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let parsed: ChatResponse = response.json().await?;
        let message = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or(LlmError::EmptyContent)?;

        if let Some(refusal) = message.refusal.filter(|r| !r.is_empty()) {
            return Err(LlmError::Schema(format!("model refused: {refusal}")));
        }

        Ok(Completion {
            text: message.content.unwrap_or_default(),
            input_tokens: parsed.usage.as_ref().map(|u| u.prompt_tokens),
            output_tokens: parsed.usage.as_ref().map(|u| u.completion_tokens),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::ResponseSchema;

    fn backend() -> OpenAiBackend {
        OpenAiBackend::new("sk-test".into(), "gpt-4o-mini".into(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_free_text_request_has_no_response_format() {
        let backend = backend();
        let request = CompletionRequest {
            system: "sys",
            user: "hi",
            max_tokens: 100,
            temperature: 0.1,
            response_schema: None,
        };
        let body = serde_json::to_value(backend.build_request(&request)).unwrap();
        assert!(body.get("response_format").is_none());
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hi");
    }

    #[test]
    fn test_structured_request_carries_schema() {
        let backend = backend();
        let schema = ResponseSchema {
            name: "rubric_score",
            schema: json!({"type": "object"}),
        };
        let request = CompletionRequest {
            system: "sys",
            user: "score me",
            max_tokens: 100,
            temperature: 0.1,
            response_schema: Some(&schema),
        };
        let body = serde_json::to_value(backend.build_request(&request)).unwrap();
        assert_eq!(body["response_format"]["type"], "json_schema");
        assert_eq!(body["response_format"]["json_schema"]["name"], "rubric_score");
    }

    #[test]
    fn test_chat_response_parses_null_content() {
        let parsed: ChatResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"content": null, "refusal": "no"}}]}"#,
        )
        .unwrap();
        assert!(parsed.choices[0].message.content.is_none());
        assert!(parsed.usage.is_none());
    }
}
