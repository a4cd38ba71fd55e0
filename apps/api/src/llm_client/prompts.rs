// Shared prompt types and cross-cutting prompt fragments.
// Each module that needs model calls defines its own prompts.rs alongside it.

use serde::Serialize;

/// A rendered system/user prompt pair, ready to send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptPair {
    pub system: String,
    pub user: String,
}

impl PromptPair {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }
}

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Appended to the system prompt for backends without native schema enforcement.
pub fn schema_instruction(schema: &serde_json::Value) -> String {
    let rendered = serde_json::to_string_pretty(schema).unwrap_or_else(|_| schema.to_string());
    format!("{JSON_ONLY_SYSTEM}\nThe JSON object MUST conform to this JSON Schema:\n{rendered}")
}
