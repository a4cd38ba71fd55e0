use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::analysis::pipeline::EnrichmentQuerySource;
use crate::llm_client::ModelSpec;

/// Application configuration loaded from environment variables.
/// Fails at startup if a value is malformed or a stage names a provider with no key.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub data_dir: PathBuf,
    pub api_keys: ApiKeys,
    pub models: StageModels,
    pub model_timeout: Duration,
    pub stage_attempts: u32,
    pub enrichment: EnrichmentConfig,
}

#[derive(Clone, Default)]
pub struct ApiKeys {
    pub openai: Option<String>,
    pub gemini: Option<String>,
    pub anthropic: Option<String>,
}

// Keys never reach the logs.
impl std::fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeys")
            .field("openai", &self.openai.is_some())
            .field("gemini", &self.gemini.is_some())
            .field("anthropic", &self.anthropic.is_some())
            .finish()
    }
}

/// Which `provider:model` answers each pipeline stage.
#[derive(Debug, Clone)]
pub struct StageModels {
    pub background: ModelSpec,
    pub personality: ModelSpec,
    pub advice: ModelSpec,
    pub scoring: ModelSpec,
    pub summary: ModelSpec,
}

#[derive(Debug, Clone)]
pub struct EnrichmentConfig {
    pub query_source: EnrichmentQuerySource,
    pub results: usize,
    pub region: String,
    pub backend: String,
    pub max_input_chars: usize,
    pub max_output_tokens: u32,
    pub timeout: Duration,
    pub concurrency: usize,
    pub save_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let config = Config {
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            data_dir: PathBuf::from(
                std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string()),
            ),
            api_keys: ApiKeys {
                openai: optional_env("OPENAI_API_KEY"),
                gemini: optional_env("GEMINI_API_KEY"),
                anthropic: optional_env("ANTHROPIC_API_KEY"),
            },
            models: StageModels {
                background: parse_env_str("BACKGROUND_MODEL", "gemini:gemini-2.5-flash")?,
                personality: parse_env_str("PERSONALITY_MODEL", "gemini:gemini-2.5-flash")?,
                advice: parse_env_str("ADVICE_MODEL", "openai:gpt-4o-mini")?,
                scoring: parse_env_str("SCORING_MODEL", "openai:gpt-4o-mini")?,
                summary: parse_env_str("SUMMARY_MODEL", "openai:gpt-4o-mini")?,
            },
            model_timeout: Duration::from_secs(parse_env("MODEL_TIMEOUT_SECS", 60)?),
            stage_attempts: parse_env::<u32>("STAGE_ATTEMPTS", 1)?.max(1),
            enrichment: EnrichmentConfig {
                query_source: parse_env_str("ENRICH_QUERY_SOURCE", "newspaper")?,
                results: parse_env("ENRICH_RESULTS", 2)?,
                region: std::env::var("ENRICH_REGION").unwrap_or_else(|_| "vn-vi".to_string()),
                backend: std::env::var("ENRICH_BACKEND").unwrap_or_else(|_| "html".to_string()),
                max_input_chars: parse_env("ENRICH_MAX_INPUT_CHARS", 12_000)?,
                max_output_tokens: parse_env("ENRICH_MAX_OUTPUT_TOKENS", 220)?,
                timeout: Duration::from_secs(parse_env("ENRICH_TIMEOUT_SECS", 20)?),
                concurrency: parse_env::<usize>("ENRICH_CONCURRENCY", 3)?.max(1),
                save_path: optional_env("ENRICH_SAVE_PATH").map(PathBuf::from),
            },
        };

        config.check_keys()?;
        Ok(config)
    }

    /// Every configured stage must point at a provider we hold a key for.
    /// The summarizer only counts while web enrichment is enabled.
    fn check_keys(&self) -> Result<()> {
        let mut stages = vec![
            ("BACKGROUND_MODEL", &self.models.background),
            ("PERSONALITY_MODEL", &self.models.personality),
            ("ADVICE_MODEL", &self.models.advice),
            ("SCORING_MODEL", &self.models.scoring),
        ];
        if self.enrichment.query_source != EnrichmentQuerySource::Disabled {
            stages.push(("SUMMARY_MODEL", &self.models.summary));
        }
        for (var, spec) in stages {
            if self.api_keys.for_provider(spec.provider).is_none() {
                return Err(anyhow!(
                    "{var} uses provider '{}' but {} is not set",
                    spec.provider,
                    spec.provider.key_var()
                ));
            }
        }
        Ok(())
    }
}

impl ApiKeys {
    pub fn for_provider(&self, provider: crate::llm_client::Provider) -> Option<&str> {
        use crate::llm_client::Provider;
        match provider {
            Provider::OpenAi => self.openai.as_deref(),
            Provider::Gemini => self.gemini.as_deref(),
            Provider::Anthropic => self.anthropic.as_deref(),
        }
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        None => Ok(default),
    }
}

fn parse_env_str<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr<Err = String>,
{
    let raw = optional_env(key).unwrap_or_else(|| default.to_string());
    raw.parse::<T>()
        .map_err(|e| anyhow!("Environment variable '{key}': {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::Provider;

    #[test]
    fn test_api_keys_debug_hides_values() {
        let keys = ApiKeys {
            openai: Some("sk-secret".to_string()),
            gemini: None,
            anthropic: None,
        };
        let printed = format!("{keys:?}");
        assert!(!printed.contains("sk-secret"));
        assert!(printed.contains("openai: true"));
    }

    #[test]
    fn test_for_provider_maps_each_key() {
        let keys = ApiKeys {
            openai: Some("o".to_string()),
            gemini: Some("g".to_string()),
            anthropic: None,
        };
        assert_eq!(keys.for_provider(Provider::OpenAi), Some("o"));
        assert_eq!(keys.for_provider(Provider::Gemini), Some("g"));
        assert_eq!(keys.for_provider(Provider::Anthropic), None);
    }

    /// Gemini key only; the summarizer points at Anthropic.
    fn config_with_summary_on_anthropic(query_source: EnrichmentQuerySource) -> Config {
        let gemini: ModelSpec = "gemini:gemini-2.5-flash".parse().unwrap();
        Config {
            port: 8080,
            rust_log: "info".to_string(),
            data_dir: PathBuf::from("./data"),
            api_keys: ApiKeys {
                gemini: Some("g".to_string()),
                ..ApiKeys::default()
            },
            models: StageModels {
                background: gemini.clone(),
                personality: gemini.clone(),
                advice: gemini.clone(),
                scoring: gemini,
                summary: "anthropic:claude-3-5-haiku-latest".parse().unwrap(),
            },
            model_timeout: Duration::from_secs(60),
            stage_attempts: 1,
            enrichment: EnrichmentConfig {
                query_source,
                results: 2,
                region: "vn-vi".to_string(),
                backend: "html".to_string(),
                max_input_chars: 12_000,
                max_output_tokens: 220,
                timeout: Duration::from_secs(20),
                concurrency: 3,
                save_path: None,
            },
        }
    }

    #[test]
    fn test_summary_key_required_while_enrichment_enabled() {
        let err = config_with_summary_on_anthropic(EnrichmentQuerySource::Newspaper)
            .check_keys()
            .unwrap_err();
        assert!(err.to_string().starts_with("SUMMARY_MODEL uses provider"));
    }

    #[test]
    fn test_summary_key_ignored_when_enrichment_disabled() {
        assert!(config_with_summary_on_anthropic(EnrichmentQuerySource::Disabled)
            .check_keys()
            .is_ok());
    }
}
