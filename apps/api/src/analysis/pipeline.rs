//! Analysis pipeline: turns the two stored profiles into one `Conclusion`.
//!
//! Stages run strictly in sequence:
//!   1. Background narrative      (academic profile)
//!   2. Personality narrative     (personal profile)
//!   3. Case advice               (both profiles, structured)
//!   4. Rubric scoring            (both profiles, structured)
//!   5. Web enrichment            (one advice field as the search query)
//!
//! A failing stage never aborts the run: its result goes through `resolve`,
//! which logs, marks the stage degraded and substitutes the stage fallback.
//! The only fatal error is a stage output missing at assembly time.

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::analysis::prompts;
use crate::analysis::rubric::{RubricAssessment, RubricScore};
use crate::enrichment::{EnrichmentEngine, EnrichmentResult};
use crate::llm_client::{LlmError, ModelInvoker, PromptPair, StructuredOutput};
use crate::models::conclusion::{CaseAdvice, Conclusion};
use crate::models::profile::{AcademicProfile, PersonalProfile, StudentCase};

/// Placeholder narrative for a stage whose model call failed.
pub const GENERATION_FAILED: &str = "generation failed";

/// First backoff delay; doubles on each further attempt.
pub const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Background,
    Personality,
    CaseAdvice,
    RubricScoring,
    WebEnrichment,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Background => "background",
            Stage::Personality => "personality",
            Stage::CaseAdvice => "case_advice",
            Stage::RubricScoring => "rubric_scoring",
            Stage::WebEnrichment => "web_enrichment",
        };
        f.write_str(name)
    }
}

/// Which advice field becomes the web search query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EnrichmentQuerySource {
    #[default]
    Newspaper,
    Article,
    Books,
    CertificationCourse,
    Disabled,
}

impl EnrichmentQuerySource {
    /// The trimmed query, or `None` when disabled or the field is blank.
    pub fn select<'a>(&self, advice: &'a CaseAdvice) -> Option<&'a str> {
        let field = match self {
            EnrichmentQuerySource::Newspaper => &advice.newspaper,
            EnrichmentQuerySource::Article => &advice.article,
            EnrichmentQuerySource::Books => &advice.books,
            EnrichmentQuerySource::CertificationCourse => &advice.certification_course,
            EnrichmentQuerySource::Disabled => return None,
        };
        Some(field.trim()).filter(|q| !q.is_empty())
    }
}

impl FromStr for EnrichmentQuerySource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "newspaper" => Ok(EnrichmentQuerySource::Newspaper),
            "article" => Ok(EnrichmentQuerySource::Article),
            "books" => Ok(EnrichmentQuerySource::Books),
            "certification_course" => Ok(EnrichmentQuerySource::CertificationCourse),
            "disabled" | "none" | "off" => Ok(EnrichmentQuerySource::Disabled),
            other => Err(format!(
                "unknown enrichment query source '{other}' \
                 (expected newspaper, article, books, certification_course or disabled)"
            )),
        }
    }
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Conclusion assembly failed: no output for stage {0}")]
    Assembly(Stage),
}

/// One model per analysis stage.
pub struct StageInvokers {
    pub background: ModelInvoker,
    pub personality: ModelInvoker,
    pub advice: ModelInvoker,
    pub scoring: ModelInvoker,
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub query_source: EnrichmentQuerySource,
    /// Attempts per stage; 1 means no retry.
    pub stage_attempts: u32,
    pub retry_base_delay: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            query_source: EnrichmentQuerySource::default(),
            stage_attempts: 1,
            retry_base_delay: RETRY_BASE_DELAY,
        }
    }
}

pub struct AnalysisPipeline {
    invokers: StageInvokers,
    enrichment: Option<Arc<EnrichmentEngine>>,
    settings: PipelineSettings,
}

impl AnalysisPipeline {
    pub fn new(
        invokers: StageInvokers,
        enrichment: Option<Arc<EnrichmentEngine>>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            invokers,
            enrichment,
            settings,
        }
    }

    pub async fn run(
        &self,
        academic: AcademicProfile,
        personal: PersonalProfile,
    ) -> Result<Conclusion, AnalysisError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("analysis", %run_id);
        self.run_stages(StudentCase::new(academic, personal))
            .instrument(span)
            .await
    }

    async fn run_stages(&self, case: StudentCase) -> Result<Conclusion, AnalysisError> {
        info!("Starting analysis run");
        let mut draft = ConclusionDraft::default();

        let background = self
            .text_stage(
                Stage::Background,
                &self.invokers.background,
                prompts::background_prompt(&case.academic),
            )
            .await;
        draft.potential_narrative = Some(draft.resolve(Stage::Background, background, || {
            GENERATION_FAILED.to_string()
        }));

        let personality = self
            .text_stage(
                Stage::Personality,
                &self.invokers.personality,
                prompts::personality_prompt(&case.personal),
            )
            .await;
        draft.personality_narrative =
            Some(draft.resolve(Stage::Personality, personality, || GENERATION_FAILED.to_string()));

        let advice = self
            .structured_stage::<CaseAdvice>(
                Stage::CaseAdvice,
                &self.invokers.advice,
                prompts::case_prompt(&case),
            )
            .await;
        let advice = draft.resolve(Stage::CaseAdvice, advice, CaseAdvice::default);

        let score = self
            .structured_stage::<RubricScore>(
                Stage::RubricScoring,
                &self.invokers.scoring,
                prompts::score_prompt(&case.academic, &case.personal),
            )
            .await;
        draft.rubric = Some(draft.resolve(Stage::RubricScoring, score, RubricScore::default));

        let sources = match self.enrichment_query(&draft, &advice) {
            Some((engine, query)) => {
                let report = engine.run(query).await;
                let outcome = match report.search_error {
                    Some(err) => Err(err),
                    None => Ok(report.results),
                };
                draft.resolve(Stage::WebEnrichment, outcome, Vec::new)
            }
            None => Vec::new(),
        };
        draft.sources = Some(sources);
        draft.advice = Some(advice);

        let conclusion = draft.build()?;
        info!(
            degraded = conclusion.degraded_stages.len(),
            category = ?conclusion.rubric.category,
            total = conclusion.rubric.total,
            "Analysis run finished"
        );
        Ok(conclusion)
    }

    /// Engine and query for the enrichment stage, or `None` when the stage is skipped.
    fn enrichment_query<'a>(
        &'a self,
        draft: &ConclusionDraft,
        advice: &'a CaseAdvice,
    ) -> Option<(&'a EnrichmentEngine, &'a str)> {
        let engine = self.enrichment.as_deref()?;
        if draft.degraded_stages.contains(&Stage::CaseAdvice) {
            info!("Skipping web enrichment: advice stage fell back");
            return None;
        }
        match self.settings.query_source.select(advice) {
            Some(query) => Some((engine, query)),
            None => {
                info!(source = ?self.settings.query_source, "Skipping web enrichment: no query");
                None
            }
        }
    }

    async fn text_stage(
        &self,
        stage: Stage,
        invoker: &ModelInvoker,
        prompt: Result<PromptPair, serde_json::Error>,
    ) -> Result<String, LlmError> {
        let prompt = prompt?;
        self.with_retries(stage, || invoker.invoke_text(&prompt)).await
    }

    async fn structured_stage<T: StructuredOutput>(
        &self,
        stage: Stage,
        invoker: &ModelInvoker,
        prompt: Result<PromptPair, serde_json::Error>,
    ) -> Result<T, LlmError> {
        let prompt = prompt?;
        self.with_retries(stage, || invoker.invoke_structured::<T>(&prompt))
            .await
    }

    /// Retries transient failures with exponential backoff: base, 2×base, 4×base, …
    async fn with_retries<T, F, Fut>(&self, stage: Stage, mut call: F) -> Result<T, LlmError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LlmError>>,
    {
        let attempts = self.settings.stage_attempts.max(1);
        let mut attempt = 1;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < attempts && e.is_retryable() => {
                    let delay = self.settings.retry_base_delay * (1u32 << (attempt - 1).min(16));
                    warn!(
                        %stage,
                        "Stage attempt {}/{} failed ({}), retrying after {}ms...",
                        attempt,
                        attempts,
                        e,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Stage outputs collected during a run. Every field must be filled before `build`.
#[derive(Debug, Default)]
struct ConclusionDraft {
    potential_narrative: Option<String>,
    personality_narrative: Option<String>,
    advice: Option<CaseAdvice>,
    rubric: Option<RubricScore>,
    sources: Option<Vec<EnrichmentResult>>,
    degraded_stages: Vec<Stage>,
}

impl ConclusionDraft {
    /// The one fallback policy for every stage.
    fn resolve<T, E: fmt::Display>(
        &mut self,
        stage: Stage,
        result: Result<T, E>,
        fallback: impl FnOnce() -> T,
    ) -> T {
        match result {
            Ok(value) => value,
            Err(e) => {
                warn!(%stage, "Stage failed, using fallback: {e}");
                self.degraded_stages.push(stage);
                fallback()
            }
        }
    }

    fn build(self) -> Result<Conclusion, AnalysisError> {
        let sources = self.sources.ok_or(AnalysisError::Assembly(Stage::WebEnrichment))?;
        let web = sources
            .iter()
            .filter(|r| r.is_ok())
            .map(|r| (r.title.clone(), r.url.clone()))
            .collect();

        Ok(Conclusion {
            personality_narrative: self
                .personality_narrative
                .ok_or(AnalysisError::Assembly(Stage::Personality))?,
            potential_narrative: self
                .potential_narrative
                .ok_or(AnalysisError::Assembly(Stage::Background))?,
            advice: self.advice.ok_or(AnalysisError::Assembly(Stage::CaseAdvice))?,
            rubric: RubricAssessment::from(
                self.rubric.ok_or(AnalysisError::Assembly(Stage::RubricScoring))?,
            ),
            sources,
            web,
            degraded_stages: self.degraded_stages,
        })
    }
}
