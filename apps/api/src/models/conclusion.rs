use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize, Serializer};

use crate::analysis::pipeline::Stage;
use crate::analysis::rubric::RubricAssessment;
use crate::enrichment::EnrichmentResult;
use crate::llm_client::StructuredOutput;

/// Advice extracted from the combined case. Every field is free text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CaseAdvice {
    /// Concrete next steps for the student.
    pub advice: String,
    /// One article topic worth reading.
    pub article: String,
    /// Recommended books.
    pub books: String,
    /// A news/press topic to follow, phrased as a search query.
    pub newspaper: String,
    /// A certification or course to take.
    #[serde(alias = "certificatin_course")]
    pub certification_course: String,
}

impl CaseAdvice {
    pub fn is_empty(&self) -> bool {
        self.advice.trim().is_empty()
            && self.article.trim().is_empty()
            && self.books.trim().is_empty()
            && self.newspaper.trim().is_empty()
            && self.certification_course.trim().is_empty()
    }
}

impl StructuredOutput for CaseAdvice {
    const SCHEMA_NAME: &'static str = "case_advice";
}

/// Final output of one analysis run.
///
/// Serialized under the key names the front-end reads (`personalityResult`,
/// `source_advice`, `rubricResult`, ...); `sources` and `degraded_stages` are extra.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conclusion {
    #[serde(rename = "personalityResult")]
    pub personality_narrative: String,
    #[serde(rename = "potentialResult")]
    pub potential_narrative: String,
    #[serde(rename = "source_advice", serialize_with = "serialize_response_advice")]
    pub advice: CaseAdvice,
    #[serde(rename = "rubricResult")]
    pub rubric: RubricAssessment,
    /// Per-hit enrichment outcomes in rank order.
    pub sources: Vec<EnrichmentResult>,
    /// title → url for the hits that were summarized.
    pub web: BTreeMap<String, String>,
    /// Stages that fell back to their placeholder value.
    pub degraded_stages: Vec<Stage>,
}

/// Response view of `CaseAdvice`. The front-end reads the course under its
/// misspelled key; the model-facing schema keeps the correct one.
#[derive(Serialize)]
struct ResponseAdvice<'a> {
    advice: &'a str,
    article: &'a str,
    books: &'a str,
    newspaper: &'a str,
    certificatin_course: &'a str,
}

fn serialize_response_advice<S>(advice: &CaseAdvice, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    ResponseAdvice {
        advice: &advice.advice,
        article: &advice.article,
        books: &advice.books,
        newspaper: &advice.newspaper,
        certificatin_course: &advice.certification_course,
    }
    .serialize(serializer)
}
