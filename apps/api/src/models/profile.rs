use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Whether the student has a mentor. "Unknown" is distinct from "no".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MentorStatus {
    Yes,
    No,
    #[default]
    Unknown,
}

// Accepts the labels above as well as the legacy `true` / `false` / `null` body shape.
impl<'de> Deserialize<'de> for MentorStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Flag(Option<bool>),
            Label(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Flag(Some(true)) => Ok(MentorStatus::Yes),
            Repr::Flag(Some(false)) => Ok(MentorStatus::No),
            Repr::Flag(None) => Ok(MentorStatus::Unknown),
            Repr::Label(label) => match label.trim().to_lowercase().as_str() {
                "yes" | "true" => Ok(MentorStatus::Yes),
                "no" | "false" => Ok(MentorStatus::No),
                "unknown" | "" => Ok(MentorStatus::Unknown),
                other => Err(serde::de::Error::custom(format!(
                    "invalid mentor value '{other}', expected yes, no or unknown"
                ))),
            },
        }
    }
}

/// Planning horizon for a goal. The set is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalHorizon {
    #[serde(alias = "short_term")]
    Short,
    #[serde(alias = "mid_term")]
    Mid,
    #[serde(alias = "long_term")]
    Long,
}

impl GoalHorizon {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalHorizon::Short => "short",
            GoalHorizon::Mid => "mid",
            GoalHorizon::Long => "long",
        }
    }
}

/// A student's academic standing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcademicProfile {
    pub major: Option<String>,
    pub gpa: Option<f64>,
    pub year: Option<u32>,
    pub strengths: Vec<String>,
    /// language → proficiency level
    #[serde(alias = "language")]
    pub languages: BTreeMap<String, String>,
    pub achievements: Vec<String>,
    pub mentor: MentorStatus,
}

/// Non-academic identity and aspirations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonalProfile {
    pub hobbies: Vec<String>,
    #[serde(alias = "personality")]
    pub personality_traits: Vec<String>,
    pub unique_brand: Option<String>,
    pub study_style: Option<String>,
    pub exciting_topics: Vec<String>,
    pub goals: BTreeMap<GoalHorizon, Vec<String>>,
}

/// Both profiles paired for the combined analysis. Built per run, never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentCase {
    pub academic: AcademicProfile,
    pub personal: PersonalProfile,
}

impl StudentCase {
    pub fn new(academic: AcademicProfile, personal: PersonalProfile) -> Self {
        Self { academic, personal }
    }
}
