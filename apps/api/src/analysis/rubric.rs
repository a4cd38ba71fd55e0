//! Rubric Scoring Model: the fixed weighted rubric and the score → category rule.
//!
//! Dimensions and maxima (sum 100):
//!   professional_knowledge 20, practical_skills 20, experience_achievements 20,
//!   personal_branding 15, goals_vision 15, growth_potential 10
//!
//! Classification on total / 100: ≤ 0.50 weak, (0.50, 0.70] ok, > 0.70 strong.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::llm_client::StructuredOutput;

/// One rubric row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimension {
    pub key: &'static str,
    pub label: &'static str,
    pub max: u32,
}

pub const RUBRIC: [Dimension; 6] = [
    Dimension {
        key: "professional_knowledge",
        label: "Kiến thức chuyên môn",
        max: 20,
    },
    Dimension {
        key: "practical_skills",
        label: "Kỹ năng thực hành",
        max: 20,
    },
    Dimension {
        key: "experience_achievements",
        label: "Kinh nghiệm & thành tựu",
        max: 20,
    },
    Dimension {
        key: "personal_branding",
        label: "Định vị cá nhân",
        max: 15,
    },
    Dimension {
        key: "goals_vision",
        label: "Mục tiêu & tầm nhìn",
        max: 15,
    },
    Dimension {
        key: "growth_potential",
        label: "Tiềm năng phát triển",
        max: 10,
    },
];

/// Sum of all dimension maxima.
pub const RUBRIC_TOTAL: u32 = 100;

/// Upper bound (inclusive, in percent of `RUBRIC_TOTAL`) of the weak band.
const WEAK_MAX_PERCENT: u32 = 50;
/// Upper bound (inclusive) of the ok band.
const OK_MAX_PERCENT: u32 = 70;

/// Model-produced score per dimension. Order matches `RUBRIC`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RubricScore {
    /// 0–20
    pub professional_knowledge: u32,
    /// 0–20
    pub practical_skills: u32,
    /// 0–20
    pub experience_achievements: u32,
    /// 0–15
    pub personal_branding: u32,
    /// 0–15
    pub goals_vision: u32,
    /// 0–10
    pub growth_potential: u32,
}

impl RubricScore {
    pub fn values(&self) -> [u32; 6] {
        [
            self.professional_knowledge,
            self.practical_skills,
            self.experience_achievements,
            self.personal_branding,
            self.goals_vision,
            self.growth_potential,
        ]
    }

    pub fn total(&self) -> u32 {
        self.values().iter().sum()
    }

    /// Total scaled to [0, 1].
    pub fn normalized(&self) -> f64 {
        f64::from(self.total()) / f64::from(RUBRIC_TOTAL)
    }
}

impl StructuredOutput for RubricScore {
    const SCHEMA_NAME: &'static str = "rubric_score";

    fn validate(&self) -> Result<(), String> {
        let over: Vec<String> = RUBRIC
            .iter()
            .zip(self.values())
            .filter(|(dimension, value)| *value > dimension.max)
            .map(|(dimension, value)| format!("{}={} (max {})", dimension.key, value, dimension.max))
            .collect();
        if over.is_empty() {
            Ok(())
        } else {
            Err(format!("scores above maximum: {}", over.join(", ")))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Weak,
    Ok,
    Strong,
}

/// Compared as integers so the 0.50 and 0.70 boundaries are exact.
pub fn classify(score: &RubricScore) -> Category {
    let scaled = score.total() * 100;
    if scaled <= WEAK_MAX_PERCENT * RUBRIC_TOTAL {
        Category::Weak
    } else if scaled <= OK_MAX_PERCENT * RUBRIC_TOTAL {
        Category::Ok
    } else {
        Category::Strong
    }
}

/// A score with its derived total and category, as returned to callers.
/// The six dimensions serialize flat beside `total`, `normalized` and `category`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RubricAssessment {
    #[serde(flatten)]
    pub scores: RubricScore,
    pub total: u32,
    pub normalized: f64,
    pub category: Category,
}

impl From<RubricScore> for RubricAssessment {
    fn from(scores: RubricScore) -> Self {
        Self {
            scores,
            total: scores.total(),
            normalized: scores.normalized(),
            category: classify(&scores),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Spreads `total` across dimensions without exceeding any maximum.
    fn score_with_total(mut total: u32) -> RubricScore {
        let mut values = [0u32; 6];
        for (slot, dimension) in values.iter_mut().zip(RUBRIC.iter()) {
            let take = total.min(dimension.max);
            *slot = take;
            total -= take;
        }
        assert_eq!(total, 0, "total exceeds rubric maximum");
        RubricScore {
            professional_knowledge: values[0],
            practical_skills: values[1],
            experience_achievements: values[2],
            personal_branding: values[3],
            goals_vision: values[4],
            growth_potential: values[5],
        }
    }

    #[test]
    fn test_rubric_maxima_sum_to_100() {
        let sum: u32 = RUBRIC.iter().map(|d| d.max).sum();
        assert_eq!(sum, RUBRIC_TOTAL);
    }

    #[test]
    fn test_classification_boundaries() {
        assert_eq!(classify(&score_with_total(49)), Category::Weak);
        assert_eq!(classify(&score_with_total(50)), Category::Weak);
        assert_eq!(classify(&score_with_total(51)), Category::Ok);
        assert_eq!(classify(&score_with_total(70)), Category::Ok);
        assert_eq!(classify(&score_with_total(71)), Category::Strong);
    }

    #[test]
    fn test_extremes() {
        assert_eq!(classify(&RubricScore::default()), Category::Weak);
        assert_eq!(classify(&score_with_total(100)), Category::Strong);
    }

    #[test]
    fn test_normalized_divides_by_100() {
        let score = score_with_total(63);
        assert!((score.normalized() - 0.63).abs() < 1e-9);
    }

    #[test]
    fn test_validate_accepts_maxima() {
        assert!(score_with_total(100).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_dimension_over_max() {
        let score = RubricScore {
            growth_potential: 11,
            ..RubricScore::default()
        };
        let err = score.validate().unwrap_err();
        assert!(err.contains("growth_potential=11 (max 10)"));
    }

    #[test]
    fn test_negative_score_fails_deserialization() {
        let result: Result<RubricScore, _> = serde_json::from_value(serde_json::json!({
            "professional_knowledge": -1,
            "practical_skills": 10,
            "experience_achievements": 10,
            "personal_branding": 10,
            "goals_vision": 10,
            "growth_potential": 5
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_assessment_from_score() {
        let assessment = RubricAssessment::from(score_with_total(72));
        assert_eq!(assessment.total, 72);
        assert_eq!(assessment.category, Category::Strong);
        let json = serde_json::to_value(assessment).unwrap();
        assert_eq!(json["category"], "strong");
        assert_eq!(json["professional_knowledge"], 20);
        assert_eq!(json["growth_potential"], 0);
        assert_eq!(json.as_object().unwrap().len(), 9);
        assert!(json.get("scores").is_none());
    }
}
