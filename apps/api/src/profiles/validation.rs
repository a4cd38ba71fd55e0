use crate::errors::FieldIssue;
use crate::models::profile::{AcademicProfile, PersonalProfile};

pub const GPA_MIN: f64 = 0.0;
pub const GPA_MAX: f64 = 4.0;
pub const YEAR_MIN: u32 = 1;
pub const YEAR_MAX: u32 = 6;

/// Checks an academic profile before it is stored.
///
/// FAIL conditions:
/// - `major` missing or blank
/// - `gpa` missing, not finite, or outside [0, 4]
/// - `year` missing or outside [1, 6]
/// - no `strengths`
/// - a blank entry in `strengths` or `achievements`
pub fn validate_academic(profile: &AcademicProfile) -> Vec<FieldIssue> {
    let mut issues = Vec::new();

    if profile.major.as_deref().map_or(true, |m| m.trim().is_empty()) {
        issues.push(FieldIssue::new("major", "is required"));
    }

    match profile.gpa {
        None => issues.push(FieldIssue::new("gpa", "is required")),
        Some(gpa) if !gpa.is_finite() || !(GPA_MIN..=GPA_MAX).contains(&gpa) => issues.push(
            FieldIssue::new("gpa", format!("must be between {GPA_MIN} and {GPA_MAX}")),
        ),
        Some(_) => {}
    }

    match profile.year {
        None => issues.push(FieldIssue::new("year", "is required")),
        Some(year) if !(YEAR_MIN..=YEAR_MAX).contains(&year) => issues.push(FieldIssue::new(
            "year",
            format!("must be between {YEAR_MIN} and {YEAR_MAX}"),
        )),
        Some(_) => {}
    }

    if profile.strengths.is_empty() {
        issues.push(FieldIssue::new("strengths", "add at least one strength"));
    }
    check_blank_entries("strengths", &profile.strengths, &mut issues);
    check_blank_entries("achievements", &profile.achievements, &mut issues);

    issues
}

/// Checks a personal profile before it is stored.
///
/// FAIL conditions:
/// - no `hobbies` or no `personality_traits`
/// - a blank entry in any list field, including goal lists
pub fn validate_personal(profile: &PersonalProfile) -> Vec<FieldIssue> {
    let mut issues = Vec::new();

    if profile.hobbies.is_empty() {
        issues.push(FieldIssue::new("hobbies", "add at least one hobby"));
    }
    if profile.personality_traits.is_empty() {
        issues.push(FieldIssue::new(
            "personality_traits",
            "add at least one personality trait",
        ));
    }

    check_blank_entries("hobbies", &profile.hobbies, &mut issues);
    check_blank_entries("personality_traits", &profile.personality_traits, &mut issues);
    check_blank_entries("exciting_topics", &profile.exciting_topics, &mut issues);
    for (horizon, goals) in &profile.goals {
        check_blank_entries(&format!("goals.{}", horizon.as_str()), goals, &mut issues);
    }

    issues
}

fn check_blank_entries(field: &str, values: &[String], issues: &mut Vec<FieldIssue>) {
    if values.iter().any(|v| v.trim().is_empty()) {
        issues.push(FieldIssue::new(field, "entries must not be blank"));
    }
}
