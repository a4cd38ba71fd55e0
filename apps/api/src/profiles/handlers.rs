//! Axum route handlers for profile intake.

use axum::{extract::State, http::StatusCode, Json};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use tracing::info;

use crate::errors::AppError;
use crate::models::profile::{AcademicProfile, PersonalProfile};
use crate::profiles::validation::{validate_academic, validate_personal};
use crate::state::AppState;

/// POST /input/potential
///
/// Validates and stores the academic profile, then echoes the stored record.
pub async fn handle_input_potential(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<AcademicProfile>), AppError> {
    let profile: AcademicProfile = parse_body(&body)?;

    let issues = validate_academic(&profile);
    if !issues.is_empty() {
        return Err(AppError::InvalidFields(issues));
    }

    state
        .store
        .save_academic(&profile)
        .await
        .map_err(|e| AppError::Processing(e.to_string()))?;

    info!(major = profile.major.as_deref().unwrap_or_default(), "Stored academic profile");
    Ok((StatusCode::CREATED, Json(profile)))
}

/// POST /input/personality
///
/// Validates and stores the personal profile, then echoes the stored record.
pub async fn handle_input_personality(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<PersonalProfile>), AppError> {
    let profile: PersonalProfile = parse_body(&body)?;

    let issues = validate_personal(&profile);
    if !issues.is_empty() {
        return Err(AppError::InvalidFields(issues));
    }

    state
        .store
        .save_personal(&profile)
        .await
        .map_err(|e| AppError::Processing(e.to_string()))?;

    info!(hobbies = profile.hobbies.len(), "Stored personal profile");
    Ok((StatusCode::CREATED, Json(profile)))
}

// Parsed by hand so a malformed body still gets the JSON error shape.
fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(AppError::Validation("request body is empty".to_string()));
    }
    serde_json::from_slice(body).map_err(|e| AppError::Validation(format!("invalid JSON body: {e}")))
}
