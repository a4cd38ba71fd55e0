//! Axum route handler for the analysis run.

use axum::{extract::State, Json};
use tracing::error;

use crate::errors::AppError;
use crate::models::conclusion::Conclusion;
use crate::state::AppState;

/// GET /AnalyzedData/Advices
///
/// Loads both stored profiles and runs the full pipeline. Stage failures are
/// absorbed by the pipeline; only a load or assembly failure yields "no result".
pub async fn handle_get_advices(State(state): State<AppState>) -> Result<Json<Conclusion>, AppError> {
    let academic = state.store.load_academic().await.map_err(|e| {
        error!("Failed to load academic profile: {e}");
        AppError::NoResult
    })?;
    let personal = state.store.load_personal().await.map_err(|e| {
        error!("Failed to load personal profile: {e}");
        AppError::NoResult
    })?;

    let conclusion = state.pipeline.run(academic, personal).await.map_err(|e| {
        error!("Analysis produced no result: {e}");
        AppError::NoResult
    })?;

    Ok(Json(conclusion))
}
