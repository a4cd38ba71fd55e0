use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// A single rejected input field, reported back to the HTTP caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldIssue {
    pub field: String,
    pub message: String,
}

impl FieldIssue {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Validation failed on {} field(s)", .0.len())]
    InvalidFields(Vec<FieldIssue>),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("No result generated")]
    NoResult,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::InvalidFields(issues) => {
                let body = Json(json!({
                    "error": self.to_string(),
                    "code": "VALIDATION_ERROR",
                    "fields": issues,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::Processing(msg) => {
                tracing::warn!("Processing error: {msg}");
                (StatusCode::BAD_REQUEST, "PROCESSING_ERROR", msg.clone())
            }
            AppError::NoResult => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "NO_RESULT",
                "No result generated".to_string(),
            ),
        };

        let body = Json(json!({
            "error": message,
            "code": code,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_maps_to_400() {
        let response = AppError::Validation("bad".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_no_result_maps_to_500() {
        let response = AppError::NoResult.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_invalid_fields_message_counts_fields() {
        let err = AppError::InvalidFields(vec![
            FieldIssue::new("gpa", "missing"),
            FieldIssue::new("year", "must be at least 1"),
        ]);
        assert_eq!(err.to_string(), "Validation failed on 2 field(s)");
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_each_variant_has_status_and_code() {
        let cases = [
            (AppError::Validation("bad".into()), StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            (AppError::InvalidFields(vec![]), StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            (AppError::Processing("disk".into()), StatusCode::BAD_REQUEST, "PROCESSING_ERROR"),
            (AppError::NoResult, StatusCode::INTERNAL_SERVER_ERROR, "NO_RESULT"),
        ];
        for (err, status, code) in cases {
            let response = err.into_response();
            assert_eq!(response.status(), status);
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(body["code"], code);
        }
    }
}
