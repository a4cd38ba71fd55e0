pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::analysis::handlers as analysis;
use crate::profiles::handlers as profiles;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Profile intake
        .route("/input/potential", post(profiles::handle_input_potential))
        .route("/input/personality", post(profiles::handle_input_personality))
        // Analysis
        .route("/AnalyzedData/Advices", get(analysis::handle_get_advices))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::analysis::pipeline::{
        AnalysisPipeline, PipelineSettings, StageInvokers, GENERATION_FAILED,
    };
    use crate::llm_client::testing::{invoker, ScriptedBackend};
    use crate::storage::{ProfileStore, ACADEMIC_FILE};

    fn app(dir: &std::path::Path) -> Router {
        let failing = || invoker(Arc::new(ScriptedBackend::failing()));
        let pipeline = AnalysisPipeline::new(
            StageInvokers {
                background: failing(),
                personality: failing(),
                advice: failing(),
                scoring: failing(),
            },
            None,
            PipelineSettings::default(),
        );
        build_router(AppState {
            store: ProfileStore::new(dir),
            pipeline: Arc::new(pipeline),
        })
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = send(
            app(dir.path()),
            Request::get("/health").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "advisor");
    }

    #[tokio::test]
    async fn test_input_potential_stores_and_echoes() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = send(
            app(dir.path()),
            post_json(
                "/input/potential",
                r#"{"major": "Logistic", "gpa": 3.68, "year": 2, "strengths": ["Excel"],
                    "language": {"English": "B2"}, "achievements": [], "mentor": true}"#,
            ),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["major"], "Logistic");
        assert_eq!(body["mentor"], "yes");
        assert_eq!(body["languages"]["English"], "B2");
        assert!(dir.path().join(ACADEMIC_FILE).exists());
    }

    #[tokio::test]
    async fn test_input_personality_rejects_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = send(
            app(dir.path()),
            post_json("/input/personality", r#"{"hobbies": []}"#),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["fields"][0]["field"], "hobbies");
        assert_eq!(body["fields"][1]["field"], "personality_traits");
    }

    #[tokio::test]
    async fn test_malformed_json_is_a_json_400() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = send(app(dir.path()), post_json("/input/potential", "{major")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("invalid JSON body"));
    }

    #[tokio::test]
    async fn test_advices_with_failing_models_returns_fallbacks() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = send(
            app(dir.path()),
            Request::get("/AnalyzedData/Advices").body(Body::empty()).unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["potentialResult"], GENERATION_FAILED);
        assert_eq!(body["personalityResult"], GENERATION_FAILED);
        assert_eq!(body["rubricResult"]["category"], "weak");
        assert_eq!(body["web"], json!({}));
        assert_eq!(body["degraded_stages"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_advices_response_keys_match_front_end() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = send(
            app(dir.path()),
            Request::get("/AnalyzedData/Advices").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let keys = |value: &Value| -> Vec<String> {
            let mut keys: Vec<String> = value.as_object().unwrap().keys().cloned().collect();
            keys.sort();
            keys
        };
        assert_eq!(
            keys(&body),
            [
                "degraded_stages",
                "personalityResult",
                "potentialResult",
                "rubricResult",
                "source_advice",
                "sources",
                "web"
            ]
        );
        assert_eq!(
            keys(&body["source_advice"]),
            ["advice", "article", "books", "certificatin_course", "newspaper"]
        );
        assert_eq!(
            keys(&body["rubricResult"]),
            [
                "category",
                "experience_achievements",
                "goals_vision",
                "growth_potential",
                "normalized",
                "personal_branding",
                "practical_skills",
                "professional_knowledge",
                "total"
            ]
        );
    }

    #[tokio::test]
    async fn test_advices_with_corrupt_store_is_no_result() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(ACADEMIC_FILE), "[1, 2").unwrap();
        let (status, body) = send(
            app(dir.path()),
            Request::get("/AnalyzedData/Advices").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "No result generated");
    }
}
