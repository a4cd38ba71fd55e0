use std::sync::Arc;

use crate::analysis::pipeline::AnalysisPipeline;
use crate::storage::ProfileStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub store: ProfileStore,
    /// Read-only after startup; every request runs against the same stage wiring.
    pub pipeline: Arc<AnalysisPipeline>,
}
