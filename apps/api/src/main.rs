mod analysis;
mod config;
mod enrichment;
mod errors;
mod llm_client;
mod models;
mod profiles;
mod routes;
mod state;
mod storage;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::analysis::pipeline::{
    AnalysisPipeline, EnrichmentQuerySource, PipelineSettings, StageInvokers, RETRY_BASE_DELAY,
};
use crate::config::Config;
use crate::enrichment::{DuckDuckGoSearch, EnrichmentEngine, EnrichmentSettings, HttpFetcher};
use crate::llm_client::{build_backend, InvokeSettings, ModelInvoker, ModelSpec};
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::ProfileStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed values or missing provider keys)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting advisor v{}", env!("CARGO_PKG_VERSION"));

    // Profile storage
    let store = ProfileStore::new(&config.data_dir);
    info!("Profile store at {}", store.dir().display());

    // One model invoker per stage
    let invokers = StageInvokers {
        background: invoker_for(&config, &config.models.background, InvokeSettings::default())?,
        personality: invoker_for(&config, &config.models.personality, InvokeSettings::default())?,
        advice: invoker_for(&config, &config.models.advice, InvokeSettings::default())?,
        scoring: invoker_for(&config, &config.models.scoring, InvokeSettings::default())?,
    };
    info!(
        "Stage models: background={} personality={} advice={} scoring={}",
        invokers.background.label(),
        invokers.personality.label(),
        invokers.advice.label(),
        invokers.scoring.label()
    );

    // Web enrichment (skipped entirely when the query source is disabled)
    let enrichment = match config.enrichment.query_source {
        EnrichmentQuerySource::Disabled => {
            info!("Web enrichment disabled");
            None
        }
        source => {
            let engine = build_enrichment(&config)?;
            info!("Web enrichment enabled (query source: {source:?})");
            Some(Arc::new(engine))
        }
    };

    let pipeline = AnalysisPipeline::new(
        invokers,
        enrichment,
        PipelineSettings {
            query_source: config.enrichment.query_source,
            stage_attempts: config.stage_attempts,
            retry_base_delay: RETRY_BASE_DELAY,
        },
    );

    // Build app state
    let state = AppState {
        store,
        pipeline: Arc::new(pipeline),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins to the front-end host once it is deployed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Builds the invoker for one stage from its `provider:model` spec.
fn invoker_for(config: &Config, spec: &ModelSpec, settings: InvokeSettings) -> Result<ModelInvoker> {
    let key = config
        .api_keys
        .for_provider(spec.provider)
        .with_context(|| format!("{} is not set", spec.provider.key_var()))?;
    let backend = build_backend(spec, key, config.model_timeout)
        .with_context(|| format!("building backend for {spec}"))?;
    Ok(ModelInvoker::new(
        backend,
        InvokeSettings {
            timeout: config.model_timeout,
            ..settings
        },
    ))
}

fn build_enrichment(config: &Config) -> Result<EnrichmentEngine> {
    let enrich = &config.enrichment;
    let summarizer = invoker_for(
        config,
        &config.models.summary,
        InvokeSettings {
            max_tokens: enrich.max_output_tokens,
            ..InvokeSettings::default()
        },
    )?;

    let search = DuckDuckGoSearch::new(enrich.timeout).context("building search client")?;
    let fetcher = HttpFetcher::new().context("building page fetcher")?;

    Ok(EnrichmentEngine::new(
        Arc::new(search),
        Arc::new(fetcher),
        summarizer,
        EnrichmentSettings {
            results: enrich.results,
            region: enrich.region.clone(),
            backend: enrich.backend.clone(),
            max_input_chars: enrich.max_input_chars,
            max_output_tokens: enrich.max_output_tokens,
            timeout: enrich.timeout,
            concurrency: enrich.concurrency,
            save_path: enrich.save_path.clone(),
        },
    ))
}
