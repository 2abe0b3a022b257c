use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use clipsight_common::Config;
use clipsight_engine::{
    AnalysisOrchestrator, ContentNormalizer, IngestGate, LinguaDetector, QueueDispatcher,
    ScrapeOrchestrator,
};
use clipsight_store::PgStore;
use gemini_client::Gemini;
use rocksolid_client::RockSolidClient;

mod rest;

/// Shared handles for the HTTP layer. The concrete store is kept for the
/// read endpoint, which queries it directly.
pub struct AppState {
    pub gate: IngestGate,
    pub store: Arc<PgStore>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Clipsight API starting");

    let config = Config::from_env();

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    let store = Arc::new(PgStore::new(pool));
    store.migrate().await?;
    info!("Connected to database, migrations complete");

    // Collaborator clients.
    let rocksolid = Arc::new(RockSolidClient::new(config.rocksolid_api_key.clone()));
    let gemini = Arc::new(
        Gemini::new(config.gemini_api_key.clone()).with_base_url(config.gemini_base_url.clone()),
    );
    let detector = Arc::new(LinguaDetector::new());

    // The background consumer: one task, strictly sequential jobs.
    let dispatcher = QueueDispatcher::new(
        store.clone(),
        store.clone(),
        ScrapeOrchestrator::new(rocksolid, store.clone()),
        AnalysisOrchestrator::new(gemini, detector.clone(), config.target_region.clone()),
        ContentNormalizer::new(detector),
    );
    tokio::spawn(async move { dispatcher.run().await });

    let state = Arc::new(AppState {
        gate: IngestGate::new(store.clone(), store.clone()),
        store,
    });

    let app = Router::new()
        .route("/healthz", get(rest::healthz))
        .route("/api/v1/posts/analyze", post(rest::submit))
        .route("/api/v1/posts/analyze/{id}", get(rest::result))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("{}:{}", config.web_host, config.web_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "Listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
