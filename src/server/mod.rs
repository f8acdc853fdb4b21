//! HTTP front end (Axum router + shared state).
//!
//! - `routes.rs`: handlers for upload, progress and the index page
//! - `errors.rs`: consistent JSON error responses

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Extension, Router,
};
use tracing::info;

use crate::config::AppConfig;
use crate::jobs::JobRegistry;
use crate::provider::DividendSource;
use crate::report::ReportBuilder;

pub mod errors;
pub mod routes;

pub struct AppState {
    pub source: Arc<dyn DividendSource>,
    pub report: ReportBuilder,
    pub business_days: u32,
    pub jobs: JobRegistry,
}

impl AppState {
    pub fn new(config: &AppConfig, source: Arc<dyn DividendSource>) -> Self {
        Self {
            source,
            report: ReportBuilder::from_config(&config.report),
            business_days: config.report.business_days,
            jobs: JobRegistry::new(config.server.max_tracked_jobs),
        }
    }
}

pub fn build_app(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(routes::index))
        .route("/health", get(routes::health))
        .route("/upload", post(routes::upload))
        .route("/progress", get(routes::progress))
        .route("/jobs", post(routes::create_job))
        .route("/jobs/:id/progress", get(routes::job_progress))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(Extension(state))
}

pub async fn serve(config: &AppConfig, source: Arc<dyn DividendSource>, bind: SocketAddr) -> Result<()> {
    let state = Arc::new(AppState::new(config, source));
    let app = build_app(state, config.server.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
