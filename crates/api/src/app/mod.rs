//! HTTP API application wiring (Axum router + shared state).
//!
//! - `routes/`: HTTP handlers, one file per area
//! - `dto.rs`: response bodies
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Extension, Router,
};

use crate::config::ApiConfig;

pub mod dto;
pub mod errors;
pub mod routes;

/// Shared by every request.
#[derive(Debug)]
pub struct AppState {
    pub config: ApiConfig,
    /// Held for the whole of a pipeline run; runs share one output directory.
    pub run_lock: Arc<tokio::sync::Mutex<()>>,
}

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(config: ApiConfig) -> Router {
    let body_limit = config.max_upload_bytes;
    let state = Arc::new(AppState {
        config,
        run_lock: Arc::new(tokio::sync::Mutex::new(())),
    });

    Router::new()
        .route("/health", get(routes::system::health))
        .route("/api/forecast", post(routes::forecast::upload_and_run))
        .route("/ml-outputs/:name", get(routes::outputs::download))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(Extension(state))
}
