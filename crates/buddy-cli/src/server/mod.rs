//! Dashboard HTTP API
//!
//! Pipeline and Q&A work runs on spawned tasks, so a client that disconnects
//! mid-request does not cancel it; the session still reaches a terminal
//! status and stays queryable.

mod handlers;
pub mod types;


use anyhow::Context;
use axum::Router;
use axum::routing::{get, post};
use buddy_core::BuddyRuntime;
use tracing::info;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub runtime: BuddyRuntime,
}

/// Build the API router over `runtime`
pub fn router(runtime: BuddyRuntime) -> Router {
    let state = AppState { runtime };
    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/generate-project", post(handlers::generate_project))
        .route("/api/ask-question", post(handlers::ask_question))
        .route(
            "/api/ask-question-streaming",
            post(handlers::ask_question_streaming),
        )
        .route("/api/sessions", get(handlers::list_sessions))
        .route("/api/sessions/{id}", get(handlers::get_session))
        .route("/api/events", get(handlers::stream_events))
        .route("/api/performance-stats", get(handlers::performance_stats))
        .route("/api/generated-projects", get(handlers::generated_projects))
        .route("/api/file-content", get(handlers::file_content))
        .route("/api/save-file", post(handlers::save_file))
        .with_state(state)
}

/// Serve the API until Ctrl-C
pub async fn serve(runtime: BuddyRuntime, address: &str) -> anyhow::Result<()> {
    let app = router(runtime);
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .with_context(|| format!("bind server listener on {address} failed"))?;
    info!("Coder Buddy API listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutting down");
            }
        })
        .await
        .context("server terminated with error")
}
