//! JSON API for browsing, labeling and replaying captured signals.

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use log::info;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::AppState;

mod handlers;

pub const RECENT_LOG_LIMIT: u32 = 20;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/logs", get(handlers::list_logs))
        .route(
            "/api/log/:id",
            get(handlers::get_log).post(handlers::label_log),
        )
        .route("/api/log/:id/message", post(handlers::replay_log))
        .with_state(state)
}

/// Serves the API until `stop` is cancelled, then drains open connections.
pub async fn serve(listener: TcpListener, state: AppState, stop: CancellationToken) -> Result<()> {
    let addr = listener
        .local_addr()
        .context("failed to read listener address")?;
    info!("web interface listening on http://{addr}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { stop.cancelled().await })
        .await
        .context("web server failed")?;

    info!("web interface stopped");
    Ok(())
}
