//! HTTP layer exposing model inference.

pub mod routes;
pub mod types;

use std::net::SocketAddr;

use anyhow::Result;
use axum::{routing::post, Router};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{
    config::Settings,
    model::{self, SharedModel},
};

/// Request-handler dependencies, built once at startup.
#[derive(Clone, Default)]
pub struct AppState {
    /// `None` when no model file was available at startup.
    pub model: Option<SharedModel>,
}

impl AppState {
    pub fn with_model(model: SharedModel) -> Self {
        Self { model: Some(model) }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/predict", post(routes::predict))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(settings: Settings, host: String, port: u16) -> Result<()> {
    let state = AppState {
        model: model::load_model(&settings.model_path)?,
    };
    let app = router(state);

    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    info!(%addr, "serving inference API");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("inference API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for shutdown signal");
    }
}
