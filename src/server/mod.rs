//! OAuth HTTP server.
//!
//! Receives the VK ID redirect after a user grants access and exposes a
//! health probe. Runs next to the bot on its own listener.

mod oauth;

use std::net::SocketAddr;

use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use tracing::info;

use crate::bot::dispatcher::{AppState, ThrottledBot};

/// State shared by the HTTP handlers.
#[derive(Clone)]
pub struct ServerState {
    /// Used to tell users how their login ended.
    pub bot: ThrottledBot,
    pub app: AppState,
}

/// Build the router.
pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/vk/callback", get(oauth::vk_callback))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Bind and serve until the process exits.
pub async fn serve(bind: SocketAddr, state: ServerState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("OAuth server listening on http://{}", bind);
    axum::serve(listener, router(state)).await?;
    Ok(())
}
