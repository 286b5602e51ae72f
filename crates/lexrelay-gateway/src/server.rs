// SPDX-FileCopyrightText: 2026 Lexrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state. `/health` is public;
//! everything under `/v1` requires bearer auth.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;

use lexrelay_config::model::GatewayConfig;
use lexrelay_core::error::RelayError;
use lexrelay_knowledge::SearchEngine;
use lexrelay_qa::QaManager;
use lexrelay_queue::{Outbox, RetryScheduler};
use lexrelay_wecom::WeComHandler;

use crate::auth::{auth_middleware, AuthConfig};
use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub qa: Arc<QaManager>,
    pub wecom: Arc<WeComHandler>,
    pub outbox: Outbox,
    pub scheduler: Arc<RetryScheduler>,
    pub search: Arc<SearchEngine>,
    /// Scan cap for one POST /v1/queue/retry pass.
    pub retry_limit: usize,
    pub auth: AuthConfig,
    pub started_at: Instant,
}

/// Builds the full route tree: a public health route plus the
/// bearer-protected `/v1` API.
pub fn build_router(state: GatewayState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/v1/messages", post(handlers::post_messages))
        .route("/v1/wecom/callback", post(handlers::post_wecom_callback))
        .route("/v1/qa/answer", post(handlers::post_qa_answer))
        .route("/v1/qa/classify", post(handlers::post_qa_classify))
        .route("/v1/knowledge/search", get(handlers::get_knowledge_search))
        .route("/v1/queue/retry", post(handlers::post_queue_retry))
        .route("/v1/queue/clear-failed", post(handlers::post_queue_clear_failed))
        .route("/v1/dialogues/{customer_id}", get(handlers::get_dialogue))
        .route("/v1/dialogues/{customer_id}", delete(handlers::delete_dialogue))
        .route("/v1/dialogues/sweep", post(handlers::post_dialogue_sweep))
        .route_layer(axum_middleware::from_fn_with_state(
            state.auth.clone(),
            auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(CorsLayer::permissive())
}

/// Binds to the configured host:port and serves until `cancel` fires.
pub async fn start_server(
    config: &GatewayConfig,
    state: GatewayState,
    cancel: CancellationToken,
) -> Result<(), RelayError> {
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| RelayError::gateway(format!("failed to bind gateway to {addr}"), e))?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| RelayError::gateway("gateway server error", e))?;

    Ok(())
}
