// SPDX-FileCopyrightText: 2026 Lexrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the REST API.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use lexrelay_core::error::RelayError;
use lexrelay_core::types::{AnswerResult, CustomerId, DialogueRound};
use lexrelay_wecom::{CallbackResult, InboundEnvelope};

use crate::server::GatewayState;

/// Request body for POST /v1/messages.
#[derive(Debug, Deserialize)]
pub struct EnqueueRequest {
    /// WeCom user id of the recipient.
    pub recipient_id: String,
    /// Plain text message body.
    pub content: String,
}

/// Response body for POST /v1/messages.
#[derive(Debug, Serialize)]
pub struct EnqueueResponse {
    pub message_id: String,
}

/// Request body for POST /v1/qa/answer.
#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub customer_id: String,
    pub query: String,
}

/// Request body for POST /v1/qa/classify.
#[derive(Debug, Deserialize)]
pub struct ClassifyRequest {
    pub text: String,
}

/// Query parameters for GET /v1/knowledge/search.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default)]
    pub category: Option<String>,
}

/// One search result row.
#[derive(Debug, Serialize)]
pub struct SearchHitResponse {
    pub knowledge_id: String,
    pub title: String,
    pub category: String,
    pub score: f32,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub hits: Vec<SearchHitResponse>,
}

/// Response body for the queue maintenance endpoints.
#[derive(Debug, Serialize)]
pub struct QueueMaintenanceResponse {
    pub affected: usize,
}

/// Response body for GET /v1/dialogues/{customer_id}.
#[derive(Debug, Serialize)]
pub struct DialogueResponse {
    pub customer_id: String,
    pub rounds: Vec<DialogueRound>,
}

/// Response body for POST /v1/dialogues/sweep.
#[derive(Debug, Serialize)]
pub struct SweepResponse {
    pub evicted: usize,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn internal_error(e: RelayError) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
        .into_response()
}

/// GET /health (unauthenticated, for liveness probes).
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}

/// POST /v1/messages
///
/// Enqueues an outbound text message and returns its id. Delivery happens
/// asynchronously in the worker.
pub async fn post_messages(
    State(state): State<GatewayState>,
    Json(body): Json<EnqueueRequest>,
) -> Response {
    match state.outbox.enqueue(&body.recipient_id, &body.content).await {
        Ok(id) => (
            StatusCode::ACCEPTED,
            Json(EnqueueResponse {
                message_id: id.to_string(),
            }),
        )
            .into_response(),
        Err(e) => internal_error(e),
    }
}

/// POST /v1/wecom/callback
///
/// Accepts a WeCom message callback and runs it through the QA pipeline.
/// Always returns 200 so WeCom does not redeliver; the body reports the
/// processing outcome.
pub async fn post_wecom_callback(
    State(state): State<GatewayState>,
    Json(envelope): Json<InboundEnvelope>,
) -> Json<CallbackResult> {
    Json(state.wecom.receive(&envelope).await)
}

/// POST /v1/qa/answer
///
/// Answers a query directly, without going through the delivery queue.
pub async fn post_qa_answer(
    State(state): State<GatewayState>,
    Json(body): Json<AnswerRequest>,
) -> Json<AnswerResult> {
    let customer_id = CustomerId(body.customer_id);
    Json(state.qa.answer(&customer_id, &body.query).await)
}

/// POST /v1/qa/classify
pub async fn post_qa_classify(
    State(state): State<GatewayState>,
    Json(body): Json<ClassifyRequest>,
) -> Response {
    match state.qa.classify(&body.text).await {
        Ok(classification) => Json(classification).into_response(),
        Err(e) => internal_error(e),
    }
}

/// GET /v1/knowledge/search?q=...&category=...
pub async fn get_knowledge_search(
    State(state): State<GatewayState>,
    Query(params): Query<SearchParams>,
) -> Response {
    match state.search.search(&params.q, params.category.as_deref()).await {
        Ok(hits) => Json(SearchResponse {
            hits: hits
                .into_iter()
                .map(|hit| SearchHitResponse {
                    knowledge_id: hit.entry.knowledge_id,
                    title: hit.entry.title,
                    category: hit.entry.category,
                    score: hit.score,
                })
                .collect(),
        })
        .into_response(),
        Err(e) => internal_error(e),
    }
}

/// POST /v1/queue/retry
///
/// Requeues failed messages whose backoff has elapsed.
pub async fn post_queue_retry(State(state): State<GatewayState>) -> Response {
    match state.scheduler.retry_failed(state.retry_limit).await {
        Ok(requeued) => Json(QueueMaintenanceResponse { affected: requeued }).into_response(),
        Err(e) => internal_error(e),
    }
}

/// POST /v1/queue/clear-failed
pub async fn post_queue_clear_failed(State(state): State<GatewayState>) -> Response {
    match state.scheduler.clear_failed().await {
        Ok(cleared) => Json(QueueMaintenanceResponse { affected: cleared }).into_response(),
        Err(e) => internal_error(e),
    }
}

/// GET /v1/dialogues/{customer_id}
pub async fn get_dialogue(
    State(state): State<GatewayState>,
    Path(customer_id): Path<String>,
) -> Response {
    let id = CustomerId(customer_id);
    match state.qa.sessions().history(&id).await {
        Ok(rounds) => Json(DialogueResponse {
            customer_id: id.0,
            rounds,
        })
        .into_response(),
        Err(e) => internal_error(e),
    }
}

/// DELETE /v1/dialogues/{customer_id}
pub async fn delete_dialogue(
    State(state): State<GatewayState>,
    Path(customer_id): Path<String>,
) -> Response {
    let id = CustomerId(customer_id);
    match state.qa.sessions().clear(&id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => internal_error(e),
    }
}

/// POST /v1/dialogues/sweep
///
/// Evicts expired dialogue sessions and reports how many were removed.
pub async fn post_dialogue_sweep(State(state): State<GatewayState>) -> Response {
    match state.qa.sessions().evict_expired().await {
        Ok(evicted) => Json(SweepResponse { evicted }).into_response(),
        Err(e) => internal_error(e),
    }
}
