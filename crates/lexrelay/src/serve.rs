// SPDX-FileCopyrightText: 2026 Lexrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `lexrelay serve` command implementation.
//!
//! Wires the Redis-backed delivery queue, the WeCom client, the QA pipeline
//! with knowledge search, and the HTTP gateway, then runs until a shutdown
//! signal arrives. The delivery worker and the periodic maintenance tasks
//! (failed-message retry, dialogue sweep) run as background tasks sharing
//! one cancellation token.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use lexrelay_config::model::LexrelayConfig;
use lexrelay_core::error::RelayError;
use lexrelay_core::traits::{
    Embedder, KnowledgeStore, MessageGateway, QueueStore, SessionStore,
};
use lexrelay_gateway::{start_server, AuthConfig, GatewayState};
use lexrelay_knowledge::{OnnxEmbedder, SearchEngine, SqliteKnowledgeStore};
use lexrelay_qa::{select_classifier, InMemorySessionStore, QaManager};
use lexrelay_queue::{DeliveryWorker, Outbox, RedisQueueStore, RetryScheduler};
use lexrelay_wecom::{WeComClient, WeComHandler};

use crate::shutdown;

/// Runs the `lexrelay serve` command.
pub async fn run_serve(config: LexrelayConfig) -> Result<(), RelayError> {
    init_tracing(&config.agent.log_level);

    info!(service = config.agent.name.as_str(), "starting lexrelay serve");

    // Fail-closed: refuse to start with an unauthenticated API surface.
    if config.gateway.bearer_token.is_none() {
        eprintln!(
            "error: gateway bearer token required. Set gateway.bearer_token in lexrelay.toml \
             or the LEXRELAY_GATEWAY_BEARER_TOKEN environment variable."
        );
        return Err(RelayError::Config(
            "gateway enabled but no authentication configured".to_string(),
        ));
    }

    let store: Arc<dyn QueueStore> = Arc::new(RedisQueueStore::new(
        &config.queue.redis_url,
        &config.queue.key_prefix,
    )?);

    let gateway: Arc<dyn MessageGateway> = {
        let client = WeComClient::new(&config.wecom).map_err(|e| {
            error!(error = %e, "failed to initialize WeCom client");
            eprintln!(
                "error: WeCom credentials required. Set wecom.corp_id, wecom.app_secret, \
                 and wecom.agent_id in lexrelay.toml or via environment variables."
            );
            e
        })?;
        Arc::new(client)
    };

    let classifier = select_classifier(&config.qa);

    let knowledge: Arc<dyn KnowledgeStore> =
        Arc::new(SqliteKnowledgeStore::open(&config.knowledge.database_path).await?);

    let embedder: Option<Arc<dyn Embedder>> = match &config.knowledge.embedding_model_dir {
        Some(dir) => match OnnxEmbedder::load(Path::new(dir)) {
            Ok(model) => {
                info!(model_dir = dir.as_str(), "semantic knowledge search enabled");
                Some(Arc::new(model))
            }
            Err(e) => {
                warn!(
                    error = %e,
                    "embedding model load failed, falling back to keyword search"
                );
                None
            }
        },
        None => {
            info!("no embedding model configured, keyword search only");
            None
        }
    };

    let search = Arc::new(SearchEngine::new(
        knowledge,
        embedder,
        config.knowledge.top_k,
    ));

    let sessions: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new(&config.qa));
    let qa = Arc::new(QaManager::new(
        classifier,
        search.clone(),
        sessions.clone(),
        &config.qa,
    ));

    let outbox = Outbox::new(store.clone(), gateway.clone());
    let wecom_handler = Arc::new(WeComHandler::new(qa.clone(), outbox.clone()));
    let scheduler = Arc::new(RetryScheduler::new(store.clone(), config.queue.max_retries));

    // Install signal handler.
    let cancel = shutdown::install_signal_handler();

    // Crash recovery: messages left in flight by a previous run are requeued
    // (or dropped when their payload is unrecoverable).
    match scheduler.requeue_in_flight().await {
        Ok(0) => debug!("no stale in-flight messages"),
        Ok(n) => info!(count = n, "requeued stale in-flight messages"),
        Err(e) => warn!(error = %e, "in-flight recovery failed"),
    }

    // Spawn the delivery worker.
    {
        let worker = DeliveryWorker::new(store.clone(), gateway.clone(), &config.queue);
        let worker_cancel = cancel.clone();
        tokio::spawn(async move {
            worker.run(worker_cancel).await;
        });
    }

    // Spawn the retry scheduler loop.
    {
        let scheduler = scheduler.clone();
        let retry_cancel = cancel.clone();
        let interval_secs = config.queue.analysis_interval_secs.max(1);
        let limit = config.queue.retry_limit;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
            // Skip the first immediate tick.
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        match scheduler.retry_failed(limit).await {
                            Ok(0) => debug!("retry pass found no due messages"),
                            Ok(n) => info!(requeued = n, "retry pass promoted failed messages"),
                            Err(e) => warn!(error = %e, "retry pass failed (non-fatal)"),
                        }
                    }
                    _ = retry_cancel.cancelled() => {
                        info!("retry scheduler shutting down");
                        break;
                    }
                }
            }
        });
        info!(
            interval_secs,
            limit, "retry scheduler started"
        );
    }

    // Spawn the dialogue sweep loop.
    {
        let sessions = sessions.clone();
        let sweep_cancel = cancel.clone();
        let interval_secs = config.queue.analysis_interval_secs.max(1);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        match sessions.evict_expired().await {
                            Ok(0) => debug!("sweep found no expired dialogues"),
                            Ok(n) => info!(evicted = n, "expired dialogues evicted"),
                            Err(e) => warn!(error = %e, "dialogue sweep failed (non-fatal)"),
                        }
                    }
                    _ = sweep_cancel.cancelled() => {
                        info!("dialogue sweep shutting down");
                        break;
                    }
                }
            }
        });
    }

    // Run the HTTP gateway in the foreground until shutdown.
    let state = GatewayState {
        qa,
        wecom: wecom_handler,
        outbox,
        scheduler,
        search,
        retry_limit: config.queue.retry_limit,
        auth: AuthConfig {
            bearer_token: config.gateway.bearer_token.clone(),
        },
        started_at: Instant::now(),
    };
    start_server(&config.gateway, state, cancel.clone()).await?;

    info!("lexrelay serve shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("lexrelay={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
