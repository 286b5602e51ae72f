// SPDX-FileCopyrightText: 2026 Lexrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Batch delivery worker.
//!
//! The [`DeliveryWorker`] drains the pending list in batches and dispatches
//! each batch concurrently through the message gateway. A message that fails
//! delivery is quarantined with an incremented retry count and a backoff
//! deadline; the retry scheduler promotes it back later.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use lexrelay_config::model::QueueConfig;
use lexrelay_core::error::RelayError;
use lexrelay_core::traits::{MessageGateway, QueueStore};
use lexrelay_core::types::{MessageId, OutboundMessage};

use crate::retry::backoff_delay;

/// Write side of the delivery queue.
///
/// Handlers enqueue replies here instead of calling the gateway directly,
/// so that delivery failures never propagate back into request handling.
#[derive(Clone)]
pub struct Outbox {
    store: Arc<dyn QueueStore>,
    gateway: Arc<dyn MessageGateway>,
}

impl Outbox {
    pub fn new(store: Arc<dyn QueueStore>, gateway: Arc<dyn MessageGateway>) -> Self {
        Self { store, gateway }
    }

    /// Enqueues a text message for delivery and returns its id.
    ///
    /// When the queue store is unreachable the message is sent directly
    /// through the gateway as a degraded path. If that also fails, the
    /// message is dropped and the store error is returned.
    pub async fn enqueue(
        &self,
        recipient_id: &str,
        body: &str,
    ) -> Result<MessageId, RelayError> {
        let msg = OutboundMessage::new(recipient_id, body);
        let id = msg.message_id.clone();
        match self.store.push_pending(&msg).await {
            Ok(()) => {
                debug!(message_id = %id, recipient = recipient_id, "message enqueued");
                Ok(id)
            }
            Err(store_err) => {
                warn!(
                    message_id = %id,
                    error = %store_err,
                    "queue store unavailable, attempting direct send"
                );
                match self.gateway.send_text(recipient_id, body).await {
                    Ok(true) => {
                        info!(message_id = %id, "message delivered via degraded direct send");
                        Ok(id)
                    }
                    Ok(false) | Err(_) => {
                        warn!(message_id = %id, "direct send failed, message dropped");
                        Err(store_err)
                    }
                }
            }
        }
    }
}

/// Background loop that drains the pending list and dispatches deliveries.
pub struct DeliveryWorker {
    store: Arc<dyn QueueStore>,
    gateway: Arc<dyn MessageGateway>,
    batch_size: usize,
    batch_timeout: Duration,
    pop_timeout: Duration,
}

impl DeliveryWorker {
    pub fn new(
        store: Arc<dyn QueueStore>,
        gateway: Arc<dyn MessageGateway>,
        config: &QueueConfig,
    ) -> Self {
        Self {
            store,
            gateway,
            batch_size: config.batch_size.max(1),
            batch_timeout: Duration::from_millis(config.batch_timeout_ms),
            pop_timeout: Duration::from_secs(config.pop_timeout_secs),
        }
    }

    /// Runs until the token is cancelled. Shutdown latency is bounded by the
    /// blocking-pop timeout.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(batch_size = self.batch_size, "delivery worker started");
        while !cancel.is_cancelled() {
            let batch = self.collect_batch(&cancel).await;
            if !batch.is_empty() {
                self.dispatch_batch(batch).await;
            }
        }
        info!("delivery worker stopped");
    }

    /// Pops messages until the batch is full or the batch window elapses.
    /// The window opens when the first message arrives, so an idle worker
    /// simply blocks on the pop.
    ///
    /// Messages whose backoff deadline has not passed yet are pushed back to
    /// the tail of the pending list instead of being dispatched.
    async fn collect_batch(&self, cancel: &CancellationToken) -> Vec<OutboundMessage> {
        let mut deadline: Option<tokio::time::Instant> = None;
        let mut batch = Vec::with_capacity(self.batch_size);

        while batch.len() < self.batch_size && !cancel.is_cancelled() {
            let wait = match deadline {
                None => self.pop_timeout,
                Some(d) => {
                    let remaining = d.saturating_duration_since(tokio::time::Instant::now());
                    if remaining.is_zero() {
                        break;
                    }
                    self.pop_timeout.min(remaining)
                }
            };
            let popped = tokio::select! {
                res = self.store.pop_pending(wait) => res,
                _ = cancel.cancelled() => break,
            };
            match popped {
                Ok(Some(msg)) => {
                    if msg.is_due(Utc::now()) {
                        if batch.is_empty() {
                            deadline = Some(tokio::time::Instant::now() + self.batch_timeout);
                        }
                        batch.push(msg);
                    } else {
                        debug!(message_id = %msg.message_id, "message not yet due, requeued");
                        if let Err(e) = self.store.push_pending(&msg).await {
                            warn!(message_id = %msg.message_id, error = %e, "requeue failed");
                        }
                        // Idle a beat so a not-yet-due head does not spin
                        // the pop/requeue cycle.
                        tokio::select! {
                            _ = tokio::time::sleep(self.pop_timeout) => {}
                            _ = cancel.cancelled() => {}
                        }
                        break;
                    }
                }
                Ok(None) => {
                    if !batch.is_empty() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "queue pop failed, backing off");
                    tokio::select! {
                        _ = tokio::time::sleep(Duration::from_secs(1)) => {}
                        _ = cancel.cancelled() => {}
                    }
                    break;
                }
            }
        }
        batch
    }

    /// Delivers a batch concurrently. Each message is tracked in the
    /// in-flight set for the duration of its attempt.
    async fn dispatch_batch(&self, batch: Vec<OutboundMessage>) {
        debug!(count = batch.len(), "dispatching delivery batch");
        let attempts = batch.into_iter().map(|msg| self.deliver_one(msg));
        futures::future::join_all(attempts).await;
    }

    async fn deliver_one(&self, mut msg: OutboundMessage) {
        let id = msg.message_id.clone();
        if let Err(e) = self.store.add_in_flight(&id.0).await {
            warn!(message_id = %id, error = %e, "failed to mark message in flight");
        }

        let delivered = match self
            .gateway
            .send_text(&msg.recipient_id.0, &msg.body)
            .await
        {
            Ok(true) => true,
            Ok(false) => {
                warn!(message_id = %id, "delivery rejected by platform");
                false
            }
            Err(e) => {
                warn!(message_id = %id, error = %e, "delivery transport error");
                false
            }
        };

        if let Err(e) = self.store.remove_in_flight(&id.0).await {
            warn!(message_id = %id, error = %e, "failed to clear in-flight marker");
        }

        if delivered {
            info!(message_id = %id, retry_count = msg.retry_count, "message delivered");
            return;
        }

        msg.retry_count += 1;
        let delay = backoff_delay(msg.retry_count);
        msg.next_retry_at = Some(Utc::now() + chrono::Duration::from_std(delay).unwrap_or_default());
        warn!(
            message_id = %id,
            retry_count = msg.retry_count,
            backoff_secs = delay.as_secs(),
            "message quarantined for retry"
        );
        if let Err(e) = self.store.quarantine(&msg).await {
            warn!(message_id = %id, error = %e, "quarantine failed, message lost");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexrelay_test_utils::{InMemoryQueueStore, MockGateway, SendOutcome, UnavailableQueueStore};

    fn test_config() -> QueueConfig {
        QueueConfig {
            batch_size: 4,
            batch_timeout_ms: 50,
            pop_timeout_secs: 1,
            ..QueueConfig::default()
        }
    }

    #[tokio::test]
    async fn enqueue_pushes_to_pending_list() {
        let store = Arc::new(InMemoryQueueStore::new());
        let gateway = Arc::new(MockGateway::new());
        let outbox = Outbox::new(store.clone(), gateway.clone());

        let id = outbox.enqueue("user1", "您好").await.unwrap();
        assert!(!id.0.is_empty());
        assert_eq!(store.pending_len().await.unwrap(), 1);
        assert_eq!(gateway.sent_count().await, 0);
    }

    #[tokio::test]
    async fn degraded_enqueue_direct_sends_when_store_is_down() {
        let gateway = Arc::new(MockGateway::new());
        let outbox = Outbox::new(Arc::new(UnavailableQueueStore), gateway.clone());

        let id = outbox.enqueue("user1", "您好").await.unwrap();
        assert!(!id.0.is_empty());
        let sent = gateway.sent_messages().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "user1");
        assert_eq!(sent[0].1, "您好");
    }

    #[tokio::test]
    async fn degraded_enqueue_drops_message_when_direct_send_fails_too() {
        let gateway = Arc::new(MockGateway::new());
        gateway.script_outcome(SendOutcome::TransportError).await;
        let outbox = Outbox::new(Arc::new(UnavailableQueueStore), gateway.clone());

        let err = outbox.enqueue("user1", "您好").await.unwrap_err();
        // The store failure is reported, not the send failure.
        assert!(matches!(err, RelayError::Store { .. }));
    }

    #[tokio::test]
    async fn worker_delivers_pending_messages() {
        let store = Arc::new(InMemoryQueueStore::new());
        let gateway = Arc::new(MockGateway::new());
        let outbox = Outbox::new(store.clone(), gateway.clone());
        outbox.enqueue("user1", "first").await.unwrap();
        outbox.enqueue("user2", "second").await.unwrap();

        let worker = DeliveryWorker::new(store.clone(), gateway.clone(), &test_config());
        let cancel = CancellationToken::new();
        let handle = {
            let cancel = cancel.clone();
            tokio::spawn(async move { worker.run(cancel).await })
        };

        tokio::time::sleep(Duration::from_millis(200)).await;
        cancel.cancel();
        handle.await.unwrap();

        let sent = gateway.sent_messages().await;
        assert_eq!(sent.len(), 2);
        assert_eq!(store.pending_len().await.unwrap(), 0);
        assert!(store.in_flight_members().await.unwrap().is_empty());
        assert!(store.failed_members().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_delivery_is_quarantined_with_backoff() {
        let store = Arc::new(InMemoryQueueStore::new());
        let gateway = Arc::new(MockGateway::new());
        gateway.script_outcome(SendOutcome::TransportError).await;

        let msg = OutboundMessage::new("user1", "hello");
        let id = msg.message_id.clone();
        store.push_pending(&msg).await.unwrap();

        let worker = DeliveryWorker::new(store.clone(), gateway.clone(), &test_config());
        let cancel = CancellationToken::new();
        let handle = {
            let cancel = cancel.clone();
            tokio::spawn(async move { worker.run(cancel).await })
        };
        tokio::time::sleep(Duration::from_millis(200)).await;
        cancel.cancel();
        handle.await.unwrap();

        let failed = store.load_failed(&id.0).await.unwrap().unwrap();
        assert_eq!(failed.retry_count, 1);
        let next = failed.next_retry_at.unwrap();
        assert!(next > Utc::now());
        // First retry backs off one second.
        assert!(next <= Utc::now() + chrono::Duration::seconds(2));
        // Quarantined, not pending or in flight.
        assert_eq!(store.locations(&id.0).await, vec!["failed"]);
    }

    #[tokio::test]
    async fn platform_rejection_is_quarantined_too() {
        let store = Arc::new(InMemoryQueueStore::new());
        let gateway = Arc::new(MockGateway::new());
        gateway.script_outcome(SendOutcome::Rejected).await;

        let msg = OutboundMessage::new("user1", "hello");
        let id = msg.message_id.clone();
        store.push_pending(&msg).await.unwrap();

        let worker = DeliveryWorker::new(store.clone(), gateway.clone(), &test_config());
        let cancel = CancellationToken::new();
        let handle = {
            let cancel = cancel.clone();
            tokio::spawn(async move { worker.run(cancel).await })
        };
        tokio::time::sleep(Duration::from_millis(200)).await;
        cancel.cancel();
        handle.await.unwrap();

        assert_eq!(store.failed_members().await.unwrap(), vec![id.0]);
    }

    #[tokio::test]
    async fn not_due_message_is_pushed_back() {
        let store = Arc::new(InMemoryQueueStore::new());
        let gateway = Arc::new(MockGateway::new());

        let mut msg = OutboundMessage::new("user1", "later");
        msg.next_retry_at = Some(Utc::now() + chrono::Duration::seconds(3600));
        store.push_pending(&msg).await.unwrap();

        let worker = DeliveryWorker::new(store.clone(), gateway.clone(), &test_config());
        let cancel = CancellationToken::new();
        let handle = {
            let cancel = cancel.clone();
            tokio::spawn(async move { worker.run(cancel).await })
        };
        tokio::time::sleep(Duration::from_millis(150)).await;
        cancel.cancel();
        handle.await.unwrap();

        assert_eq!(gateway.sent_count().await, 0);
        assert_eq!(store.pending_len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn worker_stops_on_cancellation() {
        let store = Arc::new(InMemoryQueueStore::new());
        let gateway = Arc::new(MockGateway::new());
        let worker = DeliveryWorker::new(store, gateway, &test_config());
        let cancel = CancellationToken::new();
        cancel.cancel();
        // Already-cancelled token returns without popping.
        worker.run(cancel).await;
    }
}
