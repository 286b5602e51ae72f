// SPDX-FileCopyrightText: 2026 Lexrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retry scheduler: promotes quarantined messages back into the pending
//! list once their backoff deadline passes, and permanently drops messages
//! that have exhausted their retry budget.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use lexrelay_core::error::RelayError;
use lexrelay_core::traits::QueueStore;

/// Delay before retry attempt `retry_count`, doubling from one second and
/// capped at thirty: 1, 2, 4, 8, 16, 30.
pub fn backoff_delay(retry_count: u32) -> Duration {
    let exp = retry_count.saturating_sub(1).min(5);
    Duration::from_secs((1u64 << exp).min(30))
}

/// Periodic reconciler for the failed set and the in-flight set.
pub struct RetryScheduler {
    store: Arc<dyn QueueStore>,
    max_retries: u32,
}

impl RetryScheduler {
    pub fn new(store: Arc<dyn QueueStore>, max_retries: u32) -> Self {
        Self { store, max_retries }
    }

    /// Scans up to `limit` quarantined messages and re-queues the ones whose
    /// backoff deadline has passed. Messages over the retry budget are
    /// dropped permanently. Returns the number re-queued.
    pub async fn retry_failed(&self, limit: usize) -> Result<usize, RelayError> {
        let members = self.store.failed_members().await?;
        let mut requeued = 0usize;

        for id in members.into_iter().take(limit) {
            let Some(msg) = self.store.load_failed(&id).await? else {
                // Membership without a blob: nothing left to retry.
                warn!(message_id = %id, "failed-set entry has no blob, discarding");
                self.store.discard_failed(&id).await?;
                continue;
            };

            if msg.retry_count > self.max_retries {
                warn!(
                    message_id = %id,
                    retry_count = msg.retry_count,
                    "retry budget exhausted, message dropped"
                );
                self.store.discard_failed(&id).await?;
                continue;
            }

            if !msg.is_due(Utc::now()) {
                debug!(message_id = %id, "message still backing off");
                continue;
            }

            self.store.discard_failed(&id).await?;
            self.store.push_pending(&msg).await?;
            requeued += 1;
        }

        if requeued > 0 {
            info!(count = requeued, "re-queued failed messages");
        }
        Ok(requeued)
    }

    /// Drops every quarantined message. Returns the number discarded.
    pub async fn clear_failed(&self) -> Result<usize, RelayError> {
        let members = self.store.failed_members().await?;
        let count = members.len();
        for id in &members {
            self.store.discard_failed(id).await?;
        }
        if count > 0 {
            info!(count, "cleared failed messages");
        }
        Ok(count)
    }

    /// Reconciles in-flight markers left behind by a crashed worker.
    ///
    /// An id whose quarantine blob survives is re-queued; an id with no blob
    /// has lost its payload (it was popped from the pending list before the
    /// crash) and can only be removed. Returns the number re-queued.
    pub async fn requeue_in_flight(&self) -> Result<usize, RelayError> {
        let members = self.store.in_flight_members().await?;
        let mut requeued = 0usize;

        for id in members {
            match self.store.load_failed(&id).await? {
                Some(msg) => {
                    self.store.remove_in_flight(&id).await?;
                    self.store.discard_failed(&id).await?;
                    self.store.push_pending(&msg).await?;
                    requeued += 1;
                }
                None => {
                    warn!(message_id = %id, "orphaned in-flight marker, payload unrecoverable");
                    self.store.remove_in_flight(&id).await?;
                }
            }
        }
        Ok(requeued)
    }
}
