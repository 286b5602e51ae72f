// SPDX-FileCopyrightText: 2026 Lexrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory queue store for deterministic testing.
//!
//! Honors the full `QueueStore` contract, including the bounded-timeout
//! blocking pop, without a Redis server. Messages cross the store as JSON
//! exactly like the Redis implementation, so serialization bugs surface in
//! unit tests too.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use lexrelay_core::error::RelayError;
use lexrelay_core::traits::QueueStore;
use lexrelay_core::types::OutboundMessage;

#[derive(Default)]
struct Inner {
    pending: VecDeque<String>,
    in_flight: HashSet<String>,
    failed: HashSet<String>,
    blobs: HashMap<String, String>,
}

/// An in-process [`QueueStore`] backed by a mutex-guarded state block.
pub struct InMemoryQueueStore {
    inner: Arc<Mutex<Inner>>,
    notify: Arc<Notify>,
}

impl InMemoryQueueStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Which queue states currently hold the given message id. Used by
    /// tests asserting the single-location invariant.
    pub async fn locations(&self, id: &str) -> Vec<&'static str> {
        let inner = self.inner.lock().await;
        let mut out = Vec::new();
        if inner
            .pending
            .iter()
            .any(|raw| serde_json::from_str::<OutboundMessage>(raw)
                .is_ok_and(|m| m.message_id.0 == id))
        {
            out.push("pending");
        }
        if inner.in_flight.contains(id) {
            out.push("in_flight");
        }
        if inner.failed.contains(id) {
            out.push("failed");
        }
        out
    }
}

impl Default for InMemoryQueueStore {
    fn default() -> Self {
        Self::new()
    }
}

fn encode(msg: &OutboundMessage) -> Result<String, RelayError> {
    serde_json::to_string(msg)
        .map_err(|e| RelayError::store("failed to encode message", e))
}

fn decode(raw: &str) -> Result<OutboundMessage, RelayError> {
    serde_json::from_str(raw)
        .map_err(|e| RelayError::store("failed to decode message", e))
}

#[async_trait]
impl QueueStore for InMemoryQueueStore {
    async fn push_pending(&self, msg: &OutboundMessage) -> Result<(), RelayError> {
        let raw = encode(msg)?;
        self.inner.lock().await.pending.push_back(raw);
        self.notify.notify_one();
        Ok(())
    }

    async fn pop_pending(
        &self,
        timeout: Duration,
    ) -> Result<Option<OutboundMessage>, RelayError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            {
                let mut inner = self.inner.lock().await;
                if let Some(raw) = inner.pending.pop_front() {
                    return Ok(Some(decode(&raw)?));
                }
            }
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            if tokio::time::timeout(remaining, self.notify.notified())
                .await
                .is_err()
            {
                return Ok(None);
            }
        }
    }

    async fn pending_len(&self) -> Result<usize, RelayError> {
        Ok(self.inner.lock().await.pending.len())
    }

    async fn add_in_flight(&self, id: &str) -> Result<(), RelayError> {
        self.inner.lock().await.in_flight.insert(id.to_string());
        Ok(())
    }

    async fn remove_in_flight(&self, id: &str) -> Result<(), RelayError> {
        self.inner.lock().await.in_flight.remove(id);
        Ok(())
    }

    async fn in_flight_members(&self) -> Result<Vec<String>, RelayError> {
        Ok(self.inner.lock().await.in_flight.iter().cloned().collect())
    }

    async fn quarantine(&self, msg: &OutboundMessage) -> Result<(), RelayError> {
        let raw = encode(msg)?;
        let mut inner = self.inner.lock().await;
        inner.failed.insert(msg.message_id.0.clone());
        inner.blobs.insert(msg.message_id.0.clone(), raw);
        Ok(())
    }

    async fn failed_members(&self) -> Result<Vec<String>, RelayError> {
        Ok(self.inner.lock().await.failed.iter().cloned().collect())
    }

    async fn load_failed(&self, id: &str) -> Result<Option<OutboundMessage>, RelayError> {
        let inner = self.inner.lock().await;
        match inner.blobs.get(id) {
            Some(raw) => Ok(Some(decode(raw)?)),
            None => Ok(None),
        }
    }

    async fn discard_failed(&self, id: &str) -> Result<(), RelayError> {
        let mut inner = self.inner.lock().await;
        inner.failed.remove(id);
        inner.blobs.remove(id);
        Ok(())
    }
}

/// A [`QueueStore`] that fails every operation, standing in for an
/// unreachable Redis server when exercising degraded paths.
pub struct UnavailableQueueStore;

fn unavailable() -> RelayError {
    RelayError::Store {
        message: "queue store unavailable".to_string(),
        source: None,
    }
}

#[async_trait]
impl QueueStore for UnavailableQueueStore {
    async fn push_pending(&self, _msg: &OutboundMessage) -> Result<(), RelayError> {
        Err(unavailable())
    }

    async fn pop_pending(
        &self,
        _timeout: Duration,
    ) -> Result<Option<OutboundMessage>, RelayError> {
        Err(unavailable())
    }

    async fn pending_len(&self) -> Result<usize, RelayError> {
        Err(unavailable())
    }

    async fn add_in_flight(&self, _id: &str) -> Result<(), RelayError> {
        Err(unavailable())
    }

    async fn remove_in_flight(&self, _id: &str) -> Result<(), RelayError> {
        Err(unavailable())
    }

    async fn in_flight_members(&self) -> Result<Vec<String>, RelayError> {
        Err(unavailable())
    }

    async fn quarantine(&self, _msg: &OutboundMessage) -> Result<(), RelayError> {
        Err(unavailable())
    }

    async fn failed_members(&self) -> Result<Vec<String>, RelayError> {
        Err(unavailable())
    }

    async fn load_failed(&self, _id: &str) -> Result<Option<OutboundMessage>, RelayError> {
        Err(unavailable())
    }

    async fn discard_failed(&self, _id: &str) -> Result<(), RelayError> {
        Err(unavailable())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn push_then_pop_round_trips() {
        let store = InMemoryQueueStore::new();
        let msg = OutboundMessage::new("user1", "hello");
        store.push_pending(&msg).await.unwrap();
        assert_eq!(store.pending_len().await.unwrap(), 1);

        let popped = store
            .pop_pending(Duration::from_millis(10))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(popped.message_id, msg.message_id);
        assert_eq!(store.pending_len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn pop_times_out_on_empty_queue() {
        let store = InMemoryQueueStore::new();
        let start = tokio::time::Instant::now();
        let popped = store.pop_pending(Duration::from_millis(20)).await.unwrap();
        assert!(popped.is_none());
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn blocked_pop_wakes_on_push() {
        let store = Arc::new(InMemoryQueueStore::new());
        let popper = {
            let store = store.clone();
            tokio::spawn(async move { store.pop_pending(Duration::from_secs(5)).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        store
            .push_pending(&OutboundMessage::new("user1", "wake up"))
            .await
            .unwrap();
        let popped = popper.await.unwrap().unwrap();
        assert_eq!(popped.unwrap().body, "wake up");
    }

    #[tokio::test]
    async fn quarantine_stores_blob_and_membership() {
        let store = InMemoryQueueStore::new();
        let msg = OutboundMessage::new("user1", "hello");
        store.quarantine(&msg).await.unwrap();

        assert_eq!(store.failed_members().await.unwrap(), vec![msg.message_id.0.clone()]);
        let loaded = store.load_failed(&msg.message_id.0).await.unwrap().unwrap();
        assert_eq!(loaded.body, "hello");

        store.discard_failed(&msg.message_id.0).await.unwrap();
        assert!(store.failed_members().await.unwrap().is_empty());
        assert!(store.load_failed(&msg.message_id.0).await.unwrap().is_none());
    }
}
