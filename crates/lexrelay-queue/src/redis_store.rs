// SPDX-FileCopyrightText: 2026 Lexrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Redis implementation of the queue store.
//!
//! Layout under the configured key prefix:
//! - `{prefix}:message_queue` — FIFO list of pending messages (JSON)
//! - `{prefix}:processing_queue` — set of in-flight message ids
//! - `{prefix}:failed_queue` — set of quarantined message ids
//! - `{prefix}:failed_message:{id}` — full JSON blob of a quarantined message

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;

use lexrelay_core::error::RelayError;
use lexrelay_core::traits::QueueStore;
use lexrelay_core::types::OutboundMessage;

/// Redis-backed [`QueueStore`]. Cheap to clone; each operation checks out a
/// multiplexed connection from the shared client.
#[derive(Debug, Clone)]
pub struct RedisQueueStore {
    client: redis::Client,
    pending_key: String,
    in_flight_key: String,
    failed_key: String,
    blob_prefix: String,
}

impl RedisQueueStore {
    /// Opens a client against `url`. The connection itself is established
    /// lazily on first use, so this succeeds even while Redis is down.
    pub fn new(url: &str, key_prefix: &str) -> Result<Self, RelayError> {
        let client = redis::Client::open(url)
            .map_err(|e| RelayError::store("invalid redis url", e))?;
        Ok(Self {
            client,
            pending_key: format!("{key_prefix}:message_queue"),
            in_flight_key: format!("{key_prefix}:processing_queue"),
            failed_key: format!("{key_prefix}:failed_queue"),
            blob_prefix: format!("{key_prefix}:failed_message"),
        })
    }

    async fn conn(&self) -> Result<redis::aio::MultiplexedConnection, RelayError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| RelayError::store("redis connection failed", e))
    }

    fn blob_key(&self, id: &str) -> String {
        format!("{}:{id}", self.blob_prefix)
    }
}

#[async_trait]
impl QueueStore for RedisQueueStore {
    async fn push_pending(&self, msg: &OutboundMessage) -> Result<(), RelayError> {
        let raw = serde_json::to_string(msg)
            .map_err(|e| RelayError::store("failed to encode message", e))?;
        let mut conn = self.conn().await?;
        let _: () = conn
            .rpush(&self.pending_key, raw)
            .await
            .map_err(|e| RelayError::store("RPUSH failed", e))?;
        Ok(())
    }

    async fn pop_pending(
        &self,
        timeout: Duration,
    ) -> Result<Option<OutboundMessage>, RelayError> {
        let mut conn = self.conn().await?;
        // BLPOP with a zero timeout would block forever; clamp to a small
        // positive wait so the worker loop stays responsive to shutdown.
        let secs = timeout.as_secs_f64().max(0.1);
        let popped: Option<(String, String)> = conn
            .blpop(&self.pending_key, secs)
            .await
            .map_err(|e| RelayError::store("BLPOP failed", e))?;
        match popped {
            Some((_key, raw)) => {
                let msg = serde_json::from_str(&raw)
                    .map_err(|e| RelayError::store("failed to decode message", e))?;
                Ok(Some(msg))
            }
            None => Ok(None),
        }
    }

    async fn pending_len(&self) -> Result<usize, RelayError> {
        let mut conn = self.conn().await?;
        let len: usize = conn
            .llen(&self.pending_key)
            .await
            .map_err(|e| RelayError::store("LLEN failed", e))?;
        Ok(len)
    }

    async fn add_in_flight(&self, id: &str) -> Result<(), RelayError> {
        let mut conn = self.conn().await?;
        let _: () = conn
            .sadd(&self.in_flight_key, id)
            .await
            .map_err(|e| RelayError::store("SADD failed", e))?;
        Ok(())
    }

    async fn remove_in_flight(&self, id: &str) -> Result<(), RelayError> {
        let mut conn = self.conn().await?;
        let _: () = conn
            .srem(&self.in_flight_key, id)
            .await
            .map_err(|e| RelayError::store("SREM failed", e))?;
        Ok(())
    }

    async fn in_flight_members(&self) -> Result<Vec<String>, RelayError> {
        let mut conn = self.conn().await?;
        let members: Vec<String> = conn
            .smembers(&self.in_flight_key)
            .await
            .map_err(|e| RelayError::store("SMEMBERS failed", e))?;
        Ok(members)
    }

    async fn quarantine(&self, msg: &OutboundMessage) -> Result<(), RelayError> {
        let raw = serde_json::to_string(msg)
            .map_err(|e| RelayError::store("failed to encode message", e))?;
        let id = msg.message_id.0.as_str();
        let mut conn = self.conn().await?;
        let _: () = conn
            .set(self.blob_key(id), raw)
            .await
            .map_err(|e| RelayError::store("SET failed", e))?;
        let _: () = conn
            .sadd(&self.failed_key, id)
            .await
            .map_err(|e| RelayError::store("SADD failed", e))?;
        Ok(())
    }

    async fn failed_members(&self) -> Result<Vec<String>, RelayError> {
        let mut conn = self.conn().await?;
        let members: Vec<String> = conn
            .smembers(&self.failed_key)
            .await
            .map_err(|e| RelayError::store("SMEMBERS failed", e))?;
        Ok(members)
    }

    async fn load_failed(&self, id: &str) -> Result<Option<OutboundMessage>, RelayError> {
        let mut conn = self.conn().await?;
        let raw: Option<String> = conn
            .get(self.blob_key(id))
            .await
            .map_err(|e| RelayError::store("GET failed", e))?;
        match raw {
            Some(raw) => {
                let msg = serde_json::from_str(&raw)
                    .map_err(|e| RelayError::store("failed to decode message", e))?;
                Ok(Some(msg))
            }
            None => Ok(None),
        }
    }

    async fn discard_failed(&self, id: &str) -> Result<(), RelayError> {
        let mut conn = self.conn().await?;
        let _: () = conn
            .srem(&self.failed_key, id)
            .await
            .map_err(|e| RelayError::store("SREM failed", e))?;
        let _: () = conn
            .del(self.blob_key(id))
            .await
            .map_err(|e| RelayError::store("DEL failed", e))?;
        Ok(())
    }
}
