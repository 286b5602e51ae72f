// SPDX-FileCopyrightText: 2026 Lexrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue store contract: pending list, in-flight set, failed set + blobs.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::RelayError;
use crate::types::OutboundMessage;

/// External store holding all mutable delivery state.
///
/// The contract mirrors Redis primitives: a FIFO list for pending messages,
/// a set of in-flight ids, and a failed set plus a per-id blob carrying the
/// full message for later retry. All cross-task coordination goes through
/// this store; the worker and the retry scheduler hold no shared memory.
///
/// Moves between states are performed remove-then-insert by the callers so
/// that an id never appears in two states at once.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Appends a message to the tail of the pending list.
    async fn push_pending(&self, msg: &OutboundMessage) -> Result<(), RelayError>;

    /// Pops the head of the pending list, blocking up to `timeout`.
    ///
    /// Returns `Ok(None)` when the timeout elapses with an empty list, which
    /// keeps the worker loop responsive to shutdown.
    async fn pop_pending(&self, timeout: Duration) -> Result<Option<OutboundMessage>, RelayError>;

    /// Current length of the pending list.
    async fn pending_len(&self) -> Result<usize, RelayError>;

    /// Adds an id to the in-flight set.
    async fn add_in_flight(&self, id: &str) -> Result<(), RelayError>;

    /// Removes an id from the in-flight set.
    async fn remove_in_flight(&self, id: &str) -> Result<(), RelayError>;

    /// All ids currently in flight.
    async fn in_flight_members(&self) -> Result<Vec<String>, RelayError>;

    /// Quarantines a message: adds its id to the failed set and persists the
    /// full message as a blob keyed by id.
    async fn quarantine(&self, msg: &OutboundMessage) -> Result<(), RelayError>;

    /// All ids currently quarantined.
    async fn failed_members(&self) -> Result<Vec<String>, RelayError>;

    /// Loads the persisted blob of a quarantined message, if present.
    async fn load_failed(&self, id: &str) -> Result<Option<OutboundMessage>, RelayError>;

    /// Drops a quarantined message: removes its id from the failed set and
    /// deletes the blob.
    async fn discard_failed(&self, id: &str) -> Result<(), RelayError>;
}
