// SPDX-FileCopyrightText: 2026 Lexrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dialogue session store trait.

use async_trait::async_trait;

use crate::error::RelayError;
use crate::types::{CustomerId, DialogueRound, DialogueSession};

/// Store for per-customer dialogue sessions.
///
/// Encapsulates the session map behind an injectable seam: an in-memory map
/// in tests and single-process deployments, an external cache in clustered
/// ones. Never a bare module-level map.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetches the customer's session, creating a fresh one if none exists
    /// or the existing one has been inactive beyond the configured timeout.
    async fn get_or_create(&self, customer_id: &CustomerId) -> Result<DialogueSession, RelayError>;

    /// Appends a round to the customer's session, dropping the oldest round
    /// when the configured cap is exceeded, and refreshes `last_active_at`.
    async fn append_round(
        &self,
        customer_id: &CustomerId,
        round: DialogueRound,
    ) -> Result<(), RelayError>;

    /// Returns the customer's rounds without mutating session liveness.
    async fn history(&self, customer_id: &CustomerId) -> Result<Vec<DialogueRound>, RelayError>;

    /// Removes the customer's session outright.
    async fn clear(&self, customer_id: &CustomerId) -> Result<(), RelayError>;

    /// Evicts every session inactive beyond the timeout. Returns the number
    /// evicted. Housekeeping only; correctness does not depend on it.
    async fn evict_expired(&self) -> Result<usize, RelayError>;
}
