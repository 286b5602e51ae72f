// SPDX-FileCopyrightText: 2026 Lexrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedder trait for semantic knowledge search.

use async_trait::async_trait;

use crate::error::RelayError;

/// Produces L2-normalized sentence embeddings.
///
/// When no embedder loads at startup the search engine falls back to
/// keyword-overlap scoring instead.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embeds one text into a normalized vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RelayError>;
}
