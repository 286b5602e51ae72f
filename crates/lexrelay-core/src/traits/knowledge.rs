// SPDX-FileCopyrightText: 2026 Lexrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Knowledge base store trait.

use async_trait::async_trait;

use crate::error::RelayError;
use crate::types::KnowledgeEntry;

/// Persistence seam for knowledge base articles.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Inserts an entry, returning its row id.
    async fn insert(&self, entry: &KnowledgeEntry) -> Result<i64, RelayError>;

    /// Fetches an entry by its stable business key.
    async fn get_by_knowledge_id(&self, knowledge_id: &str)
        -> Result<Option<KnowledgeEntry>, RelayError>;

    /// All active entries, optionally filtered by category. The search
    /// engine ranks over this candidate set.
    async fn active_entries(
        &self,
        category: Option<&str>,
    ) -> Result<Vec<KnowledgeEntry>, RelayError>;
}
