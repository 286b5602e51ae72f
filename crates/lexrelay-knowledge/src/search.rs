// SPDX-FileCopyrightText: 2026 Lexrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Knowledge search.
//!
//! With an embedder, entries are ranked by weighted cosine similarity
//! against title (0.6) and content (0.4). Without one, or when the embedder
//! fails at query time, ranking falls back to keyword containment with
//! title matches weighted 3x, curated keywords 2x, and content 1x.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use lexrelay_core::error::RelayError;
use lexrelay_core::traits::{Embedder, KnowledgeStore};
use lexrelay_core::types::{KnowledgeEntry, SearchHit};

/// Only this many leading characters of an entry's content are embedded.
const CONTENT_EMBED_CHARS: usize = 1000;

/// Common Chinese function words excluded from keyword matching.
const STOPWORDS: &[&str] = &[
    "的", "了", "是", "在", "我", "有", "和", "就", "不", "人", "都", "一", "一个", "上", "也",
    "很", "到", "说", "要", "去", "你", "会", "着", "没有", "看", "好", "自己", "这",
];

/// Ranked search over active knowledge entries.
pub struct SearchEngine {
    store: Arc<dyn KnowledgeStore>,
    embedder: Option<Arc<dyn Embedder>>,
    top_k: usize,
}

impl SearchEngine {
    pub fn new(
        store: Arc<dyn KnowledgeStore>,
        embedder: Option<Arc<dyn Embedder>>,
        top_k: usize,
    ) -> Self {
        Self {
            store,
            embedder,
            top_k: top_k.max(1),
        }
    }

    /// Whether the semantic path is active.
    pub fn is_semantic(&self) -> bool {
        self.embedder.is_some()
    }

    /// Returns up to `top_k` hits, best first.
    pub async fn search(
        &self,
        query: &str,
        category: Option<&str>,
    ) -> Result<Vec<SearchHit>, RelayError> {
        let entries = self.store.active_entries(category).await?;
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        if let Some(embedder) = &self.embedder {
            match self.semantic_search(embedder.as_ref(), query, &entries).await {
                Ok(hits) => return Ok(hits),
                Err(e) => {
                    warn!(error = %e, "semantic search failed, falling back to keywords");
                }
            }
        }
        Ok(self.keyword_search(query, entries))
    }

    async fn semantic_search(
        &self,
        embedder: &dyn Embedder,
        query: &str,
        entries: &[KnowledgeEntry],
    ) -> Result<Vec<SearchHit>, RelayError> {
        let query_vec = embedder.embed(query).await?;

        let mut hits = Vec::with_capacity(entries.len());
        for entry in entries {
            let title_vec = embedder.embed(&entry.title).await?;
            let content_vec = embedder
                .embed(truncate_chars(&entry.content, CONTENT_EMBED_CHARS))
                .await?;
            let score =
                cosine(&query_vec, &title_vec) * 0.6 + cosine(&query_vec, &content_vec) * 0.4;
            hits.push(SearchHit {
                entry: entry.clone(),
                score,
            });
        }

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(self.top_k);
        debug!(count = hits.len(), "semantic search completed");
        Ok(hits)
    }

    fn keyword_search(&self, query: &str, entries: Vec<KnowledgeEntry>) -> Vec<SearchHit> {
        let query_words = extract_keywords(query);
        if query_words.is_empty() {
            return Vec::new();
        }

        let mut hits: Vec<SearchHit> = entries
            .into_iter()
            .filter_map(|entry| {
                let title_matches = contained(&query_words, &entry.title);
                let content_matches = contained(&query_words, &entry.content);
                let keyword_matches = entry
                    .keywords
                    .as_deref()
                    .map(|k| contained(&query_words, k))
                    .unwrap_or(0);

                let score = (title_matches * 3 + keyword_matches * 2 + content_matches) as f32;
                (score > 0.0).then_some(SearchHit { entry, score })
            })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(self.top_k);
        debug!(count = hits.len(), "keyword search completed");
        hits
    }
}

/// Number of query words appearing in `text`. Substring containment rather
/// than token equality: entry fields are unsegmented Chinese, so the query
/// word "劳动合同" must match a title like "劳动合同法".
fn contained(query_words: &HashSet<String>, text: &str) -> usize {
    query_words
        .iter()
        .filter(|w| text.contains(w.as_str()))
        .count()
}

/// Splits on whitespace and punctuation, dropping stopwords and
/// single-character tokens.
fn extract_keywords(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() > 1 && !STOPWORDS.contains(w))
        .map(|w| w.to_string())
        .collect()
}

/// Truncates to at most `n` characters without splitting a code point.
fn truncate_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na > f32::EPSILON && nb > f32::EPSILON {
        dot / (na * nb)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteKnowledgeStore;
    use async_trait::async_trait;
    use tempfile::tempdir;

    /// Maps any text mentioning 劳动 onto one axis and everything else onto
    /// the other, making similarity scores exact.
    struct AxisEmbedder;

    #[async_trait]
    impl Embedder for AxisEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, RelayError> {
            if text.contains("劳动") {
                Ok(vec![1.0, 0.0])
            } else {
                Ok(vec![0.0, 1.0])
            }
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, RelayError> {
            Err(RelayError::Classifier("model exploded".into()))
        }
    }

    fn entry(
        knowledge_id: &str,
        title: &str,
        content: &str,
        keywords: Option<&str>,
    ) -> KnowledgeEntry {
        KnowledgeEntry {
            id: 0,
            knowledge_id: knowledge_id.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            category: "劳动纠纷".to_string(),
            subcategory: None,
            keywords: keywords.map(str::to_string),
            status: "active".to_string(),
        }
    }

    async fn seeded_store() -> (Arc<SqliteKnowledgeStore>, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("knowledge.db");
        let store = SqliteKnowledgeStore::open(path.to_str().unwrap())
            .await
            .unwrap();
        store
            .insert(&entry(
                "KB001",
                "劳动合同解除指南",
                "用人单位解除合同应当依法支付经济补偿。",
                Some("劳动合同,解除,赔偿"),
            ))
            .await
            .unwrap();
        store
            .insert(&entry(
                "KB002",
                "离婚财产分割",
                "夫妻共同财产在离婚时原则上均等分割。",
                Some("离婚,财产,分割"),
            ))
            .await
            .unwrap();
        store
            .insert(&entry(
                "KB003",
                "交通事故处理流程",
                "涉及劳动者上下班途中的事故可认定工伤。",
                None,
            ))
            .await
            .unwrap();
        (Arc::new(store), dir)
    }

    #[tokio::test]
    async fn semantic_search_weights_title_over_content() {
        let (store, _dir) = seeded_store().await;
        let engine = SearchEngine::new(store, Some(Arc::new(AxisEmbedder)), 5);

        let hits = engine.search("劳动仲裁", None).await.unwrap();
        assert_eq!(hits.len(), 3);
        // KB001: title and content both mention 劳动 -> 0.6 + 0.4.
        assert_eq!(hits[0].entry.knowledge_id, "KB001");
        assert!((hits[0].score - 1.0).abs() < 1e-5);
        // KB003: only the content mentions 劳动 -> 0.4.
        assert_eq!(hits[1].entry.knowledge_id, "KB003");
        assert!((hits[1].score - 0.4).abs() < 1e-5);
        assert!((hits[2].score - 0.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn keyword_search_weights_curated_keywords() {
        let (store, _dir) = seeded_store().await;
        let engine = SearchEngine::new(store, None, 5);

        // KB001: "劳动合同" in the title (3) plus both words in the curated
        // keywords (2 x 2); neither word appears in the content.
        let hits = engine.search("劳动合同 赔偿", None).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entry.knowledge_id, "KB001");
        assert!((hits[0].score - 7.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn keyword_search_matches_inside_unsegmented_titles() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("knowledge.db");
        let store = SqliteKnowledgeStore::open(path.to_str().unwrap())
            .await
            .unwrap();
        // No curated keywords: the title itself must carry the match even
        // though "劳动合同" is not an exact token of "劳动合同法".
        store
            .insert(&entry(
                "KB010",
                "劳动合同法",
                "规定了用人单位与劳动者订立和履行合同的权利义务。",
                None,
            ))
            .await
            .unwrap();
        store
            .insert(&entry(
                "KB011",
                "交通事故处理流程",
                "发生交通事故后应当立即报警并保护现场。",
                None,
            ))
            .await
            .unwrap();

        let engine = SearchEngine::new(Arc::new(store), None, 5);
        let hits = engine.search("劳动合同", None).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entry.knowledge_id, "KB010");
        assert!((hits[0].score - 3.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn keyword_search_excludes_non_matching_entries() {
        let (store, _dir) = seeded_store().await;
        let engine = SearchEngine::new(store, None, 5);
        let hits = engine.search("专利 侵权", None).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn failing_embedder_falls_back_to_keywords() {
        let (store, _dir) = seeded_store().await;
        let engine = SearchEngine::new(store, Some(Arc::new(FailingEmbedder)), 5);
        let hits = engine.search("劳动合同 赔偿", None).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entry.knowledge_id, "KB001");
    }

    #[tokio::test]
    async fn category_filter_restricts_candidates() {
        let (store, _dir) = seeded_store().await;
        let engine = SearchEngine::new(store, Some(Arc::new(AxisEmbedder)), 5);
        let hits = engine.search("劳动仲裁", Some("不存在的分类")).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn top_k_truncates_results() {
        let (store, _dir) = seeded_store().await;
        let engine = SearchEngine::new(store, Some(Arc::new(AxisEmbedder)), 1);
        let hits = engine.search("劳动仲裁", None).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entry.knowledge_id, "KB001");
    }

    #[test]
    fn keyword_extraction_drops_stopwords_and_single_chars() {
        let words = extract_keywords("我 想 了解 劳动合同 的 解除");
        assert!(words.contains("劳动合同"));
        assert!(words.contains("解除"));
        assert!(words.contains("了解"));
        assert!(!words.contains("我"));
        assert!(!words.contains("的"));
    }

    #[test]
    fn truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("劳动合同", 2), "劳动");
        assert_eq!(truncate_chars("short", 100), "short");
    }

    #[test]
    fn cosine_of_orthogonal_vectors_is_zero() {
        assert!((cosine(&[1.0, 0.0], &[0.0, 1.0])).abs() < f32::EPSILON);
        assert!((cosine(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert_eq!(cosine(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }
}
