// SPDX-FileCopyrightText: 2026 Lexrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Answer generation.
//!
//! High-confidence conversational intents (greeting, thanks, complaint) get
//! canned Chinese replies; complaints additionally escalate to a human.
//! Legal intents and low-confidence classifications go through knowledge
//! search. Any internal failure degrades to an apology with escalation, so
//! the customer always receives a reply.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use lexrelay_config::model::QaConfig;
use lexrelay_core::error::RelayError;
use lexrelay_core::traits::{IntentClassifier, SessionStore};
use lexrelay_core::types::{AnswerResult, Classification, CustomerId, DialogueRound, Intent};
use lexrelay_knowledge::SearchEngine;

const GREETING_REPLY: &str = "您好！我是微信法律客服助手，有什么法律问题可以咨询我。";
const THANKS_REPLY: &str = "不客气！如果您还有其他法律问题，随时可以咨询我。";
const COMPLAINT_REPLY: &str = "非常抱歉给您带来不便。您的问题已经记录，我们的客服人员会尽快与您联系。";
const NO_RESULT_REPLY: &str = "抱歉，我没有找到相关的法律信息。";
const APOLOGY_REPLY: &str = "抱歉，我现在无法回答您的问题，请稍后再试。";

/// Characters of knowledge content included in a formatted answer.
const ANSWER_CONTENT_CHARS: usize = 500;

/// Orchestrates one QA turn: classify, dispatch, answer, record.
pub struct QaManager {
    classifier: Arc<dyn IntentClassifier>,
    search: Arc<SearchEngine>,
    sessions: Arc<dyn SessionStore>,
    confidence_threshold: f32,
}

impl QaManager {
    pub fn new(
        classifier: Arc<dyn IntentClassifier>,
        search: Arc<SearchEngine>,
        sessions: Arc<dyn SessionStore>,
        config: &QaConfig,
    ) -> Self {
        Self {
            classifier,
            search,
            sessions,
            confidence_threshold: config.confidence_threshold,
        }
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    /// Classifies `query` without answering it.
    pub async fn classify(&self, query: &str) -> Result<Classification, RelayError> {
        self.classifier.classify(query).await
    }

    /// Answers one customer query. Never fails: internal errors produce an
    /// apology with `escalate_to_human` set.
    pub async fn answer(&self, customer_id: &CustomerId, query: &str) -> AnswerResult {
        match self.try_answer(customer_id, query).await {
            Ok(result) => result,
            Err(e) => {
                warn!(customer = %customer_id, error = %e, "answer pipeline failed");
                AnswerResult {
                    success: false,
                    answer: APOLOGY_REPLY.to_string(),
                    intent: Intent::Other,
                    confidence: 0.0,
                    knowledge_id: None,
                    escalate_to_human: true,
                }
            }
        }
    }

    async fn try_answer(
        &self,
        customer_id: &CustomerId,
        query: &str,
    ) -> Result<AnswerResult, RelayError> {
        // Touch the session first so an expired one is replaced before this
        // round lands in it.
        self.sessions.get_or_create(customer_id).await?;

        let classification = self.classifier.classify(query).await?;
        info!(
            customer = %customer_id,
            intent = %classification.intent,
            confidence = classification.confidence,
            "intent classified"
        );

        let result = if classification.confidence >= self.confidence_threshold {
            self.answer_by_intent(&classification, query).await?
        } else {
            self.answer_by_search(&classification, query).await?
        };

        self.sessions
            .append_round(
                customer_id,
                DialogueRound {
                    query: query.to_string(),
                    answer: result.answer.clone(),
                    intent: result.intent,
                    timestamp: Utc::now(),
                },
            )
            .await?;

        Ok(result)
    }

    async fn answer_by_intent(
        &self,
        classification: &Classification,
        query: &str,
    ) -> Result<AnswerResult, RelayError> {
        let canned = |answer: &str, escalate: bool| AnswerResult {
            success: true,
            answer: answer.to_string(),
            intent: classification.intent,
            confidence: classification.confidence,
            knowledge_id: None,
            escalate_to_human: escalate,
        };

        match classification.intent {
            Intent::Greeting => Ok(canned(GREETING_REPLY, false)),
            Intent::Thanks => Ok(canned(THANKS_REPLY, false)),
            Intent::Complaint => Ok(canned(COMPLAINT_REPLY, true)),
            _ => self.answer_by_search(classification, query).await,
        }
    }

    async fn answer_by_search(
        &self,
        classification: &Classification,
        query: &str,
    ) -> Result<AnswerResult, RelayError> {
        let hits = self.search.search(query, None).await?;
        match hits.into_iter().next() {
            Some(best) => Ok(AnswerResult {
                success: true,
                answer: format_answer(&best.entry.title, &best.entry.content),
                intent: classification.intent,
                confidence: classification.confidence,
                knowledge_id: Some(best.entry.knowledge_id),
                escalate_to_human: false,
            }),
            None => Ok(AnswerResult {
                success: false,
                answer: NO_RESULT_REPLY.to_string(),
                intent: classification.intent,
                confidence: classification.confidence,
                knowledge_id: None,
                escalate_to_human: true,
            }),
        }
    }
}

/// Builds the reply text from the best knowledge hit: title plus the first
/// [`ANSWER_CONTENT_CHARS`] characters of content.
fn format_answer(title: &str, content: &str) -> String {
    let mut summary: String = content.chars().take(ANSWER_CONTENT_CHARS).collect();
    if content.chars().count() > ANSWER_CONTENT_CHARS {
        summary.push_str("...");
    }
    format!("关于'{title}'的相关法律信息：\n\n{summary}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::RuleClassifier;
    use crate::session::InMemorySessionStore;
    use lexrelay_core::traits::KnowledgeStore;
    use lexrelay_core::types::KnowledgeEntry;
    use lexrelay_knowledge::SqliteKnowledgeStore;
    use tempfile::tempdir;

    async fn manager_with_knowledge(
        entries: Vec<KnowledgeEntry>,
    ) -> (QaManager, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("knowledge.db");
        let store = Arc::new(
            SqliteKnowledgeStore::open(path.to_str().unwrap())
                .await
                .unwrap(),
        );
        for entry in &entries {
            store.insert(entry).await.unwrap();
        }
        let config = QaConfig::default();
        let manager = QaManager::new(
            Arc::new(RuleClassifier),
            Arc::new(SearchEngine::new(store, None, 3)),
            Arc::new(InMemorySessionStore::new(&config)),
            &config,
        );
        (manager, dir)
    }

    fn labor_entry() -> KnowledgeEntry {
        KnowledgeEntry {
            id: 0,
            knowledge_id: "KB001".to_string(),
            title: "劳动合同解除指南".to_string(),
            content: "用人单位解除合同应当依法支付经济补偿。".to_string(),
            category: "劳动纠纷".to_string(),
            subcategory: None,
            keywords: Some("劳动合同,解雇,赔偿".to_string()),
            status: "active".to_string(),
        }
    }

    #[tokio::test]
    async fn greeting_gets_canned_reply_and_recorded_round() {
        let (manager, _dir) = manager_with_knowledge(vec![]).await;
        let id = CustomerId("zhangsan".into());

        let result = manager.answer(&id, "你好").await;
        assert!(result.success);
        assert_eq!(result.answer, GREETING_REPLY);
        assert_eq!(result.intent, Intent::Greeting);
        assert!(!result.escalate_to_human);

        let history = manager.sessions().history(&id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].intent, Intent::Greeting);
    }

    #[tokio::test]
    async fn thanks_gets_canned_reply() {
        let (manager, _dir) = manager_with_knowledge(vec![]).await;
        let result = manager.answer(&CustomerId("c".into()), "谢谢你").await;
        assert_eq!(result.answer, THANKS_REPLY);
        assert!(!result.escalate_to_human);
    }

    #[tokio::test]
    async fn complaint_always_escalates() {
        let (manager, _dir) = manager_with_knowledge(vec![]).await;
        let result = manager.answer(&CustomerId("c".into()), "我要投诉").await;
        assert!(result.success);
        assert_eq!(result.answer, COMPLAINT_REPLY);
        assert!(result.escalate_to_human);
    }

    #[tokio::test]
    async fn legal_query_is_answered_from_knowledge() {
        let (manager, _dir) = manager_with_knowledge(vec![labor_entry()]).await;
        let result = manager
            .answer(&CustomerId("c".into()), "被公司解雇了 劳动合同 怎么赔偿")
            .await;
        assert!(result.success);
        assert!(result.answer.starts_with("关于'劳动合同解除指南'的相关法律信息："));
        assert_eq!(result.knowledge_id.as_deref(), Some("KB001"));
        assert!(!result.escalate_to_human);
    }

    #[tokio::test]
    async fn no_knowledge_match_escalates() {
        let (manager, _dir) = manager_with_knowledge(vec![]).await;
        let result = manager.answer(&CustomerId("c".into()), "劳动合同 纠纷").await;
        assert!(!result.success);
        assert_eq!(result.answer, NO_RESULT_REPLY);
        assert!(result.escalate_to_human);
    }

    #[tokio::test]
    async fn low_confidence_falls_through_to_search() {
        let (manager, _dir) = manager_with_knowledge(vec![]).await;
        // No rule keyword matches: Other at 0.5, below the 0.7 threshold.
        let result = manager.answer(&CustomerId("c".into()), "今天天气真不错").await;
        assert_eq!(result.intent, Intent::Other);
        assert!(!result.success);
        assert!(result.escalate_to_human);
    }

    #[test]
    fn long_content_is_truncated_with_ellipsis() {
        let content = "法".repeat(600);
        let answer = format_answer("标题", &content);
        assert!(answer.ends_with("..."));
        let body = answer.split("\n\n").nth(1).unwrap();
        assert_eq!(body.chars().count(), 503);
    }

    #[test]
    fn short_content_is_kept_verbatim() {
        let answer = format_answer("标题", "简短内容");
        assert_eq!(answer, "关于'标题'的相关法律信息：\n\n简短内容");
    }
}
