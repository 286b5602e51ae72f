// SPDX-FileCopyrightText: 2026 Lexrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound callback processing: envelope validation, QA dispatch, and
//! enqueueing the reply for asynchronous delivery.

use std::sync::Arc;

use tracing::{debug, info, warn};

use lexrelay_core::types::CustomerId;
use lexrelay_qa::QaManager;
use lexrelay_queue::Outbox;

use crate::types::{CallbackResult, InboundEnvelope};

const HIGH_PRIORITY_WORDS: &[&str] = &["紧急", "求助", "法律", "律师", "起诉", "赔偿"];
const MEDIUM_PRIORITY_WORDS: &[&str] = &["咨询", "了解", "请问", "想知道"];

/// Urgency bucket derived from message content, used for log triage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MessagePriority {
    Normal,
    Medium,
    High,
}

/// Scores a message by keyword lists: legal-distress terms rank high,
/// consultation phrasing ranks medium, everything else normal.
pub fn message_priority(content: &str) -> MessagePriority {
    if HIGH_PRIORITY_WORDS.iter().any(|w| content.contains(w)) {
        MessagePriority::High
    } else if MEDIUM_PRIORITY_WORDS.iter().any(|w| content.contains(w)) {
        MessagePriority::Medium
    } else {
        MessagePriority::Normal
    }
}

/// Processes WeCom callback envelopes end to end.
pub struct WeComHandler {
    qa: Arc<QaManager>,
    outbox: Outbox,
}

impl WeComHandler {
    pub fn new(qa: Arc<QaManager>, outbox: Outbox) -> Self {
        Self { qa, outbox }
    }

    /// Handles one inbound envelope. Non-text and empty messages are skipped;
    /// a missing sender is a hard failure. Text messages are answered by the
    /// QA pipeline and the reply is enqueued for delivery.
    pub async fn receive(&self, envelope: &InboundEnvelope) -> CallbackResult {
        if envelope.msg_type.as_deref() != Some("text") {
            debug!(msg_type = ?envelope.msg_type, "skipping non-text message");
            return CallbackResult::skipped();
        }
        let content = match envelope.content.as_deref().map(str::trim) {
            Some(c) if !c.is_empty() => c,
            _ => {
                debug!("skipping text message with empty content");
                return CallbackResult::skipped();
            }
        };
        let customer_id = match envelope.from_user.as_deref() {
            Some(u) if !u.is_empty() => CustomerId(u.to_string()),
            _ => return CallbackResult::failure("callback missing FromUserName"),
        };

        info!(
            customer = %customer_id,
            msg_id = ?envelope.msg_id,
            priority = ?message_priority(content),
            "inbound text message"
        );

        let result = self.qa.answer(&customer_id, content).await;

        if let Err(e) = self.outbox.enqueue(&customer_id.0, &result.answer).await {
            warn!(customer = %customer_id, error = %e, "failed to enqueue reply");
            return CallbackResult {
                success: false,
                customer_id: Some(customer_id.0),
                msg_id: envelope.msg_id.clone(),
                answer: Some(result.answer),
                escalate_to_human: result.escalate_to_human,
                error: Some(e.to_string()),
            };
        }

        CallbackResult {
            success: result.success,
            customer_id: Some(customer_id.0),
            msg_id: envelope.msg_id.clone(),
            answer: Some(result.answer),
            escalate_to_human: result.escalate_to_human,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexrelay_config::model::QaConfig;
    use lexrelay_core::traits::QueueStore;
    use lexrelay_knowledge::{SearchEngine, SqliteKnowledgeStore};
    use lexrelay_qa::{InMemorySessionStore, RuleClassifier};
    use lexrelay_test_utils::{InMemoryQueueStore, MockGateway};
    use tempfile::tempdir;

    #[test]
    fn priority_ranks_legal_distress_highest() {
        assert_eq!(message_priority("紧急求助，被起诉了"), MessagePriority::High);
        assert_eq!(message_priority("请问如何咨询"), MessagePriority::Medium);
        assert_eq!(message_priority("你好"), MessagePriority::Normal);
    }

    #[test]
    fn priority_high_outranks_medium_when_both_match() {
        assert_eq!(message_priority("咨询律师"), MessagePriority::High);
    }

    async fn handler() -> (WeComHandler, Arc<InMemoryQueueStore>, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("knowledge.db");
        let knowledge = Arc::new(
            SqliteKnowledgeStore::open(path.to_str().unwrap())
                .await
                .unwrap(),
        );
        let config = QaConfig::default();
        let qa = Arc::new(QaManager::new(
            Arc::new(RuleClassifier),
            Arc::new(SearchEngine::new(knowledge, None, 3)),
            Arc::new(InMemorySessionStore::new(&config)),
            &config,
        ));
        let store = Arc::new(InMemoryQueueStore::new());
        let outbox = Outbox::new(store.clone(), Arc::new(MockGateway::new()));
        (WeComHandler::new(qa, outbox), store, dir)
    }

    fn text_envelope(from: &str, content: &str) -> InboundEnvelope {
        InboundEnvelope {
            msg_type: Some("text".to_string()),
            from_user: Some(from.to_string()),
            content: Some(content.to_string()),
            msg_id: Some("1001".to_string()),
        }
    }

    #[tokio::test]
    async fn text_message_is_answered_and_reply_enqueued() {
        let (handler, store, _dir) = handler().await;
        let result = handler.receive(&text_envelope("zhangsan", "你好")).await;

        assert!(result.success);
        assert_eq!(result.customer_id.as_deref(), Some("zhangsan"));
        assert!(result.answer.as_deref().unwrap().contains("法律客服助手"));
        assert_eq!(store.pending_len().await.unwrap(), 1);

        let queued = store
            .pop_pending(std::time::Duration::from_millis(50))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(queued.recipient_id.0, "zhangsan");
    }

    #[tokio::test]
    async fn non_text_message_is_skipped() {
        let (handler, store, _dir) = handler().await;
        let envelope = InboundEnvelope {
            msg_type: Some("image".to_string()),
            from_user: Some("zhangsan".to_string()),
            content: None,
            msg_id: None,
        };
        let result = handler.receive(&envelope).await;
        assert!(result.success);
        assert!(result.answer.is_none());
        assert_eq!(store.pending_len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn blank_content_is_skipped() {
        let (handler, store, _dir) = handler().await;
        let result = handler.receive(&text_envelope("zhangsan", "   ")).await;
        assert!(result.success);
        assert!(result.answer.is_none());
        assert_eq!(store.pending_len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn missing_sender_is_a_failure() {
        let (handler, _store, _dir) = handler().await;
        let envelope = InboundEnvelope {
            msg_type: Some("text".to_string()),
            from_user: None,
            content: Some("你好".to_string()),
            msg_id: None,
        };
        let result = handler.receive(&envelope).await;
        assert!(!result.success);
        assert!(result.error.as_deref().unwrap().contains("FromUserName"));
    }

    #[tokio::test]
    async fn unanswerable_query_escalates_but_still_replies() {
        let (handler, store, _dir) = handler().await;
        let result = handler
            .receive(&text_envelope("zhangsan", "劳动合同纠纷怎么办"))
            .await;
        assert!(!result.success);
        assert!(result.escalate_to_human);
        // The apology is still delivered to the customer.
        assert_eq!(store.pending_len().await.unwrap(), 1);
    }
}
