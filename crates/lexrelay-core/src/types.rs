// SPDX-FileCopyrightText: 2026 Lexrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared across the Lexrelay workspace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Unique identifier for an outbound message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for a customer. WeCom's `FromUserName` is used directly as the
/// customer key; there is no separate customer table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomerId(pub String);

impl std::fmt::Display for CustomerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An outbound message travelling through the delivery queue.
///
/// Exists in exactly one of {pending, in-flight, failed} at any observation
/// point. Serialized to JSON for the queue store's list entries and failed
/// blobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Fresh UUID assigned at enqueue time.
    pub message_id: MessageId,
    /// WeCom user id of the recipient.
    pub recipient_id: CustomerId,
    /// Plain text body.
    pub body: String,
    pub created_at: DateTime<Utc>,
    /// Number of delivery attempts that have failed so far.
    pub retry_count: u32,
    /// Earliest time the next delivery attempt may run. `None` for messages
    /// that have never failed.
    pub next_retry_at: Option<DateTime<Utc>>,
}

impl OutboundMessage {
    /// Builds a new message with a generated id and zero retries.
    pub fn new(recipient_id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            message_id: MessageId(uuid::Uuid::new_v4().to_string()),
            recipient_id: CustomerId(recipient_id.into()),
            body: body.into(),
            created_at: Utc::now(),
            retry_count: 0,
            next_retry_at: None,
        }
    }

    /// Whether the message is due for delivery at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.next_retry_at {
            Some(at) => at <= now,
            None => true,
        }
    }
}

/// Closed set of intent labels: ten legal practice areas plus generic
/// conversational intents.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    ContractConsultation,
    LaborDispute,
    CivilLitigation,
    CriminalDefense,
    PropertyRights,
    MarriageFamily,
    IntellectualProperty,
    AdministrativeLaw,
    CompanyLaw,
    OtherLegalIssues,
    Greeting,
    Thanks,
    Inquiry,
    Complaint,
    Other,
}

impl Intent {
    /// All labels in classifier output order. The ONNX classification head
    /// is trained against this ordering.
    pub const ALL: [Intent; 15] = [
        Intent::ContractConsultation,
        Intent::LaborDispute,
        Intent::CivilLitigation,
        Intent::CriminalDefense,
        Intent::PropertyRights,
        Intent::MarriageFamily,
        Intent::IntellectualProperty,
        Intent::AdministrativeLaw,
        Intent::CompanyLaw,
        Intent::OtherLegalIssues,
        Intent::Greeting,
        Intent::Thanks,
        Intent::Inquiry,
        Intent::Complaint,
        Intent::Other,
    ];

    /// Whether this intent maps to a legal practice area (answered from the
    /// knowledge base rather than a canned reply).
    pub fn is_legal_category(&self) -> bool {
        matches!(
            self,
            Intent::ContractConsultation
                | Intent::LaborDispute
                | Intent::CivilLitigation
                | Intent::CriminalDefense
                | Intent::PropertyRights
                | Intent::MarriageFamily
                | Intent::IntellectualProperty
                | Intent::AdministrativeLaw
                | Intent::CompanyLaw
                | Intent::OtherLegalIssues
        )
    }
}

/// Result of classifying one inbound text. Not persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub intent: Intent,
    /// Max softmax probability (model path) or a fixed rule confidence.
    pub confidence: f32,
}

/// One question/answer exchange inside a dialogue session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueRound {
    pub query: String,
    pub answer: String,
    pub intent: Intent,
    pub timestamp: DateTime<Utc>,
}

/// Short-lived per-customer conversational context.
///
/// Rounds are capped at a configurable maximum (oldest dropped first) and
/// the whole session is discarded after an inactivity timeout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueSession {
    pub customer_id: CustomerId,
    pub rounds: Vec<DialogueRound>,
    /// Free-form key/value context handlers may accumulate.
    pub context: std::collections::HashMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
}

impl DialogueSession {
    pub fn new(customer_id: CustomerId) -> Self {
        let now = Utc::now();
        Self {
            customer_id,
            rounds: Vec::new(),
            context: std::collections::HashMap::new(),
            created_at: now,
            last_active_at: now,
        }
    }
}

/// Outcome of a QA pipeline run for one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResult {
    pub success: bool,
    pub answer: String,
    pub intent: Intent,
    pub confidence: f32,
    /// Business key of the knowledge entry the answer was built from, if any.
    pub knowledge_id: Option<String>,
    /// Set when the answer attempt failed or a handler requested a human
    /// (complaints always do).
    pub escalate_to_human: bool,
}

/// A knowledge base article.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    /// Database row id (0 until persisted).
    pub id: i64,
    /// Stable business key.
    pub knowledge_id: String,
    pub title: String,
    pub content: String,
    pub category: String,
    pub subcategory: Option<String>,
    /// Comma-separated curated keywords, weighted above raw content matches.
    pub keywords: Option<String>,
    /// Only "active" entries are searched.
    pub status: String,
}

/// A ranked knowledge search result.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub entry: KnowledgeEntry,
    /// Weighted cosine similarity (semantic path) or keyword-overlap score
    /// (fallback path). Comparable only within one result list.
    pub score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn outbound_message_starts_with_zero_retries() {
        let msg = OutboundMessage::new("user1", "hello");
        assert_eq!(msg.retry_count, 0);
        assert!(msg.next_retry_at.is_none());
        assert!(msg.is_due(Utc::now()));
        assert!(!msg.message_id.0.is_empty());
    }

    #[test]
    fn message_with_future_retry_is_not_due() {
        let mut msg = OutboundMessage::new("user1", "hello");
        msg.next_retry_at = Some(Utc::now() + chrono::Duration::seconds(30));
        assert!(!msg.is_due(Utc::now()));
        msg.next_retry_at = Some(Utc::now() - chrono::Duration::seconds(1));
        assert!(msg.is_due(Utc::now()));
    }

    #[test]
    fn outbound_message_json_round_trip() {
        let msg = OutboundMessage::new("user1", "你好");
        let json = serde_json::to_string(&msg).unwrap();
        let back: OutboundMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back.message_id, msg.message_id);
        assert_eq!(back.body, "你好");
    }

    #[test]
    fn intent_labels_round_trip_snake_case() {
        for intent in Intent::ALL {
            let s = intent.to_string();
            assert_eq!(Intent::from_str(&s).unwrap(), intent);
        }
        assert_eq!(Intent::LaborDispute.to_string(), "labor_dispute");
        assert_eq!(Intent::from_str("greeting").unwrap(), Intent::Greeting);
    }

    #[test]
    fn legal_categories_exclude_conversational_intents() {
        assert!(Intent::LaborDispute.is_legal_category());
        assert!(Intent::OtherLegalIssues.is_legal_category());
        assert!(!Intent::Greeting.is_legal_category());
        assert!(!Intent::Complaint.is_legal_category());
        assert!(!Intent::Other.is_legal_category());
    }
}
