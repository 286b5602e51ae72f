// SPDX-FileCopyrightText: 2026 Lexrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory dialogue session store.
//!
//! Sessions expire after the configured inactivity timeout: an expired
//! session is replaced on next contact, and a periodic sweep evicts the
//! rest so abandoned conversations do not accumulate.

use chrono::Utc;
use dashmap::DashMap;

use async_trait::async_trait;
use lexrelay_config::model::QaConfig;
use lexrelay_core::error::RelayError;
use lexrelay_core::traits::SessionStore;
use lexrelay_core::types::{CustomerId, DialogueRound, DialogueSession};

/// Process-local [`SessionStore`] over a concurrent map.
pub struct InMemorySessionStore {
    sessions: DashMap<String, DialogueSession>,
    max_rounds: usize,
    timeout: chrono::Duration,
    max_evictions_per_sweep: usize,
}

impl InMemorySessionStore {
    pub fn new(config: &QaConfig) -> Self {
        Self {
            sessions: DashMap::new(),
            max_rounds: config.max_dialogue_rounds.max(1),
            timeout: chrono::Duration::seconds(config.dialogue_timeout_secs as i64),
            max_evictions_per_sweep: config.max_customers_per_batch.max(1),
        }
    }

    fn is_expired(&self, session: &DialogueSession) -> bool {
        Utc::now() - session.last_active_at > self.timeout
    }

    /// Number of live sessions, expired or not.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get_or_create(
        &self,
        customer_id: &CustomerId,
    ) -> Result<DialogueSession, RelayError> {
        let mut entry = self
            .sessions
            .entry(customer_id.0.clone())
            .or_insert_with(|| DialogueSession::new(customer_id.clone()));
        if self.is_expired(entry.value()) {
            *entry.value_mut() = DialogueSession::new(customer_id.clone());
        }
        Ok(entry.value().clone())
    }

    async fn append_round(
        &self,
        customer_id: &CustomerId,
        round: DialogueRound,
    ) -> Result<(), RelayError> {
        let mut entry = self
            .sessions
            .entry(customer_id.0.clone())
            .or_insert_with(|| DialogueSession::new(customer_id.clone()));
        let session = entry.value_mut();
        session.rounds.push(round);
        if session.rounds.len() > self.max_rounds {
            let excess = session.rounds.len() - self.max_rounds;
            session.rounds.drain(..excess);
        }
        session.last_active_at = Utc::now();
        Ok(())
    }

    async fn history(&self, customer_id: &CustomerId) -> Result<Vec<DialogueRound>, RelayError> {
        Ok(self
            .sessions
            .get(&customer_id.0)
            .map(|s| s.rounds.clone())
            .unwrap_or_default())
    }

    async fn clear(&self, customer_id: &CustomerId) -> Result<(), RelayError> {
        self.sessions.remove(&customer_id.0);
        Ok(())
    }

    async fn evict_expired(&self) -> Result<usize, RelayError> {
        let expired: Vec<String> = self
            .sessions
            .iter()
            .filter(|entry| self.is_expired(entry.value()))
            .map(|entry| entry.key().clone())
            .take(self.max_evictions_per_sweep)
            .collect();

        let mut evicted = 0usize;
        for key in expired {
            if self.sessions.remove(&key).is_some() {
                evicted += 1;
            }
        }
        Ok(evicted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexrelay_core::types::Intent;

    fn store_with(max_rounds: usize, timeout_secs: u64) -> InMemorySessionStore {
        InMemorySessionStore::new(&QaConfig {
            max_dialogue_rounds: max_rounds,
            dialogue_timeout_secs: timeout_secs,
            ..QaConfig::default()
        })
    }

    fn round(query: &str) -> DialogueRound {
        DialogueRound {
            query: query.to_string(),
            answer: "回答".to_string(),
            intent: Intent::Inquiry,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn get_or_create_returns_fresh_session() {
        let store = store_with(10, 86400);
        let id = CustomerId("zhangsan".into());
        let session = store.get_or_create(&id).await.unwrap();
        assert!(session.rounds.is_empty());
        assert_eq!(session.customer_id, id);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn rounds_are_capped_oldest_first() {
        let store = store_with(3, 86400);
        let id = CustomerId("zhangsan".into());
        for i in 0..5 {
            store.append_round(&id, round(&format!("q{i}"))).await.unwrap();
        }
        let history = store.history(&id).await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].query, "q2");
        assert_eq!(history[2].query, "q4");
    }

    #[tokio::test]
    async fn expired_session_is_replaced_on_contact() {
        let store = store_with(10, 0);
        let id = CustomerId("zhangsan".into());
        store.append_round(&id, round("q1")).await.unwrap();

        // Zero timeout: any existing session counts as expired.
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let session = store.get_or_create(&id).await.unwrap();
        assert!(session.rounds.is_empty());
    }

    #[tokio::test]
    async fn clear_removes_session() {
        let store = store_with(10, 86400);
        let id = CustomerId("zhangsan".into());
        store.append_round(&id, round("q1")).await.unwrap();
        store.clear(&id).await.unwrap();
        assert!(store.history(&id).await.unwrap().is_empty());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn sweep_evicts_only_expired_sessions() {
        let store = store_with(10, 0);
        store
            .append_round(&CustomerId("a".into()), round("q"))
            .await
            .unwrap();
        store
            .append_round(&CustomerId("b".into()), round("q"))
            .await
            .unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        assert_eq!(store.evict_expired().await.unwrap(), 2);
        assert!(store.is_empty());

        let fresh = store_with(10, 86400);
        fresh
            .append_round(&CustomerId("c".into()), round("q"))
            .await
            .unwrap();
        assert_eq!(fresh.evict_expired().await.unwrap(), 0);
        assert_eq!(fresh.len(), 1);
    }
}
