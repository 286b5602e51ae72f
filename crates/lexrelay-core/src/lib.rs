// SPDX-FileCopyrightText: 2026 Lexrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Lexrelay customer-service backend.
//!
//! Provides the error type, shared message/dialogue/knowledge types, and the
//! trait seams (gateway, queue store, classifier, embedder, session store,
//! knowledge store) implemented by the other workspace crates.

pub mod error;
pub mod traits;
pub mod types;

pub use error::RelayError;
pub use types::{
    AnswerResult, Classification, CustomerId, DialogueRound, DialogueSession, Intent,
    KnowledgeEntry, MessageId, OutboundMessage, SearchHit,
};

pub use traits::{
    Embedder, IntentClassifier, KnowledgeStore, MessageGateway, QueueStore, SessionStore,
};
