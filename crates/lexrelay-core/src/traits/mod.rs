// SPDX-FileCopyrightText: 2026 Lexrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams between the pipeline and its swappable backends.
//!
//! All traits use `#[async_trait]` for dynamic dispatch compatibility; the
//! serve wiring selects implementations at startup (Redis vs. in-memory
//! queue store, model-backed vs. rule-based classifier and search).

pub mod classifier;
pub mod embedding;
pub mod gateway;
pub mod knowledge;
pub mod queue;
pub mod session;

pub use classifier::IntentClassifier;
pub use embedding::Embedder;
pub use gateway::MessageGateway;
pub use knowledge::KnowledgeStore;
pub use queue::QueueStore;
pub use session::SessionStore;
