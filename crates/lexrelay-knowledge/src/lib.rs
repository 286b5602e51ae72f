// SPDX-FileCopyrightText: 2026 Lexrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Legal knowledge base.
//!
//! Entries live in SQLite; search runs semantically when an ONNX embedding
//! model is available and falls back to weighted keyword overlap otherwise.

pub mod embedder;
pub mod search;
pub mod store;

pub use embedder::OnnxEmbedder;
pub use search::SearchEngine;
pub use store::SqliteKnowledgeStore;
