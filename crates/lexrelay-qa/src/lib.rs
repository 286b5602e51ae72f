// SPDX-FileCopyrightText: 2026 Lexrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! QA pipeline for the legal customer-service assistant.
//!
//! One inbound query flows classify -> dispatch -> answer: the intent
//! classifier labels the text, high-confidence conversational intents get
//! canned replies, legal intents and low-confidence queries go through
//! knowledge search, and every exchange is recorded in the customer's
//! dialogue session.

pub mod classifier;
pub mod manager;
pub mod onnx;
pub mod session;

pub use classifier::{select_classifier, RuleClassifier};
pub use manager::QaManager;
pub use onnx::OnnxClassifier;
pub use session::InMemorySessionStore;
