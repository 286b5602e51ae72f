// SPDX-FileCopyrightText: 2026 Lexrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WeChat Work (WeCom) integration.
//!
//! [`WeComClient`] wraps the enterprise API: cached access tokens, text
//! message sends, and user lookups. [`WeComHandler`] processes inbound
//! callback payloads, runs them through the QA pipeline, and enqueues the
//! auto-reply.

pub mod client;
pub mod handler;
pub mod types;

pub use client::WeComClient;
pub use handler::{message_priority, MessagePriority, WeComHandler};
pub use types::{CallbackResult, InboundEnvelope};
