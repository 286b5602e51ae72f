// SPDX-FileCopyrightText: 2026 Lexrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Lexrelay integration tests.
//!
//! Provides mock implementations of the core trait seams for fast,
//! deterministic, CI-runnable tests without Redis or the WeCom API.
//!
//! # Components
//!
//! - [`MockGateway`] - Mock message gateway with scripted failures and sent-message capture
//! - [`InMemoryQueueStore`] - In-process queue store honoring the blocking-pop contract
//! - [`UnavailableQueueStore`] - Always-failing queue store for degraded-path tests

pub mod memory_queue;
pub mod mock_gateway;

pub use memory_queue::{InMemoryQueueStore, UnavailableQueueStore};
pub use mock_gateway::{MockGateway, SendOutcome};
