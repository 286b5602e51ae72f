// SPDX-FileCopyrightText: 2026 Lexrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound message delivery: Redis-backed queue store, batch delivery
//! worker, and the retry scheduler that promotes quarantined messages back
//! into the pending list with exponential backoff.

pub mod redis_store;
pub mod retry;
pub mod worker;

pub use redis_store::RedisQueueStore;
pub use retry::{backoff_delay, RetryScheduler};
pub use worker::{DeliveryWorker, Outbox};
