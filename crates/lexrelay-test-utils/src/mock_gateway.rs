// SPDX-FileCopyrightText: 2026 Lexrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock message gateway for deterministic testing.
//!
//! `MockGateway` implements `MessageGateway` with captured outbound sends
//! and scripted outcomes (success, reported failure, transport error) so
//! worker and retry tests can exercise every delivery path.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use lexrelay_core::error::RelayError;
use lexrelay_core::traits::MessageGateway;

/// Scripted outcome for one `send_text` call.
#[derive(Debug, Clone, Copy)]
pub enum SendOutcome {
    /// Platform accepted the message.
    Delivered,
    /// Platform explicitly rejected it (`Ok(false)`).
    Rejected,
    /// The call itself failed (`Err(_)`).
    TransportError,
}

/// A mock messaging gateway for testing.
///
/// Sends are captured for assertion; outcomes are taken from a scripted
/// queue, defaulting to [`SendOutcome::Delivered`] once the script runs out.
pub struct MockGateway {
    sent: Arc<Mutex<Vec<(String, String)>>>,
    script: Arc<Mutex<VecDeque<SendOutcome>>>,
}

impl MockGateway {
    /// Create a mock gateway that delivers everything.
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            script: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Queue an outcome for the next unscripted `send_text` call.
    pub async fn script_outcome(&self, outcome: SendOutcome) {
        self.script.lock().await.push_back(outcome);
    }

    /// All `(recipient_id, body)` pairs passed to `send_text`, including
    /// rejected and errored attempts.
    pub async fn sent_messages(&self) -> Vec<(String, String)> {
        self.sent.lock().await.clone()
    }

    /// Count of `send_text` calls observed.
    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageGateway for MockGateway {
    async fn send_text(&self, recipient_id: &str, body: &str) -> Result<bool, RelayError> {
        self.sent
            .lock()
            .await
            .push((recipient_id.to_string(), body.to_string()));

        match self.script.lock().await.pop_front() {
            Some(SendOutcome::Delivered) | None => Ok(true),
            Some(SendOutcome::Rejected) => Ok(false),
            Some(SendOutcome::TransportError) => Err(RelayError::Gateway {
                message: "scripted transport error".to_string(),
                source: None,
            }),
        }
    }
}
