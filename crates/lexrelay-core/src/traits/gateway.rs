// SPDX-FileCopyrightText: 2026 Lexrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message gateway trait for the external messaging platform (WeCom).

use async_trait::async_trait;

use crate::error::RelayError;

/// Outbound side of the messaging platform boundary.
///
/// `Ok(false)` means the platform explicitly reported a delivery failure
/// (quarantine for retry); `Err(_)` means the call itself failed (transport,
/// token refresh). The delivery worker treats both as a failed attempt.
#[async_trait]
pub trait MessageGateway: Send + Sync {
    /// Sends a plain text message to the given platform user.
    async fn send_text(&self, recipient_id: &str, body: &str) -> Result<bool, RelayError>;
}
