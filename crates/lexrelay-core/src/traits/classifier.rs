// SPDX-FileCopyrightText: 2026 Lexrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Intent classifier trait with model-backed and rule-based variants.

use async_trait::async_trait;

use crate::error::RelayError;
use crate::types::Classification;

/// Maps free text onto the closed [`Intent`](crate::types::Intent) label set.
///
/// Two implementations exist: an ONNX sequence classifier and a keyword-rule
/// fallback. The variant is chosen once at startup based on model load
/// success, so call sites never branch on model availability.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    /// Classifies `text`, returning the top intent and its confidence.
    async fn classify(&self, text: &str) -> Result<Classification, RelayError>;

    /// Short name for startup logging ("onnx" / "rules").
    fn name(&self) -> &'static str;
}
