// SPDX-FileCopyrightText: 2026 Lexrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the WeCom enterprise API.

use serde::{Deserialize, Serialize};

/// Response of `GET /gettoken`.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub errcode: i64,
    #[serde(default)]
    pub errmsg: String,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// Response of `POST /message/send` (and other mutating endpoints).
#[derive(Debug, Deserialize)]
pub struct ApiResponse {
    pub errcode: i64,
    #[serde(default)]
    pub errmsg: String,
}

/// Inbound callback payload. WeCom delivers PascalCase field names.
///
/// Only the fields the handler consumes are modeled; unknown fields are
/// ignored so richer payloads (location, media) still parse.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InboundEnvelope {
    #[serde(rename = "MsgType", default)]
    pub msg_type: Option<String>,
    #[serde(rename = "FromUserName", default)]
    pub from_user: Option<String>,
    #[serde(rename = "Content", default)]
    pub content: Option<String>,
    #[serde(rename = "MsgId", default)]
    pub msg_id: Option<String>,
}

/// Outcome of processing one inbound callback.
#[derive(Debug, Clone, Serialize)]
pub struct CallbackResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    pub escalate_to_human: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CallbackResult {
    /// A successful no-op, used for skipped non-text messages.
    pub fn skipped() -> Self {
        Self {
            success: true,
            customer_id: None,
            msg_id: None,
            answer: None,
            escalate_to_human: false,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            customer_id: None,
            msg_id: None,
            answer: None,
            escalate_to_human: false,
            error: Some(error.into()),
        }
    }
}
