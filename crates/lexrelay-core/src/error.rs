// SPDX-FileCopyrightText: 2026 Lexrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Lexrelay customer-service backend.

use thiserror::Error;

/// The primary error type used across all Lexrelay crates.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Queue store errors (Redis connection, command failure, payload serialization).
    #[error("queue store error: {message}")]
    Store {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// WeCom gateway errors (token refresh failure, HTTP transport, API errcode).
    #[error("gateway error: {message}")]
    Gateway {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Knowledge store errors (database connection, query failure).
    #[error("knowledge store error: {source}")]
    Knowledge {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Classifier or embedder errors (model load, tokenization, inference).
    #[error("classifier error: {0}")]
    Classifier(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RelayError {
    /// Shorthand for a store error wrapping an underlying cause.
    pub fn store<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        RelayError::Store {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Shorthand for a gateway error wrapping an underlying cause.
    pub fn gateway<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        RelayError::Gateway {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}
