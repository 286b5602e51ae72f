// SPDX-FileCopyrightText: 2026 Lexrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as threshold ranges and non-empty connection strings.

use crate::diagnostic::ConfigError;
use crate::model::LexrelayConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &LexrelayConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.queue.redis_url.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "queue.redis_url must not be empty".to_string(),
        });
    }

    if config.queue.batch_size == 0 {
        errors.push(ConfigError::Validation {
            message: "queue.batch_size must be at least 1".to_string(),
        });
    }

    if config.queue.pop_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "queue.pop_timeout_secs must be at least 1 \
                      (a zero BLPOP timeout blocks forever)"
                .to_string(),
        });
    }

    let threshold = config.qa.confidence_threshold;
    if !(0.0..=1.0).contains(&threshold) {
        errors.push(ConfigError::Validation {
            message: format!(
                "qa.confidence_threshold must be within [0.0, 1.0], got {threshold}"
            ),
        });
    }

    if config.qa.max_dialogue_rounds == 0 {
        errors.push(ConfigError::Validation {
            message: "qa.max_dialogue_rounds must be at least 1".to_string(),
        });
    }

    if config.knowledge.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "knowledge.database_path must not be empty".to_string(),
        });
    }

    if config.knowledge.top_k == 0 {
        errors.push(ConfigError::Validation {
            message: "knowledge.top_k must be at least 1".to_string(),
        });
    }

    // Gateway bind address: valid IP or hostname characters only.
    let host = config.gateway.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::Validation {
            message: "gateway.host must not be empty".to_string(),
        });
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::Validation {
                message: format!("gateway.host `{host}` is not a valid IP address or hostname"),
            });
        }
    }

    // WeCom credentials are all-or-nothing: a partially configured gateway
    // fails at the first token refresh, so catch it at startup.
    let creds = [
        config.wecom.corp_id.as_deref(),
        config.wecom.app_secret.as_deref(),
        config.wecom.agent_id.as_deref(),
    ];
    let set = creds.iter().filter(|c| c.is_some_and(|s| !s.is_empty())).count();
    if set != 0 && set != creds.len() {
        errors.push(ConfigError::Validation {
            message: "wecom credentials are incomplete: corp_id, app_secret, and agent_id \
                      must all be set together"
                .to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
