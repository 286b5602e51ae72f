// SPDX-FileCopyrightText: 2026 Lexrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./lexrelay.toml` > `~/.config/lexrelay/lexrelay.toml`
//! > `/etc/lexrelay/lexrelay.toml` with environment variable overrides via the
//! `LEXRELAY_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::LexrelayConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/lexrelay/lexrelay.toml` (system-wide)
/// 3. `~/.config/lexrelay/lexrelay.toml` (user XDG config)
/// 4. `./lexrelay.toml` (local directory)
/// 5. `LEXRELAY_*` environment variables
pub fn load_config() -> Result<LexrelayConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(LexrelayConfig::default()))
        .merge(Toml::file("/etc/lexrelay/lexrelay.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("lexrelay/lexrelay.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("lexrelay.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env vars).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<LexrelayConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(LexrelayConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<LexrelayConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(LexrelayConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `LEXRELAY_WECOM_CORP_ID` must map to
/// `wecom.corp_id`, not `wecom.corp.id`.
fn env_provider() -> Env {
    Env::prefixed("LEXRELAY_").map(|key| map_env_key(key.as_str()).into())
}

/// Maps a prefix-stripped env var name onto its dotted config path.
///
/// The section name is matched only at the start of the key:
/// `WECOM_AGENT_ID` becomes `wecom.agent_id` and must not trip on the
/// embedded `agent_` substring.
fn map_env_key(key: &str) -> String {
    let key = key.to_ascii_lowercase();
    for section in ["agent", "wecom", "queue", "qa", "knowledge", "gateway"] {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_map_to_dotted_paths() {
        assert_eq!(map_env_key("WECOM_CORP_ID"), "wecom.corp_id");
        assert_eq!(map_env_key("wecom_agent_id"), "wecom.agent_id");
        assert_eq!(map_env_key("WECOM_AGENT_ID"), "wecom.agent_id");
        assert_eq!(map_env_key("queue_batch_size"), "queue.batch_size");
        assert_eq!(map_env_key("qa_confidence_threshold"), "qa.confidence_threshold");
        assert_eq!(map_env_key("gateway_bearer_token"), "gateway.bearer_token");
        assert_eq!(map_env_key("agent_log_level"), "agent.log_level");
    }

    #[test]
    fn unknown_sections_pass_through_unchanged() {
        assert_eq!(map_env_key("SOMETHING_ELSE"), "something_else");
    }

    #[test]
    fn wecom_env_vars_override_config() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("LEXRELAY_WECOM_AGENT_ID", "1000002");
            jail.set_env("LEXRELAY_QUEUE_BATCH_SIZE", "25");
            let config = load_config()?;
            assert_eq!(config.wecom.agent_id.as_deref(), Some("1000002"));
            assert_eq!(config.queue.batch_size, 25);
            Ok(())
        });
    }
}
