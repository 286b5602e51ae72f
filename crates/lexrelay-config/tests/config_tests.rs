// SPDX-FileCopyrightText: 2026 Lexrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Lexrelay configuration system.

use lexrelay_config::diagnostic::suggest_key;
use lexrelay_config::{load_and_validate_str, load_config_from_str};

/// Valid TOML with all known fields deserializes successfully.
#[test]
fn valid_toml_deserializes_into_lexrelay_config() {
    let toml = r#"
[agent]
name = "legal-cs"
log_level = "debug"

[wecom]
corp_id = "ww1234567890"
app_secret = "s3cr3t"
agent_id = "1000002"

[queue]
redis_url = "redis://10.0.0.5:6379/1"
key_prefix = "legal"
batch_size = 20
batch_timeout_ms = 500
pop_timeout_secs = 2
max_retries = 3
retry_limit = 50
analysis_interval_secs = 30

[qa]
confidence_threshold = 0.8
max_dialogue_rounds = 5
dialogue_timeout_secs = 3600

[knowledge]
database_path = "/var/lib/lexrelay/knowledge.db"
top_k = 3

[gateway]
host = "0.0.0.0"
port = 9000
bearer_token = "tok"
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.agent.name, "legal-cs");
    assert_eq!(config.agent.log_level, "debug");
    assert_eq!(config.wecom.corp_id.as_deref(), Some("ww1234567890"));
    assert_eq!(config.wecom.agent_id.as_deref(), Some("1000002"));
    assert_eq!(config.queue.redis_url, "redis://10.0.0.5:6379/1");
    assert_eq!(config.queue.key_prefix, "legal");
    assert_eq!(config.queue.batch_size, 20);
    assert_eq!(config.queue.max_retries, 3);
    assert_eq!(config.qa.confidence_threshold, 0.8);
    assert_eq!(config.qa.max_dialogue_rounds, 5);
    assert_eq!(config.qa.dialogue_timeout_secs, 3600);
    assert_eq!(config.knowledge.top_k, 3);
    assert_eq!(config.gateway.port, 9000);
    assert_eq!(config.gateway.bearer_token.as_deref(), Some("tok"));
}

/// Missing optional sections use defaults without error.
#[test]
fn missing_optional_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");

    assert_eq!(config.agent.name, "lexrelay");
    assert_eq!(config.agent.log_level, "info");
    assert!(config.wecom.corp_id.is_none());
    assert_eq!(config.wecom.api_base, "https://qyapi.weixin.qq.com/cgi-bin");
    assert_eq!(config.queue.redis_url, "redis://127.0.0.1:6379/0");
    assert_eq!(config.queue.batch_size, 10);
    assert_eq!(config.queue.max_retries, 5);
    assert_eq!(config.qa.confidence_threshold, 0.7);
    assert_eq!(config.qa.max_dialogue_rounds, 10);
    assert_eq!(config.qa.dialogue_timeout_secs, 86400);
    assert!(config.gateway.bearer_token.is_none());
}

/// Unknown field in [wecom] section produces an UnknownField error.
#[test]
fn unknown_field_in_wecom_produces_error() {
    let toml = r#"
[wecom]
corp_di = "ww1234"
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    // Figment wraps serde's deny_unknown_fields error
    assert!(
        err_str.contains("unknown field") || err_str.contains("corp_di"),
        "error should mention unknown field or the bad key, got: {err_str}"
    );
}

/// Unknown field in [queue] section produces an UnknownField error.
#[test]
fn unknown_field_in_queue_produces_error() {
    let toml = r#"
[queue]
redis_ulr = "redis://localhost"
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("redis_ulr"),
        "error should mention unknown field, got: {err_str}"
    );
}

/// Wrong value type produces an InvalidType error.
#[test]
fn wrong_type_for_batch_size_produces_error() {
    let toml = r#"
[queue]
batch_size = "ten"
"#;

    assert!(load_config_from_str(toml).is_err());
}

/// Validation catches semantic errors the deserializer cannot.
#[test]
fn load_and_validate_str_rejects_bad_threshold() {
    let toml = r#"
[qa]
confidence_threshold = 2.0
"#;

    let errors = load_and_validate_str(toml).expect_err("threshold out of range");
    assert!(errors
        .iter()
        .any(|e| e.to_string().contains("confidence_threshold")));
}

/// Partial WeCom credentials are caught at startup rather than at the first
/// token refresh.
#[test]
fn load_and_validate_str_rejects_partial_wecom_credentials() {
    let toml = r#"
[wecom]
corp_id = "ww1234"
"#;

    let errors = load_and_validate_str(toml).expect_err("incomplete credentials");
    assert!(errors.iter().any(|e| e.to_string().contains("incomplete")));
}

/// Typo suggestions use Jaro-Winkler similarity.
#[test]
fn typo_suggestions_find_nearby_keys() {
    let valid = &[
        "confidence_threshold",
        "max_dialogue_rounds",
        "dialogue_timeout_secs",
    ];
    assert_eq!(
        suggest_key("max_dialog_rounds", valid),
        Some("max_dialogue_rounds".to_string())
    );
    assert_eq!(suggest_key("qqqq", valid), None);
}
