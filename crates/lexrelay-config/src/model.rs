// SPDX-FileCopyrightText: 2026 Lexrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Lexrelay backend.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Lexrelay configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values; the
/// WeCom credentials are the only fields that must be supplied for a
/// production deployment.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LexrelayConfig {
    /// Service identity and logging.
    #[serde(default)]
    pub agent: AgentConfig,

    /// WeChat Work (WeCom) API credentials and endpoint.
    #[serde(default)]
    pub wecom: WecomConfig,

    /// Delivery queue and retry settings.
    #[serde(default)]
    pub queue: QueueConfig,

    /// QA pipeline settings.
    #[serde(default)]
    pub qa: QaConfig,

    /// Knowledge base storage and search settings.
    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    /// HTTP gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the service.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_agent_name() -> String {
    "lexrelay".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// WeCom API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WecomConfig {
    /// Enterprise corp id. `None` disables the WeCom gateway.
    #[serde(default)]
    pub corp_id: Option<String>,

    /// Application secret used for token issuance.
    #[serde(default)]
    pub app_secret: Option<String>,

    /// Application agent id included in message sends.
    #[serde(default)]
    pub agent_id: Option<String>,

    /// API base URL. Overridable for tests against a local mock server.
    #[serde(default = "default_wecom_api_base")]
    pub api_base: String,
}

impl Default for WecomConfig {
    fn default() -> Self {
        Self {
            corp_id: None,
            app_secret: None,
            agent_id: None,
            api_base: default_wecom_api_base(),
        }
    }
}

fn default_wecom_api_base() -> String {
    "https://qyapi.weixin.qq.com/cgi-bin".to_string()
}

/// Delivery queue and retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    /// Redis connection URL.
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Key prefix for all queue keys (pending list, sets, blobs).
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Maximum messages dispatched per worker iteration.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Upper bound on time spent collecting one batch, in milliseconds.
    #[serde(default = "default_batch_timeout_ms")]
    pub batch_timeout_ms: u64,

    /// Blocking-pop timeout, in seconds. Bounds shutdown latency.
    #[serde(default = "default_pop_timeout_secs")]
    pub pop_timeout_secs: u64,

    /// Retry attempts after which a failed message is permanently dropped.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Maximum failed messages promoted per retry-scheduler pass.
    #[serde(default = "default_retry_limit")]
    pub retry_limit: usize,

    /// Interval between retry-scheduler passes, in seconds.
    #[serde(default = "default_analysis_interval_secs")]
    pub analysis_interval_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            redis_url: default_redis_url(),
            key_prefix: default_key_prefix(),
            batch_size: default_batch_size(),
            batch_timeout_ms: default_batch_timeout_ms(),
            pop_timeout_secs: default_pop_timeout_secs(),
            max_retries: default_max_retries(),
            retry_limit: default_retry_limit(),
            analysis_interval_secs: default_analysis_interval_secs(),
        }
    }
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379/0".to_string()
}

fn default_key_prefix() -> String {
    "lexrelay".to_string()
}

fn default_batch_size() -> usize {
    10
}

fn default_batch_timeout_ms() -> u64 {
    2000
}

fn default_pop_timeout_secs() -> u64 {
    1
}

fn default_max_retries() -> u32 {
    5
}

fn default_retry_limit() -> usize {
    100
}

fn default_analysis_interval_secs() -> u64 {
    60
}

/// QA pipeline configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QaConfig {
    /// Intent confidence below which the pipeline falls through to a
    /// generic knowledge search.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,

    /// Rounds retained per dialogue session (oldest dropped first).
    #[serde(default = "default_max_dialogue_rounds")]
    pub max_dialogue_rounds: usize,

    /// Inactivity timeout after which a session is discarded, in seconds.
    #[serde(default = "default_dialogue_timeout_secs")]
    pub dialogue_timeout_secs: u64,

    /// Upper bound on sessions evicted per sweep pass.
    #[serde(default = "default_max_customers_per_batch")]
    pub max_customers_per_batch: usize,

    /// Directory holding `model.onnx` + `tokenizer.json` for the intent
    /// classifier. `None` (or load failure) selects the rule fallback.
    #[serde(default)]
    pub intent_model_dir: Option<String>,
}

impl Default for QaConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            max_dialogue_rounds: default_max_dialogue_rounds(),
            dialogue_timeout_secs: default_dialogue_timeout_secs(),
            max_customers_per_batch: default_max_customers_per_batch(),
            intent_model_dir: None,
        }
    }
}

fn default_confidence_threshold() -> f32 {
    0.7
}

fn default_max_dialogue_rounds() -> usize {
    10
}

fn default_dialogue_timeout_secs() -> u64 {
    86400
}

fn default_max_customers_per_batch() -> usize {
    1000
}

/// Knowledge base configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KnowledgeConfig {
    /// SQLite database path for knowledge entries.
    #[serde(default = "default_knowledge_db_path")]
    pub database_path: String,

    /// Directory holding `model.onnx` + `tokenizer.json` for the semantic
    /// embedder. `None` (or load failure) selects keyword search.
    #[serde(default)]
    pub embedding_model_dir: Option<String>,

    /// Results returned per search.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            database_path: default_knowledge_db_path(),
            embedding_model_dir: None,
            top_k: default_top_k(),
        }
    }
}

fn default_knowledge_db_path() -> String {
    "lexrelay-knowledge.db".to_string()
}

fn default_top_k() -> usize {
    5
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Host address to bind.
    #[serde(default = "default_gateway_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bearer token guarding the `/v1` routes. `None` rejects all
    /// authenticated requests (fail-closed).
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
            bearer_token: None,
        }
    }
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    8350
}
