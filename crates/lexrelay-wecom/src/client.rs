// SPDX-FileCopyrightText: 2026 Lexrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the WeCom enterprise API.
//!
//! Access tokens are cached and refreshed five minutes before their actual
//! expiry. Sends that fail with an invalid-token errcode drop the cache and
//! retry once with a fresh token.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use lexrelay_config::model::WecomConfig;
use lexrelay_core::error::RelayError;
use lexrelay_core::traits::MessageGateway;

use crate::types::{ApiResponse, TokenResponse};

/// Refresh tokens this long before the platform-reported expiry.
const TOKEN_REFRESH_SKEW: Duration = Duration::from_secs(300);

/// WeCom errcodes meaning the access token is invalid or expired.
const ERR_INVALID_TOKEN: i64 = 40014;
const ERR_EXPIRED_TOKEN: i64 = 42001;

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Client for the WeCom enterprise messaging API.
pub struct WeComClient {
    http: reqwest::Client,
    base_url: String,
    corp_id: String,
    app_secret: String,
    agent_id: String,
    token: Mutex<Option<CachedToken>>,
}

impl WeComClient {
    /// Builds a client from config. All three credentials must be present.
    pub fn new(config: &WecomConfig) -> Result<Self, RelayError> {
        let corp_id = config
            .corp_id
            .clone()
            .ok_or_else(|| RelayError::Config("wecom.corp_id is not set".into()))?;
        let app_secret = config
            .app_secret
            .clone()
            .ok_or_else(|| RelayError::Config("wecom.app_secret is not set".into()))?;
        let agent_id = config
            .agent_id
            .clone()
            .ok_or_else(|| RelayError::Config("wecom.agent_id is not set".into()))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| RelayError::gateway("failed to build HTTP client", e))?;

        Ok(Self {
            http,
            base_url: config.api_base.trim_end_matches('/').to_string(),
            corp_id,
            app_secret,
            agent_id,
            token: Mutex::new(None),
        })
    }

    /// Returns a valid access token, fetching a fresh one when the cache is
    /// empty or within the refresh window.
    pub async fn access_token(&self) -> Result<String, RelayError> {
        let mut cache = self.token.lock().await;
        if let Some(cached) = cache.as_ref() {
            if Instant::now() < cached.expires_at {
                return Ok(cached.value.clone());
            }
        }

        let url = format!(
            "{}/gettoken?corpid={}&corpsecret={}",
            self.base_url, self.corp_id, self.app_secret
        );
        let resp: TokenResponse = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| RelayError::gateway("token request failed", e))?
            .json()
            .await
            .map_err(|e| RelayError::gateway("token response was not valid JSON", e))?;

        if resp.errcode != 0 {
            return Err(RelayError::Gateway {
                message: format!("token request rejected ({}): {}", resp.errcode, resp.errmsg),
                source: None,
            });
        }
        let value = resp.access_token.ok_or_else(|| RelayError::Gateway {
            message: "token response missing access_token".into(),
            source: None,
        })?;
        let expires_in = Duration::from_secs(resp.expires_in.unwrap_or(7200));
        let expires_at = Instant::now() + expires_in.saturating_sub(TOKEN_REFRESH_SKEW);

        info!("wecom access token refreshed");
        *cache = Some(CachedToken {
            value: value.clone(),
            expires_at,
        });
        Ok(value)
    }

    async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }

    async fn post_send(&self, recipient_id: &str, body: &str) -> Result<ApiResponse, RelayError> {
        let token = self.access_token().await?;
        let url = format!("{}/message/send?access_token={token}", self.base_url);
        let payload = serde_json::json!({
            "touser": recipient_id,
            "msgtype": "text",
            "agentid": self.agent_id,
            "text": { "content": body },
            "safe": 0,
        });
        self.http
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| RelayError::gateway("send request failed", e))?
            .json()
            .await
            .map_err(|e| RelayError::gateway("send response was not valid JSON", e))
    }

    /// Fetches the WeCom user record for `user_id`.
    pub async fn get_user_info(&self, user_id: &str) -> Result<serde_json::Value, RelayError> {
        let token = self.access_token().await?;
        let url = format!(
            "{}/user/get?access_token={token}&userid={user_id}",
            self.base_url
        );
        let data: serde_json::Value = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| RelayError::gateway("user lookup failed", e))?
            .json()
            .await
            .map_err(|e| RelayError::gateway("user response was not valid JSON", e))?;

        match data.get("errcode").and_then(|v| v.as_i64()) {
            Some(0) => Ok(data),
            code => Err(RelayError::Gateway {
                message: format!("user lookup rejected (errcode {code:?})"),
                source: None,
            }),
        }
    }
}

#[async_trait]
impl MessageGateway for WeComClient {
    async fn send_text(&self, recipient_id: &str, body: &str) -> Result<bool, RelayError> {
        let resp = self.post_send(recipient_id, body).await?;
        match resp.errcode {
            0 => {
                debug!(recipient = recipient_id, "wecom message sent");
                Ok(true)
            }
            ERR_INVALID_TOKEN | ERR_EXPIRED_TOKEN => {
                warn!(errcode = resp.errcode, "stale access token, retrying send");
                self.invalidate_token().await;
                let retried = self.post_send(recipient_id, body).await?;
                if retried.errcode == 0 {
                    Ok(true)
                } else {
                    warn!(
                        errcode = retried.errcode,
                        errmsg = %retried.errmsg,
                        "wecom send rejected after token refresh"
                    );
                    Ok(false)
                }
            }
            _ => {
                warn!(
                    errcode = resp.errcode,
                    errmsg = %resp.errmsg,
                    recipient = recipient_id,
                    "wecom send rejected"
                );
                Ok(false)
            }
        }
    }
}
