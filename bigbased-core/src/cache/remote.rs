//! REST client for the managed key-value store
//!
//! Speaks the `/get`, `/set` and `/del` command endpoints with bearer auth.

use crate::config::KvConfig;
use crate::error::{AppError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct CommandResponse {
    #[serde(default)]
    result: serde_json::Value,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct SetRequest<'a> {
    value: &'a str,
    ex: u64,
}

/// Remote cache tier client
#[derive(Clone)]
pub struct KvRestClient {
    http_client: Client,
    base_url: String,
    token: String,
}

impl KvRestClient {
    /// Build a client when the store is fully configured, `None` otherwise
    pub fn from_config(config: &KvConfig) -> Result<Option<Self>> {
        match config.remote() {
            Some((url, token)) => Ok(Some(Self::new(
                url,
                token,
                Duration::from_secs(config.timeout_secs.max(1)),
            )?)),
            None => Ok(None),
        }
    }

    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self> {
        let http_client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn command_url(&self, command: &str, key: &str) -> String {
        format!("{}/{}/{}", self.base_url, command, key)
    }

    async fn read_response(response: reqwest::Response, command: &str) -> Result<serde_json::Value> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Cache(format!(
                "KV {} failed: {} - {}",
                command, status, body
            )));
        }

        let parsed: CommandResponse = response
            .json()
            .await
            .map_err(|e| AppError::Cache(format!("KV {} returned invalid body: {}", command, e)))?;

        if let Some(err) = parsed.error {
            return Err(AppError::Cache(format!("KV {} error: {}", command, err)));
        }
        Ok(parsed.result)
    }

    /// Fetch the raw payload stored under `key`
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let response = self
            .http_client
            .get(self.command_url("get", key))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| AppError::Cache(format!("KV get request failed: {}", e)))?;

        match Self::read_response(response, "get").await? {
            serde_json::Value::Null => Ok(None),
            serde_json::Value::String(s) => Ok(Some(s)),
            // Some stores hand back already-decoded JSON
            other => Ok(Some(other.to_string())),
        }
    }

    /// Store `value` under `key` for `ttl`
    pub async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let body = SetRequest {
            value,
            ex: ttl.as_secs().max(1),
        };

        let response = self
            .http_client
            .post(self.command_url("set", key))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Cache(format!("KV set request failed: {}", e)))?;

        Self::read_response(response, "set").await?;
        Ok(())
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        let response = self
            .http_client
            .post(self.command_url("del", key))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| AppError::Cache(format!("KV del request failed: {}", e)))?;

        Self::read_response(response, "del").await?;
        Ok(())
    }
}

impl std::fmt::Debug for KvRestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvRestClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}
