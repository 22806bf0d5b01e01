// Copyright (C) 2025, 2026 Orepool Developers (see AUTHORS)
//
// This file is part of Orepool
//
// Orepool is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// Orepool is distributed in the hope that it will be useful, but WITHOUT ANY
// WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// Orepool. If not, see <https://www.gnu.org/licenses/>.

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, error, warn};

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

/// Default request timeout for all daemon calls.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Retry parameters for idempotent daemon calls.
const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 100;
const MAX_BACKOFF_MS: u64 = 800;

/// JSON-RPC 2.0 request structure
#[derive(Serialize)]
struct JsonRpcRequest {
    jsonrpc: &'static str,
    method: String,
    params: serde_json::Value,
    id: u64,
}

/// JSON-RPC 2.0 response structure.
/// Exactly one of result and error is present.
#[derive(Deserialize, Debug)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 error structure
#[derive(Deserialize, Debug)]
struct JsonRpcError {
    code: i32,
    message: String,
}

#[derive(Deserialize, Clone)]
pub struct DaemonRpcConfig {
    pub url: String,
    pub username: String,
    pub password: String,
    /// Request timeout in seconds, bounded so a hung daemon cannot stall callers
    pub timeout_secs: Option<u64>,
}

/// Custom Debug to redact passwords
impl std::fmt::Debug for DaemonRpcConfig {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("DaemonRpcConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Error type for the DaemonRpcClient
#[derive(Debug)]
pub enum DaemonRpcError {
    HttpError { status_code: u16, message: String },
    ParseError { message: String },
    RpcError { code: i32, message: String },
    Other(String),
}

impl Error for DaemonRpcError {}

impl fmt::Display for DaemonRpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DaemonRpcError::HttpError {
                status_code,
                message,
            } => {
                write!(f, "HTTP error {status_code}: {message}")
            }
            DaemonRpcError::ParseError { message } => {
                write!(f, "Parse error: {message}")
            }
            DaemonRpcError::RpcError { code, message } => {
                write!(f, "RPC error {code}: {message}")
            }
            DaemonRpcError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl DaemonRpcError {
    /// RPC-level errors mean the daemon was reached and answered. Everything
    /// else is a transport problem and worth retrying.
    fn is_transport(&self) -> bool {
        !matches!(self, DaemonRpcError::RpcError { .. })
    }
}

/// Chain info as reported by the daemon's get_info call
#[derive(Deserialize, Debug, Clone)]
pub struct DaemonInfo {
    pub height: u64,
    pub difficulty: u64,
    #[serde(default)]
    pub network_kind: String,
}

/// Block header fields returned by get_block
#[derive(Deserialize, Debug, Clone)]
pub struct DaemonBlockHeader {
    pub height: u64,
    pub hash: String,
    /// Block reward in atomic units
    pub reward: u64,
    pub timestamp: u64,
}

/// A block as returned by get_block: header plus transaction hashes
#[derive(Deserialize, Debug, Clone)]
pub struct DaemonBlock {
    pub block_header: DaemonBlockHeader,
    #[serde(default)]
    pub tx_hashes: Vec<String>,
}

/// Identifies a block to fetch, by height or by hash
#[derive(Debug, Clone)]
pub enum BlockId {
    Height(u64),
    Hash(String),
}

#[derive(Debug, Clone)]
pub struct DaemonRpcClient {
    client: reqwest::Client,
    url: String,
    request_id: Arc<AtomicU64>,
}

impl DaemonRpcClient {
    pub fn new(config: &DaemonRpcConfig) -> Result<Self, DaemonRpcError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::AUTHORIZATION,
            format!(
                "Basic {}",
                STANDARD.encode(format!("{}:{}", config.username, config.password))
            )
            .parse()
            .map_err(|e| DaemonRpcError::Other(format!("Invalid header: {e}")))?,
        );

        let timeout = Duration::from_secs(config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| DaemonRpcError::Other(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: config.url.clone(),
            request_id: Arc::new(AtomicU64::new(0)),
        })
    }

    pub async fn request<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T, DaemonRpcError> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);

        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method: method.to_string(),
            params,
            id,
        };

        let response = match self.client.post(&self.url).json(&request).send().await {
            Ok(resp) => resp,
            Err(e) => {
                error!("HTTP request to daemon failed: method={}, error={}", method, e);
                return Err(DaemonRpcError::Other(format!("HTTP request failed: {e}")));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let status_code = status.as_u16();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            error!(
                "Error reaching daemon with status={}. Message={:?}",
                status_code, error_body
            );
            return Err(DaemonRpcError::HttpError {
                status_code,
                message: error_body,
            });
        }

        let rpc_response: JsonRpcResponse<T> =
            response
                .json()
                .await
                .map_err(|e| DaemonRpcError::ParseError {
                    message: format!("Failed to parse response: {e}"),
                })?;

        if let Some(error) = rpc_response.error {
            return Err(DaemonRpcError::RpcError {
                code: error.code,
                message: error.message,
            });
        }

        rpc_response.result.ok_or(DaemonRpcError::ParseError {
            message: "Response contained neither result nor error".to_string(),
        })
    }

    /// Run an idempotent request with capped exponential backoff on transport
    /// failures. RPC-level errors are returned straight away.
    async fn request_with_retry<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T, DaemonRpcError> {
        let mut attempt = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            match self.request::<T>(method, params.clone()).await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_transport() && attempt < MAX_RETRIES => {
                    attempt += 1;
                    debug!(
                        "{} attempt {} failed ({}), retrying in {}ms",
                        method, attempt, e, backoff_ms
                    );
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms = std::cmp::min(backoff_ms * 2, MAX_BACKOFF_MS);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Get current chain height, difficulty and network kind from the daemon
    pub async fn get_info(&self) -> Result<DaemonInfo, DaemonRpcError> {
        self.request_with_retry("get_info", serde_json::json!({}))
            .await
    }

    /// Get a block header and its transaction list, by height or hash
    pub async fn get_block(&self, id: &BlockId) -> Result<DaemonBlock, DaemonRpcError> {
        let params = match id {
            BlockId::Height(height) => serde_json::json!({ "height": height }),
            BlockId::Hash(hash) => serde_json::json!({ "hash": hash }),
        };
        self.request_with_retry("get_block", params).await
    }

    /// Submit a found block to the daemon.
    ///
    /// Returns Ok(true) when the daemon accepted the block. A daemon-side
    /// rejection comes back as an RPC error and maps to Ok(false): the daemon
    /// was reached and gave a definitive answer, so the caller must not retry.
    pub async fn submit_block(&self, hash: &str) -> Result<bool, DaemonRpcError> {
        let params = serde_json::json!({ "hash": hash });
        match self
            .request_with_retry::<serde_json::Value>("submit_block", params)
            .await
        {
            Ok(result) => {
                let status = result.get("status").and_then(|s| s.as_str()).unwrap_or("");
                Ok(status == "OK")
            }
            Err(DaemonRpcError::RpcError { code, message }) => {
                warn!("Daemon rejected block {}: {} ({})", hash, message, code);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Transfer funds from the pool wallet to the given address.
    ///
    /// Attempted exactly once: callers reserve funds before calling, and a
    /// blind retry here could double-spend the reservation. Returns the
    /// transaction hash, or Ok(None) when the daemon explicitly refused.
    pub async fn transfer(
        &self,
        address: &str,
        amount_atomic: u64,
        fee_atomic: u64,
    ) -> Result<Option<String>, DaemonRpcError> {
        let params = serde_json::json!({
            "destinations": [{ "address": address, "amount": amount_atomic }],
            "fee": fee_atomic,
            "get_tx_key": true,
        });

        match self
            .request::<serde_json::Value>("transfer", params)
            .await
        {
            Ok(result) => {
                let tx_hash = result
                    .get("tx_hash")
                    .and_then(|h| h.as_str())
                    .map(|h| h.to_string());
                if tx_hash.is_none() {
                    warn!("Transfer to {} returned no tx_hash", address);
                }
                Ok(tx_hash)
            }
            Err(DaemonRpcError::RpcError { code, message }) => {
                warn!(
                    "Daemon refused transfer of {} to {}: {} ({})",
                    amount_atomic, address, message, code
                );
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
