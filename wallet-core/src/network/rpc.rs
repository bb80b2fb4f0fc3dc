// wallet-core/src/network/rpc.rs
//
// JSON-RPC 2.0 over HTTP. Ethereum, the Alchemy indexer and Solana all speak
// it, so chain clients only differ in method names and payloads.

use crate::error::WalletError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RpcError {
    /// Request never produced a JSON-RPC answer (DNS, TLS, timeout, HTTP 5xx).
    #[error("transport: {0}")]
    Transport(String),

    /// The node answered with an `error` object.
    #[error("rpc error {code}: {message}")]
    Rejected { code: i64, message: String },

    /// The node answered with something that is not the expected shape.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl RpcError {
    /// Message text for classification against provider error strings.
    pub fn message(&self) -> &str {
        match self {
            RpcError::Transport(m) | RpcError::Malformed(m) => m,
            RpcError::Rejected { message, .. } => message,
        }
    }
}

/// Read-path default: anything that went wrong talking to the provider.
impl From<RpcError> for WalletError {
    fn from(err: RpcError) -> Self {
        WalletError::ProviderUnavailable(err.to_string())
    }
}

#[async_trait]
pub trait RpcTransport: Send + Sync {
    /// Returns the `result` member; JSON `null` is a valid result.
    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError>;
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

pub struct HttpTransport {
    http: Client,
    url: String,
    next_id: AtomicU64,
}

// The endpoint usually embeds an API key, keep it out of logs.
impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("requests", &self.next_id.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl HttpTransport {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, WalletError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WalletError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            url: url.into(),
            next_id: AtomicU64::new(1),
        })
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        debug!(method, id, "rpc request");

        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!(method, "rpc transport failure: {}", e);
                RpcError::Transport(e.without_url().to_string())
            })?;

        let status = response.status();
        let envelope: RpcEnvelope = response.json().await.map_err(|e| {
            if status.is_success() {
                RpcError::Malformed(e.without_url().to_string())
            } else {
                RpcError::Transport(format!("HTTP {}", status))
            }
        })?;

        if let Some(err) = envelope.error {
            debug!(method, code = err.code, "rpc rejected: {}", err.message);
            return Err(RpcError::Rejected {
                code: err.code,
                message: err.message,
            });
        }
        Ok(envelope.result)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Canned JSON-RPC responses for chain client tests.

    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    /// Responses are queued per method. The last queued response for a
    /// method keeps being returned once the others are consumed.
    #[derive(Default)]
    pub struct ScriptedTransport {
        responses: Mutex<HashMap<String, VecDeque<Result<Value, RpcError>>>>,
        calls: Mutex<Vec<(String, Value)>>,
    }

    impl ScriptedTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn respond(self, method: &str, result: Value) -> Self {
            self.push(method, Ok(result));
            self
        }

        pub fn fail(self, method: &str, err: RpcError) -> Self {
            self.push(method, Err(err));
            self
        }

        fn push(&self, method: &str, response: Result<Value, RpcError>) {
            self.responses
                .lock()
                .unwrap()
                .entry(method.to_string())
                .or_default()
                .push_back(response);
        }

        pub fn calls(&self) -> Vec<(String, Value)> {
            self.calls.lock().unwrap().clone()
        }

        pub fn calls_to(&self, method: &str) -> Vec<Value> {
            self.calls()
                .into_iter()
                .filter(|(m, _)| m == method)
                .map(|(_, p)| p)
                .collect()
        }
    }

    #[async_trait]
    impl RpcTransport for ScriptedTransport {
        async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
            self.calls
                .lock()
                .unwrap()
                .push((method.to_string(), params));

            let mut responses = self.responses.lock().unwrap();
            let queue = responses
                .get_mut(method)
                .ok_or_else(|| RpcError::Transport(format!("no scripted response for {}", method)))?;
            if queue.len() > 1 {
                queue.pop_front().unwrap()
            } else {
                queue.front().cloned().unwrap()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedTransport;
    use super::*;

    #[test]
    fn test_envelope_parsing() {
        let ok: RpcEnvelope = serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"result":"0x10"}"#).unwrap();
        assert_eq!(ok.result, json!("0x10"));
        assert!(ok.error.is_none());

        let null: RpcEnvelope = serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"result":null}"#).unwrap();
        assert!(null.result.is_null());

        let err: RpcEnvelope = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32000,"message":"insufficient funds for gas * price + value"}}"#,
        )
        .unwrap();
        assert_eq!(err.error.unwrap().code, -32000);
    }

    #[test]
    fn test_rpc_error_maps_to_provider_unavailable() {
        let err: WalletError = RpcError::Transport("connection refused".into()).into();
        assert!(matches!(err, WalletError::ProviderUnavailable(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_scripted_transport_queues_then_repeats_last() {
        let t = ScriptedTransport::new()
            .respond("eth_blockNumber", json!("0x1"))
            .respond("eth_blockNumber", json!("0x2"));

        assert_eq!(t.call("eth_blockNumber", json!([])).await.unwrap(), json!("0x1"));
        assert_eq!(t.call("eth_blockNumber", json!([])).await.unwrap(), json!("0x2"));
        assert_eq!(t.call("eth_blockNumber", json!([])).await.unwrap(), json!("0x2"));
        assert!(t.call("eth_chainId", json!([])).await.is_err());
        assert_eq!(t.calls_to("eth_blockNumber").len(), 3);
    }
}
