//! RPC gateway: the single async call primitive between the panel and the
//! playback backend.
//!
//! The gateway performs exactly one remote invocation per `call` and never
//! retries; retry policy, if any, belongs to callers.

use std::time::Duration;

use async_trait::async_trait;
use remote_proto::protocol::{Method, RpcFault, RpcReply, RPC_PATH_PREFIX};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, trace};

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("backend unreachable: {0}")]
    Transport(String),

    #[error("{method} timed out")]
    Timeout { method: Method },

    #[error("{method} failed: {message}")]
    Backend { method: Method, message: String },

    #[error("malformed {method} result: {message}")]
    Decode { method: Method, message: String },
}

#[async_trait]
pub trait RpcGateway: Send + Sync {
    /// Invoke `method` with the argument object `args` and return the raw
    /// result payload.
    async fn call(&self, method: Method, args: Value) -> Result<Value, RpcError>;
}

/// Call `method` and decode its result into `T`.
pub async fn invoke<T: DeserializeOwned>(
    gateway: &dyn RpcGateway,
    method: Method,
    args: Value,
) -> Result<T, RpcError> {
    let raw = gateway.call(method, args).await?;
    serde_json::from_value(raw).map_err(|e| RpcError::Decode {
        method,
        message: e.to_string(),
    })
}

/// Empty argument bag for methods that take none.
pub fn no_args() -> Value {
    Value::Object(serde_json::Map::new())
}

// ── HTTP transport ────────────────────────────────────────────────────────────

/// Gateway speaking the daemon's `POST /rpc/{method}` JSON transport.
pub struct HttpGateway {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpGateway {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, RpcError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcError::Transport(e.to_string()))?;
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        Ok(Self { client, endpoint })
    }

    fn url_for(&self, method: Method) -> String {
        format!("{}{}/{}", self.endpoint, RPC_PATH_PREFIX, method)
    }
}

#[async_trait]
impl RpcGateway for HttpGateway {
    async fn call(&self, method: Method, args: Value) -> Result<Value, RpcError> {
        let url = self.url_for(method);
        trace!("rpc: POST {} {}", url, args);

        let response = self
            .client
            .post(&url)
            .json(&args)
            .send()
            .await
            .map_err(|e| classify(method, e))?;

        let status = response.status();
        if status.is_success() {
            let reply: RpcReply = response.json().await.map_err(|e| {
                if e.is_timeout() {
                    RpcError::Timeout { method }
                } else {
                    RpcError::Decode {
                        method,
                        message: e.to_string(),
                    }
                }
            })?;
            debug!("rpc: {} ok", method);
            return Ok(reply.result);
        }

        let message = match response.json::<RpcFault>().await {
            Ok(fault) => fault.error,
            Err(_) => status.to_string(),
        };
        debug!("rpc: {} failed: {}", method, message);
        Err(RpcError::Backend { method, message })
    }
}

fn classify(method: Method, e: reqwest::Error) -> RpcError {
    if e.is_timeout() {
        RpcError::Timeout { method }
    } else {
        RpcError::Transport(e.to_string())
    }
}
