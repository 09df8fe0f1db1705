//! JSON-RPC 2.0 transport over HTTP.

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

use crate::domain::RecordError;

/// JSON-RPC request envelope.
#[derive(Debug, Serialize)]
pub struct JsonRpcRequest<'a, P> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: P,
}

impl<'a, P> JsonRpcRequest<'a, P> {
    /// Create a new request.
    pub fn new(method: &'a str, params: P, id: u64) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method,
            params,
        }
    }
}

/// JSON-RPC error object.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcError {
    /// Error code.
    pub code: i64,
    /// Error message.
    pub message: String,
}

/// JSON-RPC response envelope.
#[derive(Debug, Deserialize)]
pub struct JsonRpcResponse<R> {
    /// Present on success.
    pub result: Option<R>,
    /// Present on failure.
    pub error: Option<JsonRpcError>,
}

/// HTTP JSON-RPC client for one endpoint.
pub struct JsonRpcClient {
    client: Client,
    url: String,
    request_id: AtomicU64,
}

impl JsonRpcClient {
    /// Create a client with the given request timeout.
    pub fn new(url: impl Into<String>, timeout_ms: u64) -> Result<Self, RecordError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .connect_timeout(Duration::from_millis(timeout_ms.min(5_000)))
            .build()
            .map_err(|e| RecordError::SourceUnavailable(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: url.into(),
            request_id: AtomicU64::new(1),
        })
    }

    /// Endpoint URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    fn next_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Call `method`; a `null` result is returned as `None`.
    pub async fn call_optional<P: Serialize, R: DeserializeOwned>(
        &self,
        method: &str,
        params: P,
    ) -> Result<Option<R>, RecordError> {
        let id = self.next_id();
        let request = JsonRpcRequest::new(method, params, id);
        debug!("[spore] -> {} #{} {}", self.url, id, method);

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    RecordError::SourceUnavailable(format!("Cannot connect to {}", self.url))
                } else if e.is_timeout() {
                    RecordError::SourceUnavailable(format!("{method} timed out on {}", self.url))
                } else {
                    RecordError::SourceUnavailable(format!("{method}: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!("[spore] {} answered {} to {}", self.url, status, method);
            return Err(RecordError::SourceUnavailable(format!(
                "{method}: HTTP {status} from {}",
                self.url
            )));
        }

        let rpc_response: JsonRpcResponse<R> = response
            .json()
            .await
            .map_err(|e| RecordError::SourceUnavailable(format!("{method}: bad response: {e}")))?;

        if let Some(error) = rpc_response.error {
            return Err(RecordError::SourceUnavailable(format!(
                "{method}: RPC error {}: {}",
                error.code, error.message
            )));
        }

        Ok(rpc_response.result)
    }

    /// Call `method`; a missing result is an error.
    pub async fn call<P: Serialize, R: DeserializeOwned>(
        &self,
        method: &str,
        params: P,
    ) -> Result<R, RecordError> {
        self.call_optional(method, params).await?.ok_or_else(|| {
            RecordError::SourceUnavailable(format!("{method}: missing result in response"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_envelope() {
        let request = JsonRpcRequest::new("get_tip_header", [(); 0], 7);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["jsonrpc"], "2.0");
        assert_eq!(json["id"], 7);
        assert_eq!(json["method"], "get_tip_header");
        assert!(json["params"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_response_error_envelope() {
        let raw = r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"Method not found"}}"#;
        let response: JsonRpcResponse<serde_json::Value> = serde_json::from_str(raw).unwrap();
        assert!(response.result.is_none());
        assert_eq!(response.error.unwrap().code, -32601);
    }

    #[test]
    fn test_request_ids_increase() {
        let client = JsonRpcClient::new("http://127.0.0.1:8114", 1_000).unwrap();
        let first = client.next_id();
        assert_eq!(client.next_id(), first + 1);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_source_unavailable() {
        // port 9 (discard) is closed on test hosts
        let client = JsonRpcClient::new("http://127.0.0.1:9", 500).unwrap();
        let result: Result<serde_json::Value, _> = client.call("get_tip_header", [(); 0]).await;
        assert!(matches!(result, Err(RecordError::SourceUnavailable(_))));
    }
}
