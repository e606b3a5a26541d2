pub mod methods;

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::ProviderError;

/// EIP-1193 request capability: `request({ method, params })`.
///
/// Implemented by [`HttpProvider`] for wallets reachable over JSON-RPC, and by
/// in-memory fakes in tests.
pub trait Eip1193: Send + Sync {
    fn request(
        &self,
        method: &str,
        params: Value,
    ) -> impl Future<Output = Result<Value, ProviderError>> + Send;
}

/// JSON-RPC over HTTP transport for an EIP-1193 wallet (e.g. Frame on
/// `http://127.0.0.1:1248`, or a dev node with unlocked accounts).
#[derive(Debug)]
pub struct HttpProvider {
    client: Client,
    url: String,
    next_id: AtomicU64,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    #[serde(default)]
    message: String,
}

impl HttpProvider {
    pub fn new(url: &str) -> Self {
        Self {
            client: Client::new(),
            url: url.to_string(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Get the endpoint URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Eip1193 for HttpProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        debug!(id, method, "rpc request");

        let resp = self.client.post(&self.url).json(&body).send().await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Http { status, message });
        }

        let resp: RpcResponse = resp.json().await?;
        match (resp.error, resp.result) {
            (Some(err), _) => Err(ProviderError::Rpc {
                code: err.code,
                message: err.message,
            }),
            (None, Some(result)) => Ok(result),
            (None, None) => Ok(Value::Null),
        }
    }
}

/// Look up the wallet provider configured in the environment.
///
/// Returns `None` when no URL is configured or it is not a valid `http(s)`
/// URL; absence of a wallet is a normal state, not an error.
pub fn detect_provider(wallet_url: Option<&str>) -> Option<HttpProvider> {
    let raw = wallet_url.map(str::trim).filter(|u| !u.is_empty())?;
    match url::Url::parse(raw) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {
            debug!(url = %parsed, "wallet provider detected");
            Some(HttpProvider::new(raw))
        }
        Ok(parsed) => {
            warn!(scheme = parsed.scheme(), "unsupported wallet URL scheme");
            None
        }
        Err(e) => {
            warn!(url = raw, error = %e, "invalid wallet URL");
            None
        }
    }
}

/// Encode bytes as `0x`-prefixed hex.
pub fn encode_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Decode a hex string (with optional `0x` prefix) to bytes.
pub fn decode_hex(value: &str) -> Result<Vec<u8>, ProviderError> {
    let stripped = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(stripped)
        .map_err(|e| ProviderError::InvalidResponse(format!("invalid hex string: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_provider_absent() {
        assert!(detect_provider(None).is_none());
        assert!(detect_provider(Some("")).is_none());
        assert!(detect_provider(Some("   ")).is_none());
    }

    #[test]
    fn test_detect_provider_rejects_bad_urls() {
        assert!(detect_provider(Some("not a url")).is_none());
        assert!(detect_provider(Some("ws://127.0.0.1:1248")).is_none());
    }

    #[test]
    fn test_detect_provider_present() {
        let provider = detect_provider(Some("http://127.0.0.1:1248")).unwrap();
        assert_eq!(provider.url(), "http://127.0.0.1:1248");
    }

    #[test]
    fn test_hex_helpers() {
        assert_eq!(encode_hex(&[0x12, 0x06, 0x5f, 0xe0]), "0x12065fe0");
        assert_eq!(decode_hex("0x12065fe0").unwrap(), vec![0x12, 0x06, 0x5f, 0xe0]);
        assert_eq!(decode_hex("0x").unwrap(), Vec::<u8>::new());
        assert!(decode_hex("0xnothex").is_err());
    }
}
