//! Private relay client
//!
//! Purpose:
//!     JSON-RPC client for the bundle relay: simulate, submit, and chain
//!     height. Submission requires a relay session (signing key header);
//!     without one every call fails and the bundle orchestrator decides
//!     whether degraded simulation is acceptable.
//!
//! Author: AI-Generated
//! Created: 2026-08-03

use crate::bundle::RefundConfig;
use crate::errors::EngineError;
use crate::gateways::{BundleSimulation, RelayGateway};
use alloy::primitives::{Bytes, B256};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

pub struct HttpRelayGateway {
    client: Client,
    relay_url: String,
    /// Relay session identity; `X-Flashbots-Signature`-style header value.
    session_key: Option<String>,
}

impl HttpRelayGateway {
    pub fn new(relay_url: String, session_key: Option<String>, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .expect("reqwest client"),
            relay_url,
            session_key,
        }
    }

    async fn rpc(&self, method: &str, params: Value) -> Result<Value, EngineError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        let mut req = self.client.post(&self.relay_url).json(&body);
        if let Some(key) = &self.session_key {
            req = req.header("X-Relay-Signature", key);
        }
        let resp = req
            .send()
            .await
            .map_err(|e| EngineError::Relay(format!("{method} transport error: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(EngineError::Relay(format!("{method} returned {status}")));
        }
        let parsed: RpcResponse = resp
            .json()
            .await
            .map_err(|e| EngineError::Relay(format!("{method} undecodable response: {e}")))?;
        if let Some(err) = parsed.error {
            return Err(EngineError::Relay(format!(
                "{method} rejected ({}): {}",
                err.code, err.message
            )));
        }
        parsed
            .result
            .ok_or_else(|| EngineError::Relay(format!("{method} returned empty result")))
    }

    fn encode_txs(txs: &[Bytes]) -> Vec<String> {
        txs.iter().map(|tx| format!("0x{}", hex_encode(tx))).collect()
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn parse_hex_u64(value: &Value) -> Option<u64> {
    let s = value.as_str()?;
    u64::from_str_radix(s.strip_prefix("0x").unwrap_or(s), 16).ok()
}

#[async_trait]
impl RelayGateway for HttpRelayGateway {
    fn has_session(&self) -> bool {
        self.session_key.is_some()
    }

    async fn simulate_bundle(
        &self,
        txs: &[Bytes],
        target_block: u64,
    ) -> Result<BundleSimulation, EngineError> {
        if !self.has_session() {
            return Err(EngineError::Relay(
                "no relay session configured".to_string(),
            ));
        }
        let params = json!([{
            "txs": Self::encode_txs(txs),
            "blockNumber": format!("0x{target_block:x}"),
        }]);
        let result = self.rpc("eth_callBundle", params).await?;

        let gas_used = result
            .get("totalGasUsed")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        let gas_price_wei = result
            .get("bundleGasPrice")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse::<f64>().ok())
            .unwrap_or(0.0);
        let profit_wei = result
            .get("coinbaseDiff")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse::<u128>().ok())
            .unwrap_or(0);
        debug!(
            "Bundle simulation: gas_used={gas_used} gas_price={gas_price_wei}wei block={target_block}"
        );
        Ok(BundleSimulation {
            gas_used,
            effective_gas_price_gwei: gas_price_wei / 1e9,
            profit_wei,
        })
    }

    async fn submit_bundle(
        &self,
        txs: &[Bytes],
        target_block: u64,
        refund: Option<&RefundConfig>,
    ) -> Result<B256, EngineError> {
        if !self.has_session() {
            return Err(EngineError::Relay(
                "no relay session configured".to_string(),
            ));
        }
        let mut bundle = json!({
            "txs": Self::encode_txs(txs),
            "blockNumber": format!("0x{target_block:x}"),
        });
        if let Some(r) = refund {
            bundle["refundRecipient"] = json!(format!("{:?}", r.recipient));
            bundle["refundPercent"] = json!(r.percent);
        }
        let result = self.rpc("eth_sendBundle", json!([bundle])).await?;
        let hash_str = result
            .get("bundleHash")
            .and_then(|v| v.as_str())
            .ok_or_else(|| EngineError::Relay("submit response missing bundleHash".to_string()))?;
        B256::from_str(hash_str)
            .map_err(|e| EngineError::Relay(format!("malformed bundleHash '{hash_str}': {e}")))
    }

    async fn block_number(&self) -> Result<u64, EngineError> {
        let result = self.rpc("eth_blockNumber", json!([])).await?;
        parse_hex_u64(&result)
            .ok_or_else(|| EngineError::Relay(format!("malformed block number: {result}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tx_hex_encoding() {
        let txs = vec![Bytes::from(vec![0x02, 0xf8, 0x6f])];
        assert_eq!(HttpRelayGateway::encode_txs(&txs), vec!["0x02f86f"]);
    }

    #[test]
    fn test_parse_hex_block_number() {
        assert_eq!(parse_hex_u64(&json!("0x10")), Some(16));
        assert_eq!(parse_hex_u64(&json!("ff")), Some(255));
        assert_eq!(parse_hex_u64(&json!(12)), None);
    }

    #[tokio::test]
    async fn test_no_session_refuses_before_network() {
        let relay = HttpRelayGateway::new(
            "http://127.0.0.1:1".to_string(),
            None,
            Duration::from_millis(100),
        );
        assert!(!relay.has_session());
        let err = relay
            .simulate_bundle(&[Bytes::from(vec![0x02, 0x01])], 100)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no relay session"));
    }
}
