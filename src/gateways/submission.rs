//! Public swap submission client
//!
//! Purpose:
//!     The non-relay execution path: hand the validated request to the
//!     aggregator's swap endpoint, which builds, signs (via the external
//!     wallet subsystem) and broadcasts the transaction, returning its hash.
//!
//! Author: AI-Generated
//! Created: 2026-08-03

use crate::errors::{EngineError, QuoteErrorKind};
use crate::gateways::SwapSubmissionGateway;
use crate::types::{Quote, SwapRequest};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Deserialize)]
struct SwapResponse {
    #[serde(rename = "txHash")]
    tx_hash: String,
}

pub struct HttpSubmissionGateway {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpSubmissionGateway {
    pub fn new(base_url: String, api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .expect("reqwest client"),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl SwapSubmissionGateway for HttpSubmissionGateway {
    async fn submit_swap(
        &self,
        request: &SwapRequest,
        quote: &Quote,
    ) -> Result<String, EngineError> {
        let url = format!("{}/v1/{}/swap", self.base_url, request.chain_id);
        let mut body = json!({
            "src": format!("{:?}", request.from_token),
            "dst": format!("{:?}", request.to_token),
            "amount": request.amount.to_string(),
            "from": format!("{:?}", request.user_address),
            "minToAmount": quote.to_amount.to_string(),
        });
        if let Some(slippage) = request.slippage {
            body["slippage"] = json!(slippage);
        }
        if let Some(gas_price) = request.gas_price_gwei {
            body["gasPriceGwei"] = json!(gas_price);
        }
        if let Some(permit) = &request.permit {
            body["permit"] = json!(format!("{permit}"));
        }

        let mut req = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let resp = req.send().await.map_err(|e| {
            if e.is_timeout() {
                EngineError::Quote {
                    kind: QuoteErrorKind::Timeout,
                    message: format!("swap submission timed out: {e}"),
                }
            } else {
                EngineError::Submission(e.to_string())
            }
        })?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(EngineError::Submission(format!(
                "aggregator swap endpoint returned {status}: {body}"
            )));
        }
        let parsed: SwapResponse = resp
            .json()
            .await
            .map_err(|e| EngineError::Submission(format!("undecodable swap response: {e}")))?;
        info!("Swap submitted via public path: {}", parsed.tx_hash);
        Ok(parsed.tx_hash)
    }
}
