//! Aggregator quote client
//!
//! Purpose:
//!     Fetch price quotes from the DEX-aggregation REST API and map its
//!     failure modes onto the engine's quote-error taxonomy.
//!
//! Author: AI-Generated
//! Created: 2026-08-03

use crate::errors::{EngineError, QuoteErrorKind};
use crate::gateways::QuoteGateway;
use crate::types::{u256_to_f64, Quote, RouteHop, SwapRequest};
use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    #[serde(rename = "toAmount")]
    to_amount: String,
    #[serde(rename = "estimatedGas")]
    estimated_gas: Option<u64>,
    #[serde(default)]
    protocols: Vec<RawHop>,
}

#[derive(Debug, Deserialize)]
struct RawHop {
    name: Option<String>,
    #[serde(rename = "fromTokenAddress")]
    from_token: Option<String>,
    #[serde(rename = "toTokenAddress")]
    to_token: Option<String>,
    part: Option<f64>,
}

pub struct HttpQuoteGateway {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpQuoteGateway {
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

    fn map_status(status: StatusCode, body: String) -> EngineError {
        let kind = match status {
            StatusCode::BAD_REQUEST => QuoteErrorKind::InvalidParams,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => QuoteErrorKind::Auth,
            StatusCode::TOO_MANY_REQUESTS => QuoteErrorKind::RateLimited,
            StatusCode::NOT_FOUND => QuoteErrorKind::RouteNotFound,
            s if s.is_server_error() => QuoteErrorKind::Server,
            _ => QuoteErrorKind::Network,
        };
        EngineError::Quote {
            kind,
            message: format!("aggregator returned {status}: {body}"),
        }
    }

    fn map_transport(err: reqwest::Error) -> EngineError {
        let kind = if err.is_timeout() {
            QuoteErrorKind::Timeout
        } else {
            QuoteErrorKind::Network
        };
        EngineError::Quote {
            kind,
            message: err.to_string(),
        }
    }

    fn convert(response: QuoteResponse) -> Result<Quote, EngineError> {
        let to_amount = U256::from_str(&response.to_amount).map_err(|e| EngineError::Quote {
            kind: QuoteErrorKind::Server,
            message: format!("unparseable toAmount '{}': {e}", response.to_amount),
        })?;
        let route = response
            .protocols
            .into_iter()
            .filter_map(|hop| {
                Some(RouteHop {
                    venue: hop.name?,
                    from_token: Address::from_str(hop.from_token.as_deref()?).ok()?,
                    to_token: Address::from_str(hop.to_token.as_deref()?).ok()?,
                    part_percent: hop.part.unwrap_or(100.0),
                })
            })
            .collect();
        Ok(Quote {
            to_amount,
            estimated_gas: response.estimated_gas.unwrap_or(250_000),
            route,
        })
    }
}

#[async_trait]
impl QuoteGateway for HttpQuoteGateway {
    async fn get_quote(&self, request: &SwapRequest) -> Result<Quote, EngineError> {
        let url = format!("{}/v1/{}/quote", self.base_url, request.chain_id);
        let mut req = self
            .client
            .get(&url)
            .query(&[
                ("src", format!("{:?}", request.from_token)),
                ("dst", format!("{:?}", request.to_token)),
                ("amount", request.amount.to_string()),
                ("from", format!("{:?}", request.user_address)),
            ]);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await.map_err(Self::map_transport)?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Self::map_status(status, body));
        }

        let parsed: QuoteResponse = resp.json().await.map_err(|e| EngineError::Quote {
            kind: QuoteErrorKind::Server,
            message: format!("undecodable quote response: {e}"),
        })?;
        let quote = Self::convert(parsed)?;
        debug!(
            "Quote: {} -> {} out={} gas={} hops={}",
            request.from_token,
            request.to_token,
            u256_to_f64(quote.to_amount),
            quote.estimated_gas,
            quote.route.len()
        );
        Ok(quote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping_covers_taxonomy() {
        let cases = [
            (StatusCode::BAD_REQUEST, QuoteErrorKind::InvalidParams),
            (StatusCode::UNAUTHORIZED, QuoteErrorKind::Auth),
            (StatusCode::TOO_MANY_REQUESTS, QuoteErrorKind::RateLimited),
            (StatusCode::NOT_FOUND, QuoteErrorKind::RouteNotFound),
            (StatusCode::BAD_GATEWAY, QuoteErrorKind::Server),
        ];
        for (status, expected) in cases {
            match HttpQuoteGateway::map_status(status, String::new()) {
                EngineError::Quote { kind, .. } => assert_eq!(kind, expected),
                other => panic!("unexpected error {other:?}"),
            }
        }
    }

    #[test]
    fn test_convert_parses_route() {
        let response = QuoteResponse {
            to_amount: "123456".to_string(),
            estimated_gas: Some(180_000),
            protocols: vec![RawHop {
                name: Some("UNISWAP_V3".to_string()),
                from_token: Some("0x1111111111111111111111111111111111111111".to_string()),
                to_token: Some("0x2222222222222222222222222222222222222222".to_string()),
                part: Some(100.0),
            }],
        };
        let quote = HttpQuoteGateway::convert(response).unwrap();
        assert_eq!(quote.to_amount, U256::from(123_456u64));
        assert_eq!(quote.route.len(), 1);
        assert_eq!(quote.route[0].venue, "UNISWAP_V3");
    }

    #[test]
    fn test_convert_rejects_bad_amount() {
        let response = QuoteResponse {
            to_amount: "not-a-number".to_string(),
            estimated_gas: None,
            protocols: vec![],
        };
        assert!(HttpQuoteGateway::convert(response).is_err());
    }
}
