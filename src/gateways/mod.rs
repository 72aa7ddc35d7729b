//! External collaborator interfaces
//!
//! Purpose:
//!     Trait boundaries for the quote aggregator, market-data provider,
//!     private relay, and public swap submission path. The engine only
//!     ever sees these traits; HTTP clients and the deterministic
//!     synthetic market source implement them.
//!
//! Author: AI-Generated
//! Created: 2026-08-03

pub mod market;
pub mod quote;
pub mod relay;
pub mod submission;

pub use market::{HttpMarketGateway, SyntheticMarketGateway};
pub use quote::HttpQuoteGateway;
pub use relay::HttpRelayGateway;
pub use submission::HttpSubmissionGateway;

use crate::bundle::RefundConfig;
use crate::errors::EngineError;
use crate::types::{MarketTrend, Quote, SwapRequest};
use alloy::primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Gas-market estimates for one chain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GasSignals {
    pub base_fee_gwei: f64,
    pub priority_fee_gwei: f64,
    /// Mempool congestion estimate in [0, 1].
    pub congestion: f64,
}

/// Relay's view of a simulated bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleSimulation {
    pub gas_used: u64,
    pub effective_gas_price_gwei: f64,
    /// Searcher-visible profit in wei (zero for plain user bundles).
    pub profit_wei: u128,
}

#[async_trait]
pub trait QuoteGateway: Send + Sync {
    async fn get_quote(&self, request: &SwapRequest) -> Result<Quote, EngineError>;
}

/// Best-effort market data. Implementations absorb failures into the
/// documented fallback constants instead of propagating errors.
#[async_trait]
pub trait MarketSignalGateway: Send + Sync {
    async fn volatility(&self, token: Address) -> f64;
    async fn liquidity(&self, token: Address) -> f64;
    async fn market_trend(&self, token: Address) -> MarketTrend;
    async fn gas_signals(&self, chain_id: u64) -> GasSignals;
}

#[async_trait]
pub trait RelayGateway: Send + Sync {
    /// False when no relay session (auth key) is configured; the bundle
    /// orchestrator then decides between degraded simulation and refusal.
    fn has_session(&self) -> bool;

    async fn simulate_bundle(
        &self,
        txs: &[Bytes],
        target_block: u64,
    ) -> Result<BundleSimulation, EngineError>;

    async fn submit_bundle(
        &self,
        txs: &[Bytes],
        target_block: u64,
        refund: Option<&RefundConfig>,
    ) -> Result<B256, EngineError>;

    async fn block_number(&self) -> Result<u64, EngineError>;
}

/// Public (non-relay) submission path.
#[async_trait]
pub trait SwapSubmissionGateway: Send + Sync {
    /// Submit the swap through the aggregator's public path; returns the
    /// transaction hash.
    async fn submit_swap(
        &self,
        request: &SwapRequest,
        quote: &Quote,
    ) -> Result<String, EngineError>;
}
