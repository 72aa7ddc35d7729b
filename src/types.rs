// Core data structures for the swap execution engine.
// Request/quote inputs, swap records, and the shared risk/market enums.

use crate::errors::EngineError;
use alloy::primitives::{Address, Bytes, U256};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Chains the aggregator routes on. Requests for anything else are
/// rejected at validation time.
pub const SUPPORTED_CHAINS: &[u64] = &[1, 10, 56, 137, 324, 8453, 42161, 43114];

/// Dust floor for swap amounts (base token units).
pub static MIN_SWAP_AMOUNT: Lazy<U256> = Lazy::new(|| U256::from(1_000u64));

/// Upper bound on swap amounts (base token units, ~1e30).
pub static MAX_SWAP_AMOUNT: Lazy<U256> =
    Lazy::new(|| U256::from(10u64).pow(U256::from(30u64)));

/// Lossy U256 → f64 conversion for risk math. Values past u128 saturate;
/// the validation bounds keep real amounts far below that.
pub fn u256_to_f64(value: U256) -> f64 {
    u128::try_from(value).map(|v| v as f64).unwrap_or(u128::MAX as f64)
}

/// Directional market signal from the Market Signal Gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketTrend {
    Bullish,
    Bearish,
    Neutral,
}

impl fmt::Display for MarketTrend {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MarketTrend::Bullish => write!(f, "BULLISH"),
            MarketTrend::Bearish => write!(f, "BEARISH"),
            MarketTrend::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

/// Coarse market regime fed into the tolerance model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketCondition {
    Stable,
    Volatile,
    Extreme,
}

impl fmt::Display for MarketCondition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MarketCondition::Stable => write!(f, "STABLE"),
            MarketCondition::Volatile => write!(f, "VOLATILE"),
            MarketCondition::Extreme => write!(f, "EXTREME"),
        }
    }
}

/// Risk tier shared by the tolerance model and every pipeline sub-analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Weight applied when aggregating risk factors into a single score.
    pub fn severity_weight(&self) -> f64 {
        match self {
            RiskLevel::Low => 0.25,
            RiskLevel::Medium => 0.5,
            RiskLevel::High => 0.75,
            RiskLevel::Critical => 1.0,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "LOW"),
            RiskLevel::Medium => write!(f, "MEDIUM"),
            RiskLevel::High => write!(f, "HIGH"),
            RiskLevel::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// A desired swap, as handed to the engine by the (out-of-scope) controller
/// layer. Immutable once validated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapRequest {
    pub from_token: Address,
    pub to_token: Address,
    /// Amount of `from_token` in base units.
    pub amount: U256,
    pub chain_id: u64,
    pub user_address: Address,
    /// Caller-pinned slippage tolerance in percent. None = engine decides.
    pub slippage: Option<f64>,
    pub deadline: Option<DateTime<Utc>>,
    pub gas_price_gwei: Option<f64>,
    /// Optional EIP-2612 permit blob, passed through to the aggregator.
    pub permit: Option<Bytes>,
}

impl SwapRequest {
    pub fn new(
        from_token: Address,
        to_token: Address,
        amount: U256,
        chain_id: u64,
        user_address: Address,
    ) -> Self {
        Self {
            from_token,
            to_token,
            amount,
            chain_id,
            user_address,
            slippage: None,
            deadline: None,
            gas_price_gwei: None,
            permit: None,
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.from_token == self.to_token {
            return Err(EngineError::validation(
                "to_token",
                "from_token and to_token must differ",
            ));
        }
        if self.amount < *MIN_SWAP_AMOUNT {
            return Err(EngineError::validation(
                "amount",
                format!("amount {} below minimum {}", self.amount, *MIN_SWAP_AMOUNT),
            ));
        }
        if self.amount > *MAX_SWAP_AMOUNT {
            return Err(EngineError::validation(
                "amount",
                format!("amount {} above maximum {}", self.amount, *MAX_SWAP_AMOUNT),
            ));
        }
        if !SUPPORTED_CHAINS.contains(&self.chain_id) {
            return Err(EngineError::validation(
                "chain_id",
                format!("chain {} is not supported", self.chain_id),
            ));
        }
        if let Some(s) = self.slippage {
            if !(s > 0.0 && s < 100.0) {
                return Err(EngineError::validation(
                    "slippage",
                    format!("slippage {s} outside (0, 100)"),
                ));
            }
        }
        Ok(())
    }
}

/// One hop of the aggregator's route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteHop {
    /// Venue name as reported by the aggregator (e.g. "UNISWAP_V3").
    pub venue: String,
    pub from_token: Address,
    pub to_token: Address,
    /// Share of the amount routed through this hop, in percent.
    pub part_percent: f64,
}

/// Price quote snapshot from the aggregator. Sourced once per request and
/// never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    /// Expected output amount in `to_token` base units.
    pub to_amount: U256,
    pub estimated_gas: u64,
    pub route: Vec<RouteHop>,
}

impl Quote {
    pub fn is_executable(&self) -> bool {
        !self.to_amount.is_zero()
    }
}

/// Lifecycle of an accepted swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwapStatus {
    Pending,
    Confirmed,
    Failed,
    Cancelled,
    Expired,
}

impl SwapStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SwapStatus::Pending)
    }
}

impl fmt::Display for SwapStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SwapStatus::Pending => write!(f, "PENDING"),
            SwapStatus::Confirmed => write!(f, "CONFIRMED"),
            SwapStatus::Failed => write!(f, "FAILED"),
            SwapStatus::Cancelled => write!(f, "CANCELLED"),
            SwapStatus::Expired => write!(f, "EXPIRED"),
        }
    }
}

/// Record of a swap accepted for execution. Created by the execution
/// orchestrator, mutated only through status transitions, never deleted
/// (history queries read the soft-retained records).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapRecord {
    pub swap_id: String,
    pub status: SwapStatus,
    pub request: SwapRequest,
    pub quote: Quote,
    /// Set when the swap went through the private-relay path.
    pub bundle_id: Option<String>,
    /// One hash per submitted transaction (several for split swaps).
    pub tx_hashes: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub fallback_used: bool,
    pub fallback_reason: Option<String>,
}

impl SwapRecord {
    pub fn new(request: SwapRequest, quote: Quote, deadline: DateTime<Utc>) -> Self {
        let now = Utc::now();
        Self {
            swap_id: format!("swap_{}", uuid::Uuid::new_v4()),
            status: SwapStatus::Pending,
            request,
            quote,
            bundle_id: None,
            tx_hashes: Vec::new(),
            created_at: now,
            updated_at: now,
            deadline,
            fallback_used: false,
            fallback_reason: None,
        }
    }

    pub fn set_status(&mut self, status: SwapStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    /// Lazy deadline-expiry check, applied on read by the orchestrator.
    /// Returns true if the record transitioned to Expired.
    pub fn expire_if_past_deadline(&mut self, now: DateTime<Utc>) -> bool {
        if self.status == SwapStatus::Pending && now > self.deadline {
            self.set_status(SwapStatus::Expired);
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(amount: u64) -> SwapRequest {
        SwapRequest::new(
            Address::repeat_byte(0x11),
            Address::repeat_byte(0x22),
            U256::from(amount),
            1,
            Address::repeat_byte(0xaa),
        )
    }

    #[test]
    fn test_validate_accepts_plain_request() {
        assert!(request(1_000_000).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_same_token() {
        let mut req = request(1_000_000);
        req.to_token = req.from_token;
        assert!(matches!(
            req.validate(),
            Err(EngineError::Validation { field, .. }) if field == "to_token"
        ));
    }

    #[test]
    fn test_validate_rejects_dust_amount() {
        assert!(request(10).validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_chain() {
        let mut req = request(1_000_000);
        req.chain_id = 31337;
        assert!(matches!(
            req.validate(),
            Err(EngineError::Validation { field, .. }) if field == "chain_id"
        ));
    }

    #[test]
    fn test_expiry_only_from_pending() {
        let quote = Quote {
            to_amount: U256::from(5u64),
            estimated_gas: 210_000,
            route: vec![],
        };
        let past = Utc::now() - chrono::Duration::seconds(60);
        let mut record = SwapRecord::new(request(1_000_000), quote, past);
        assert!(record.expire_if_past_deadline(Utc::now()));
        assert_eq!(record.status, SwapStatus::Expired);

        // A second read does not flap the status.
        assert!(!record.expire_if_past_deadline(Utc::now()));
        assert_eq!(record.status, SwapStatus::Expired);
    }
}
