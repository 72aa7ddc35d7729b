//! Bundle data structures and retry arithmetic
//!
//! Purpose:
//!     BundleRecord lifecycle types, transaction-list validation, and the
//!     bounded backoff computation. The retry/backoff/fallback decision is
//!     kept in pure functions here so it is testable without any network.
//!
//! Author: AI-Generated
//! Created: 2026-08-03
//!
//! Design:
//!     - One BundleRecord per submission attempt; a retry mints a NEW
//!       record linked via RetryLink, the original stays frozen
//!     - Terminal statuses (CONFIRMED/FAILED/EXPIRED/REVERTED) never
//!       change in place; transition() refuses

use crate::errors::EngineError;
use alloy::primitives::{Address, Bytes, B256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Bundles wrap at most this many transactions.
pub const MAX_BUNDLE_TXS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BundleStatus {
    Pending,
    Submitted,
    Confirmed,
    Failed,
    Expired,
    Reverted,
}

impl BundleStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BundleStatus::Confirmed
                | BundleStatus::Failed
                | BundleStatus::Expired
                | BundleStatus::Reverted
        )
    }

    /// Only already-terminal failure states can seed a retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BundleStatus::Failed | BundleStatus::Expired | BundleStatus::Reverted
        )
    }
}

impl fmt::Display for BundleStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BundleStatus::Pending => write!(f, "PENDING"),
            BundleStatus::Submitted => write!(f, "SUBMITTED"),
            BundleStatus::Confirmed => write!(f, "CONFIRMED"),
            BundleStatus::Failed => write!(f, "FAILED"),
            BundleStatus::Expired => write!(f, "EXPIRED"),
            BundleStatus::Reverted => write!(f, "REVERTED"),
        }
    }
}

/// Where relay refunds (if any) should land.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RefundConfig {
    pub recipient: Address,
    pub percent: u8,
}

/// Link from a retry record back to the bundle it replaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryLink {
    pub original_bundle_id: String,
    /// 1-based position in the retry chain.
    pub attempt_number: u32,
    pub max_retries: u32,
    /// The failure that triggered this retry.
    pub last_error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleRecord {
    pub bundle_id: String,
    pub bundle_hash: Option<B256>,
    pub target_block: u64,
    pub status: BundleStatus,
    pub owner: Address,
    /// Signed transaction blobs, in execution order.
    pub transactions: Vec<Bytes>,
    pub gas_estimate: u64,
    pub gas_price_gwei: f64,
    pub refund: Option<RefundConfig>,
    /// In-call submission attempts consumed by this record.
    pub submission_attempts: u32,
    pub last_submission_attempt: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub retry_link: Option<RetryLink>,
}

impl BundleRecord {
    pub fn new(owner: Address, transactions: Vec<Bytes>, target_block: u64) -> Self {
        Self {
            bundle_id: format!("bundle_{}", uuid::Uuid::new_v4()),
            bundle_hash: None,
            target_block,
            status: BundleStatus::Pending,
            owner,
            transactions,
            gas_estimate: 0,
            gas_price_gwei: 0.0,
            refund: None,
            submission_attempts: 0,
            last_submission_attempt: None,
            last_error: None,
            created_at: Utc::now(),
            retry_link: None,
        }
    }

    /// Status transition honoring terminal-state immutability.
    pub fn transition(&mut self, next: BundleStatus) -> Result<(), EngineError> {
        if self.status.is_terminal() {
            return Err(EngineError::validation(
                "status",
                format!(
                    "bundle {} is terminal ({}) and cannot move to {}",
                    self.bundle_id, self.status, next
                ),
            ));
        }
        self.status = next;
        Ok(())
    }

    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.created_at
    }
}

/// Relay retry/fallback configuration (environment-sourced).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleConfig {
    /// Blocks ahead of the current head to target.
    pub target_block_offset: u64,
    /// Extra submission attempts after the first one.
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub fallback_enabled: bool,
    pub fallback_gas_price_gwei: f64,
    pub fallback_slippage: f64,
    /// Permit canned simulation estimates when no relay session exists.
    pub allow_degraded_simulation: bool,
    pub refund: Option<RefundConfig>,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            target_block_offset: 1,
            max_retries: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
            fallback_enabled: true,
            fallback_gas_price_gwei: 50.0,
            fallback_slippage: 1.0,
            allow_degraded_simulation: false,
            refund: None,
        }
    }
}

/// Delay before attempt `attempt + 1`:
/// min(base × multiplier^(attempt − 1), max).
pub fn backoff_delay(config: &BundleConfig, attempt: u32) -> Duration {
    let factor = config
        .backoff_multiplier
        .powi(attempt.saturating_sub(1) as i32);
    let ms = (config.base_delay_ms as f64 * factor).min(config.max_delay_ms as f64);
    Duration::from_millis(ms as u64)
}

/// Bundles carry 1–10 well-formed transaction encodings: an EIP-2718 typed
/// envelope (0x01–0x04) or a legacy RLP list (first byte ≥ 0xc0).
pub fn validate_bundle_transactions(txs: &[Bytes]) -> Result<(), EngineError> {
    if txs.is_empty() {
        return Err(EngineError::validation(
            "transactions",
            "bundle must contain at least one transaction",
        ));
    }
    if txs.len() > MAX_BUNDLE_TXS {
        return Err(EngineError::validation(
            "transactions",
            format!("bundle holds {} transactions, maximum is {MAX_BUNDLE_TXS}", txs.len()),
        ));
    }
    for (index, tx) in txs.iter().enumerate() {
        let valid = match tx.first() {
            Some(0x01..=0x04) => tx.len() > 1,
            Some(prefix) => *prefix >= 0xc0,
            None => false,
        };
        if !valid {
            return Err(EngineError::validation(
                "transactions",
                format!("transaction {index} is not a well-formed encoding"),
            ));
        }
    }
    Ok(())
}
