//! Risk-report data structures
//!
//! Purpose:
//!     Output types of the simulation pipeline: per-dimension analyses,
//!     aggregated recommendations, the weighted risk assessment, and the
//!     final execution-strategy decision. Produced fresh per request,
//!     never cached.
//!
//! Author: AI-Generated
//! Created: 2026-08-03

use crate::types::{MarketCondition, MarketTrend, RiskLevel};
use alloy::primitives::U256;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How the trade should be carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStrategy {
    Immediate,
    Wait,
    Split,
    Cancel,
}

impl fmt::Display for ExecutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ExecutionStrategy::Immediate => write!(f, "IMMEDIATE"),
            ExecutionStrategy::Wait => write!(f, "WAIT"),
            ExecutionStrategy::Split => write!(f, "SPLIT"),
            ExecutionStrategy::Cancel => write!(f, "CANCEL"),
        }
    }
}

/// Gas bidding posture derived from congestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GasStrategy {
    Aggressive,
    Balanced,
    Conservative,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlippageAnalysis {
    /// Model-expected slippage for this trade size, in percent.
    pub expected_slippage: f64,
    /// The tolerance actually in force (adjusted by the tolerance model).
    pub current_slippage: f64,
    pub risk: RiskLevel,
    /// Tier-scaled tolerance the engine recommends, in percent.
    pub recommended_slippage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceImpactAnalysis {
    /// Trade size as a share of pool liquidity, in percent.
    pub impact: f64,
    /// Impact normalized by trade amount (aggregator-API convention).
    pub percentage: f64,
    pub risk: RiskLevel,
    /// Largest amount (base units) the engine is comfortable executing at once.
    pub recommended_amount: U256,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GasAnalysis {
    pub optimal_gas_price_gwei: f64,
    /// Estimated execution cost in native-token units.
    pub estimated_cost_native: f64,
    pub strategy: GasStrategy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketConditionsAnalysis {
    pub liquidity_score: f64,
    pub volatility_index: f64,
    /// Modeled depth of available liquidity, in quote-currency units.
    pub depth: f64,
    pub spread_percent: f64,
    pub volume_trend: MarketTrend,
    pub condition: MarketCondition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitRecommendation {
    pub parts: u32,
    /// Size of each tranche in base units (last tranche absorbs the remainder).
    pub amount_per_part: U256,
    pub delay_between_parts_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterRecommendations {
    pub slippage: f64,
    pub amount: U256,
    pub gas_price_gwei: f64,
    pub deadline_secs: u64,
    pub split: Option<SplitRecommendation>,
}

/// One triggered risk dimension with its mitigation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    pub name: String,
    /// Expected damage if the risk materializes, in [0, 1].
    pub impact: f64,
    pub probability: f64,
    pub severity: RiskLevel,
    pub mitigation: String,
}

impl RiskFactor {
    /// Contribution to the weighted risk score.
    pub fn weighted(&self) -> f64 {
        self.impact * self.probability * self.severity.severity_weight()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Σ impact × probability × severity weight over triggered factors,
    /// clamped to [0, 1].
    pub score: f64,
    pub level: RiskLevel,
    pub factors: Vec<RiskFactor>,
}

impl RiskAssessment {
    pub fn level_for_score(score: f64) -> RiskLevel {
        if score >= 0.8 {
            RiskLevel::Critical
        } else if score >= 0.5 {
            RiskLevel::High
        } else if score >= 0.2 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    /// The factor contributing the most to the score, if any triggered.
    pub fn dominant_factor(&self) -> Option<&RiskFactor> {
        self.factors
            .iter()
            .max_by(|a, b| a.weighted().total_cmp(&b.weighted()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOptimization {
    pub strategy: ExecutionStrategy,
    pub confidence: f64,
    pub reasoning: Vec<String>,
}

/// Full output of one `simulate` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskReport {
    pub slippage: SlippageAnalysis,
    pub price_impact: PriceImpactAnalysis,
    pub gas: GasAnalysis,
    pub market: MarketConditionsAnalysis,
    pub recommendations: ParameterRecommendations,
    pub assessment: RiskAssessment,
    pub optimization: ExecutionOptimization,
}
