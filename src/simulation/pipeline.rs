//! Simulation & Risk Pipeline
//!
//! Purpose:
//!     Turn a raw quote into a full risk report and an execution-strategy
//!     decision. Market signals are fetched concurrently and degrade to
//!     fallback constants inside the gateway; everything downstream is
//!     pure arithmetic over the snapshot, deterministic given inputs and
//!     the UTC hour.
//!
//! Author: AI-Generated
//! Created: 2026-08-03
//!
//! Notes:
//!     - Sub-analyses are independent; only the final aggregation step
//!       orders them.
//!     - No caching: every call re-derives the report from current inputs.

use crate::gateways::{GasSignals, MarketSignalGateway};
use crate::errors::EngineError;
use crate::simulation::types::*;
use crate::slippage::{compute_tolerance_at_hour, SlippageFactors, ToleranceConfig};
use crate::types::{u256_to_f64, MarketCondition, MarketTrend, Quote, RiskLevel, SwapRequest};
use alloy::primitives::U256;
use chrono::{Timelike, Utc};
use std::sync::Arc;
use tracing::{debug, info};

// ── Model constants ──────────────────────────────────────────────────────────

/// Quote-currency units of depth represented by a liquidity score of 1.0.
const DEPTH_SCALE: f64 = 100_000.0;

/// Global cap on model-expected slippage, in percent.
const MAX_EXPECTED_SLIPPAGE_PCT: f64 = 5.0;

/// Baseline bid/ask spread, widened with volatility.
const BASE_SPREAD_PCT: f64 = 0.1;

/// Base inter-tranche delay for split swaps; scaled by (1 + volatility).
const TRANCHE_DELAY_BASE_MS: u64 = 2_000;

/// Upper bound on tranche count regardless of price impact.
const MAX_SPLIT_PARTS: u32 = 10;

/// Fraction of pool liquidity the engine will move in one transaction,
/// by price-impact risk tier.
fn impact_cap_fraction(risk: RiskLevel) -> f64 {
    match risk {
        RiskLevel::Low => 0.10,
        RiskLevel::Medium => 0.05,
        RiskLevel::High => 0.02,
        RiskLevel::Critical => 0.01,
    }
}

// ── Snapshot ─────────────────────────────────────────────────────────────────

/// One consistent read of the market gateway, taken per simulate call.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketSnapshot {
    pub volatility: f64,
    pub liquidity: f64,
    pub gas: GasSignals,
    pub trend: MarketTrend,
}

impl MarketSnapshot {
    pub fn condition(&self) -> MarketCondition {
        if self.volatility >= 0.8 {
            MarketCondition::Extreme
        } else if self.volatility >= 0.5 {
            MarketCondition::Volatile
        } else {
            MarketCondition::Stable
        }
    }
}

// ── Pipeline ─────────────────────────────────────────────────────────────────

pub struct SimulationPipeline {
    market: Arc<dyn MarketSignalGateway>,
    tolerance: ToleranceConfig,
}

impl SimulationPipeline {
    pub fn new(market: Arc<dyn MarketSignalGateway>, tolerance: ToleranceConfig) -> Self {
        Self { market, tolerance }
    }

    pub fn tolerance_config(&self) -> &ToleranceConfig {
        &self.tolerance
    }

    /// Run the full pipeline for one request/quote pair.
    pub async fn simulate(
        &self,
        request: &SwapRequest,
        quote: &Quote,
    ) -> Result<RiskReport, EngineError> {
        if !quote.is_executable() {
            return Err(EngineError::validation(
                "quote",
                "quote is missing a non-zero toAmount",
            ));
        }

        let snapshot = self.snapshot(request).await;
        let report = self.analyze_at_hour(request, quote, &snapshot, Utc::now().hour());
        info!(
            "Risk report: score={:.2} level={} strategy={} confidence={:.2}",
            report.assessment.score,
            report.assessment.level,
            report.optimization.strategy,
            report.optimization.confidence
        );
        Ok(report)
    }

    /// Concurrent read of the four market signals.
    pub async fn snapshot(&self, request: &SwapRequest) -> MarketSnapshot {
        let (volatility, liquidity, gas, trend) = tokio::join!(
            self.market.volatility(request.from_token),
            self.market.liquidity(request.from_token),
            self.market.gas_signals(request.chain_id),
            self.market.market_trend(request.from_token),
        );
        MarketSnapshot {
            volatility,
            liquidity,
            gas,
            trend,
        }
    }

    /// Pure assembly of the report from a fixed snapshot and UTC hour.
    /// Identical inputs always produce an identical report.
    pub fn analyze_at_hour(
        &self,
        request: &SwapRequest,
        quote: &Quote,
        snapshot: &MarketSnapshot,
        utc_hour: u32,
    ) -> RiskReport {
        let trade_size = u256_to_f64(request.amount);
        let time_of_day = utc_hour as f64 / 24.0;
        let market = market_conditions_analysis(snapshot);

        let factors = SlippageFactors {
            volatility: snapshot.volatility,
            liquidity: snapshot.liquidity,
            time_of_day,
            trade_size,
            chain_id: request.chain_id,
            market_conditions: market.condition,
        };
        let base = request.slippage.unwrap_or(self.tolerance.default_tolerance);
        let tolerance =
            compute_tolerance_at_hour(base, &factors, &self.tolerance, utc_hour);

        let slippage = slippage_analysis(
            trade_size,
            market.depth,
            snapshot.volatility,
            time_of_day,
            tolerance.adjusted_tolerance,
        );
        let price_impact = price_impact_analysis(request.amount, trade_size, market.depth);
        let gas = gas_analysis(&snapshot.gas, quote.estimated_gas);

        let recommendations = recommend_parameters(
            request.amount,
            &slippage,
            &price_impact,
            &gas,
            &market,
        );
        let assessment = assess_risk(&slippage, &price_impact, &gas, snapshot.volatility);
        let optimization =
            decide_strategy(&assessment, &recommendations, market.volatility_index);

        debug!(
            "Analyses: slippage={} impact={} gas={:?} condition={}",
            slippage.risk, price_impact.risk, gas.strategy, market.condition
        );

        RiskReport {
            slippage,
            price_impact,
            gas,
            market,
            recommendations,
            assessment,
            optimization,
        }
    }
}

// ── Sub-analyses ─────────────────────────────────────────────────────────────

/// Expected slippage for this trade against modeled depth, and the tier of
/// the tolerance currently in force relative to it.
pub fn slippage_analysis(
    trade_size: f64,
    depth: f64,
    volatility: f64,
    time_of_day: f64,
    current_slippage: f64,
) -> SlippageAnalysis {
    let raw = (trade_size / depth.max(1.0))
        * (1.0 + volatility)
        * (1.0 + (time_of_day - 0.5) * 0.2);
    let expected_slippage = raw.min(MAX_EXPECTED_SLIPPAGE_PCT);

    let ratio = if expected_slippage > 0.0 {
        current_slippage / expected_slippage
    } else {
        f64::INFINITY
    };
    let risk = if ratio < 1.2 {
        RiskLevel::Low
    } else if ratio < 1.5 {
        RiskLevel::Medium
    } else if ratio < 2.0 {
        RiskLevel::High
    } else {
        RiskLevel::Critical
    };
    let tier_multiplier = match risk {
        RiskLevel::Low => 1.1,
        RiskLevel::Medium => 1.2,
        RiskLevel::High => 1.5,
        RiskLevel::Critical => 2.0,
    };

    SlippageAnalysis {
        expected_slippage,
        current_slippage,
        risk,
        recommended_slippage: expected_slippage * tier_multiplier,
    }
}

/// Price impact of the trade's own size against pool liquidity.
pub fn price_impact_analysis(
    amount: U256,
    trade_size: f64,
    pool_liquidity: f64,
) -> PriceImpactAnalysis {
    let impact = (trade_size / pool_liquidity.max(1.0)) * 100.0;
    let percentage = if trade_size > 0.0 {
        impact / trade_size * 100.0
    } else {
        0.0
    };
    let risk = if impact < 0.1 {
        RiskLevel::Low
    } else if impact < 0.5 {
        RiskLevel::Medium
    } else if impact < 1.0 {
        RiskLevel::High
    } else {
        RiskLevel::Critical
    };

    let cap = pool_liquidity * impact_cap_fraction(risk);
    let recommended_amount = if trade_size <= cap {
        amount
    } else {
        U256::from(cap.max(1.0) as u128)
    };

    PriceImpactAnalysis {
        impact,
        percentage,
        risk,
        recommended_amount,
    }
}

/// Optimal gas price for current congestion, and the bidding posture.
pub fn gas_analysis(signals: &GasSignals, estimated_gas: u64) -> GasAnalysis {
    let optimal_gas_price_gwei = (signals.base_fee_gwei + signals.priority_fee_gwei)
        * (1.0 + 0.5 * signals.congestion);
    let estimated_cost_native = estimated_gas as f64 * optimal_gas_price_gwei * 1e-9;
    let strategy = if signals.congestion < 0.3 {
        GasStrategy::Aggressive
    } else if signals.congestion < 0.7 {
        GasStrategy::Balanced
    } else {
        GasStrategy::Conservative
    };
    GasAnalysis {
        optimal_gas_price_gwei,
        estimated_cost_native,
        strategy,
    }
}

pub fn market_conditions_analysis(snapshot: &MarketSnapshot) -> MarketConditionsAnalysis {
    MarketConditionsAnalysis {
        liquidity_score: snapshot.liquidity,
        volatility_index: snapshot.volatility,
        depth: snapshot.liquidity * DEPTH_SCALE,
        spread_percent: BASE_SPREAD_PCT * (1.0 + snapshot.volatility),
        volume_trend: snapshot.trend,
        condition: snapshot.condition(),
    }
}

// ── Aggregation ──────────────────────────────────────────────────────────────

/// Equal tranches covering `amount`, the last one absorbing the integer
/// remainder at execution time.
pub fn build_split(
    amount: U256,
    recommended_amount: U256,
    volatility: f64,
) -> SplitRecommendation {
    let rec = recommended_amount.max(U256::from(1u64));
    let parts_u256 = (amount + rec - U256::from(1u64)) / rec;
    let parts = u32::try_from(parts_u256)
        .unwrap_or(MAX_SPLIT_PARTS)
        .clamp(2, MAX_SPLIT_PARTS);
    SplitRecommendation {
        parts,
        amount_per_part: amount / U256::from(parts),
        delay_between_parts_ms: (TRANCHE_DELAY_BASE_MS as f64 * (1.0 + volatility)) as u64,
    }
}

pub fn recommend_parameters(
    amount: U256,
    slippage: &SlippageAnalysis,
    price_impact: &PriceImpactAnalysis,
    gas: &GasAnalysis,
    market: &MarketConditionsAnalysis,
) -> ParameterRecommendations {
    let deadline_secs = match market.condition {
        MarketCondition::Stable => 300,
        MarketCondition::Volatile => 180,
        MarketCondition::Extreme => 60,
    };
    let split = if price_impact.risk >= RiskLevel::High
        && price_impact.recommended_amount < amount
    {
        Some(build_split(
            amount,
            price_impact.recommended_amount,
            market.volatility_index,
        ))
    } else {
        None
    };
    ParameterRecommendations {
        slippage: slippage.recommended_slippage,
        amount: price_impact.recommended_amount,
        gas_price_gwei: gas.optimal_gas_price_gwei,
        deadline_secs,
        split,
    }
}

/// Weighted aggregate of the triggered risk dimensions. Every factor
/// carries a mitigation string so rejections can explain themselves.
pub fn assess_risk(
    slippage: &SlippageAnalysis,
    price_impact: &PriceImpactAnalysis,
    gas: &GasAnalysis,
    volatility: f64,
) -> RiskAssessment {
    let mut factors = Vec::new();

    if slippage.risk >= RiskLevel::Medium {
        factors.push(RiskFactor {
            name: "slippage".to_string(),
            impact: 0.4,
            probability: 0.7,
            severity: slippage.risk,
            mitigation: "tighten the slippage tolerance or reduce the trade size".to_string(),
        });
    }
    if price_impact.risk >= RiskLevel::Medium {
        factors.push(RiskFactor {
            name: "price_impact".to_string(),
            impact: 0.5,
            probability: 0.8,
            severity: price_impact.risk,
            mitigation: "split the trade into smaller tranches".to_string(),
        });
    }
    if gas.strategy == GasStrategy::Conservative {
        factors.push(RiskFactor {
            name: "network_congestion".to_string(),
            impact: 0.3,
            probability: 0.6,
            severity: RiskLevel::High,
            mitigation: "defer execution until congestion subsides".to_string(),
        });
    }
    if volatility > 0.5 {
        factors.push(RiskFactor {
            name: "volatility".to_string(),
            impact: 0.35,
            probability: 0.65,
            severity: if volatility > 0.8 {
                RiskLevel::Critical
            } else {
                RiskLevel::High
            },
            mitigation: "widen the tolerance or defer until the market calms".to_string(),
        });
    }

    let score: f64 = factors.iter().map(RiskFactor::weighted).sum::<f64>().min(1.0);
    RiskAssessment {
        score,
        level: RiskAssessment::level_for_score(score),
        factors,
    }
}

/// The final call: CANCEL beats SPLIT beats WAIT beats IMMEDIATE.
pub fn decide_strategy(
    assessment: &RiskAssessment,
    recommendations: &ParameterRecommendations,
    volatility_index: f64,
) -> ExecutionOptimization {
    let mut reasoning = Vec::new();

    let strategy = if assessment.level == RiskLevel::Critical {
        match assessment.dominant_factor() {
            Some(factor) => reasoning.push(format!(
                "critical risk driven by {}; {}",
                factor.name, factor.mitigation
            )),
            None => reasoning.push("aggregate risk score is critical".to_string()),
        }
        ExecutionStrategy::Cancel
    } else if let Some(split) = &recommendations.split {
        reasoning.push(format!(
            "price impact too large for one transaction; splitting into {} tranches",
            split.parts
        ));
        ExecutionStrategy::Split
    } else if assessment.level == RiskLevel::High {
        reasoning.push("aggregate risk is high; deferring execution".to_string());
        ExecutionStrategy::Wait
    } else {
        reasoning.push("risk within limits; executing immediately".to_string());
        ExecutionStrategy::Immediate
    };

    let mut confidence = 0.8
        + match assessment.level {
            RiskLevel::Low => 0.1,
            RiskLevel::Medium => -0.1,
            RiskLevel::High => -0.2,
            RiskLevel::Critical => -0.4,
        };
    if volatility_index < 0.3 {
        confidence += 0.05;
    } else if volatility_index > 0.7 {
        confidence -= 0.1;
    }

    ExecutionOptimization {
        strategy,
        confidence: confidence.clamp(0.0, 1.0),
        reasoning,
    }
}
