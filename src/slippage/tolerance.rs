//! Multi-Factor Slippage Tolerance Model
//!
//! Purpose:
//!     Convert a base slippage tolerance plus observed market factors into an
//!     adjusted tolerance, a risk tier, and user-facing warnings. Pure
//!     arithmetic: no I/O, deterministic given inputs and the UTC hour.
//!
//! Author: AI-Generated
//! Created: 2026-08-03
//!
//! Design:
//!     - Independently toggleable multiplicative adjustments, applied in a
//!       fixed order: volatility → liquidity → time-of-day → trade size → chain
//!     - Result clamped to [min_tolerance, max_tolerance]
//!     - Risk tier from the clamped value against warning/critical thresholds
//!     - Warnings emitted for every visible adjustment and on entering
//!       HIGH/CRITICAL territory

use crate::types::{MarketCondition, RiskLevel};
use chrono::{Timelike, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};

/// UTC hours treated as peak trading windows (9–11 and 14–16 inclusive).
const PEAK_HOURS: &[u32] = &[9, 10, 11, 14, 15, 16];

/// Per-chain default multipliers. Unknown chains fall back to 1.0.
static DEFAULT_CHAIN_MULTIPLIERS: Lazy<HashMap<u64, f64>> = Lazy::new(|| {
    HashMap::from([
        (1, 1.0),      // Ethereum
        (10, 1.1),     // Optimism
        (56, 1.15),    // BNB Chain
        (137, 1.2),    // Polygon
        (324, 1.1),    // zkSync Era
        (8453, 1.1),   // Base
        (42161, 1.1),  // Arbitrum
        (43114, 1.2),  // Avalanche
    ])
});

/// Market factors observed at quote time. All ratios are in [0, 1];
/// `trade_size` is in quote-currency units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlippageFactors {
    pub volatility: f64,
    pub liquidity: f64,
    /// Fraction of the UTC day elapsed (hour / 24).
    pub time_of_day: f64,
    pub trade_size: f64,
    pub chain_id: u64,
    pub market_conditions: MarketCondition,
}

/// Output of the tolerance model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToleranceResult {
    /// Echo of the unmodified input tolerance.
    pub recommended_tolerance: f64,
    /// Post-multiplier tolerance, clamped to the configured bounds.
    pub adjusted_tolerance: f64,
    pub risk_level: RiskLevel,
    pub warnings: Vec<String>,
    /// False when the raw (pre-clamp) adjustment fell outside the bounds.
    pub is_within_limits: bool,
}

#[derive(Debug, Clone)]
pub struct ToleranceValidation {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

/// Tolerance-model configuration. All tolerance/threshold values are
/// percentages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToleranceConfig {
    pub default_tolerance: f64,
    pub min_tolerance: f64,
    pub max_tolerance: f64,
    /// Tier boundary: adjusted ≤ warning_threshold → LOW.
    pub warning_threshold: f64,
    /// Tier boundary: adjusted ≤ critical_threshold → MEDIUM.
    pub critical_threshold: f64,

    pub adjust_for_volatility: bool,
    pub adjust_for_liquidity: bool,
    pub adjust_for_time_of_day: bool,
    pub adjust_for_trade_size: bool,
    pub adjust_for_chain: bool,

    pub high_volatility_multiplier: f64,
    pub low_liquidity_multiplier: f64,
    pub peak_hours_multiplier: f64,
    pub off_peak_multiplier: f64,
    /// Trade size (quote units) above which the large-trade multiplier kicks in.
    pub large_trade_threshold: f64,
    pub large_trade_multiplier: f64,
    pub chain_multipliers: HashMap<u64, f64>,
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self {
            default_tolerance: 0.5,
            min_tolerance: 0.1,
            max_tolerance: 5.0,
            warning_threshold: 0.8,
            critical_threshold: 2.0,
            adjust_for_volatility: true,
            adjust_for_liquidity: true,
            adjust_for_time_of_day: true,
            adjust_for_trade_size: true,
            adjust_for_chain: true,
            high_volatility_multiplier: 1.5,
            low_liquidity_multiplier: 1.4,
            peak_hours_multiplier: 1.15,
            off_peak_multiplier: 0.95,
            large_trade_threshold: 10_000.0,
            large_trade_multiplier: 1.3,
            chain_multipliers: DEFAULT_CHAIN_MULTIPLIERS.clone(),
        }
    }
}

/// Partial configuration update. Unset fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToleranceConfigUpdate {
    pub default_tolerance: Option<f64>,
    pub min_tolerance: Option<f64>,
    pub max_tolerance: Option<f64>,
    pub warning_threshold: Option<f64>,
    pub critical_threshold: Option<f64>,
    pub high_volatility_multiplier: Option<f64>,
    pub low_liquidity_multiplier: Option<f64>,
    pub peak_hours_multiplier: Option<f64>,
    pub off_peak_multiplier: Option<f64>,
    pub large_trade_threshold: Option<f64>,
    pub large_trade_multiplier: Option<f64>,
}

impl ToleranceConfig {
    pub fn risk_level_for(&self, tolerance: f64) -> RiskLevel {
        if tolerance <= self.warning_threshold {
            RiskLevel::Low
        } else if tolerance <= self.critical_threshold {
            RiskLevel::Medium
        } else if tolerance <= self.max_tolerance {
            RiskLevel::High
        } else {
            RiskLevel::Critical
        }
    }

    pub fn chain_multiplier(&self, chain_id: u64) -> f64 {
        self.chain_multipliers.get(&chain_id).copied().unwrap_or(1.0)
    }

    /// Apply a partial update. The merged candidate is re-validated as a
    /// whole: field-level bounds (0–100) and cross-field orderings
    /// (min ≤ default ≤ max, warning ≤ critical). An invalid update is
    /// rejected in full, leaving the current configuration intact.
    pub fn apply_update(&mut self, update: ToleranceConfigUpdate) -> Result<(), Vec<String>> {
        let mut candidate = self.clone();
        if let Some(v) = update.default_tolerance {
            candidate.default_tolerance = v;
        }
        if let Some(v) = update.min_tolerance {
            candidate.min_tolerance = v;
        }
        if let Some(v) = update.max_tolerance {
            candidate.max_tolerance = v;
        }
        if let Some(v) = update.warning_threshold {
            candidate.warning_threshold = v;
        }
        if let Some(v) = update.critical_threshold {
            candidate.critical_threshold = v;
        }
        if let Some(v) = update.high_volatility_multiplier {
            candidate.high_volatility_multiplier = v;
        }
        if let Some(v) = update.low_liquidity_multiplier {
            candidate.low_liquidity_multiplier = v;
        }
        if let Some(v) = update.peak_hours_multiplier {
            candidate.peak_hours_multiplier = v;
        }
        if let Some(v) = update.off_peak_multiplier {
            candidate.off_peak_multiplier = v;
        }
        if let Some(v) = update.large_trade_threshold {
            candidate.large_trade_threshold = v;
        }
        if let Some(v) = update.large_trade_multiplier {
            candidate.large_trade_multiplier = v;
        }

        let errors = candidate.validation_errors();
        if !errors.is_empty() {
            warn!("Tolerance config update rejected: {}", errors.join("; "));
            return Err(errors);
        }
        *self = candidate;
        info!(
            "Tolerance config updated: default={:.2}% bounds=[{:.2}%, {:.2}%]",
            self.default_tolerance, self.min_tolerance, self.max_tolerance
        );
        Ok(())
    }

    fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let percent_fields = [
            ("default_tolerance", self.default_tolerance),
            ("min_tolerance", self.min_tolerance),
            ("max_tolerance", self.max_tolerance),
            ("warning_threshold", self.warning_threshold),
            ("critical_threshold", self.critical_threshold),
        ];
        for (name, value) in percent_fields {
            if !(0.0..=100.0).contains(&value) {
                errors.push(format!("{name} {value} outside [0, 100]"));
            }
        }
        let multipliers = [
            ("high_volatility_multiplier", self.high_volatility_multiplier),
            ("low_liquidity_multiplier", self.low_liquidity_multiplier),
            ("peak_hours_multiplier", self.peak_hours_multiplier),
            ("off_peak_multiplier", self.off_peak_multiplier),
            ("large_trade_multiplier", self.large_trade_multiplier),
        ];
        for (name, value) in multipliers {
            if value <= 0.0 || !value.is_finite() {
                errors.push(format!("{name} {value} must be a positive number"));
            }
        }
        if self.large_trade_threshold <= 0.0 {
            errors.push(format!(
                "large_trade_threshold {} must be positive",
                self.large_trade_threshold
            ));
        }
        if self.min_tolerance > self.default_tolerance {
            errors.push("min_tolerance exceeds default_tolerance".to_string());
        }
        if self.default_tolerance > self.max_tolerance {
            errors.push("default_tolerance exceeds max_tolerance".to_string());
        }
        if self.warning_threshold > self.critical_threshold {
            errors.push("warning_threshold exceeds critical_threshold".to_string());
        }
        errors
    }
}

/// Compute the adjusted tolerance for the current UTC hour.
pub fn compute_tolerance(
    base: f64,
    factors: &SlippageFactors,
    config: &ToleranceConfig,
) -> ToleranceResult {
    compute_tolerance_at_hour(base, factors, config, Utc::now().hour())
}

/// Hour-injectable variant. Multipliers compose in a fixed order; the order
/// only matters for floating-point rounding.
pub fn compute_tolerance_at_hour(
    base: f64,
    factors: &SlippageFactors,
    config: &ToleranceConfig,
    utc_hour: u32,
) -> ToleranceResult {
    let mut warnings = Vec::new();
    let mut adjusted = base;

    if config.adjust_for_volatility {
        let m = volatility_multiplier(factors.volatility, config);
        adjusted *= m;
        if m > 1.0 {
            warnings.push(format!(
                "elevated volatility {:.2} raised tolerance x{:.2}",
                factors.volatility, m
            ));
        }
    }

    if config.adjust_for_liquidity {
        let m = liquidity_multiplier(factors.liquidity, config);
        adjusted *= m;
        if m > 1.0 {
            warnings.push(format!(
                "thin liquidity {:.2} raised tolerance x{:.2}",
                factors.liquidity, m
            ));
        }
    }

    if config.adjust_for_time_of_day {
        if PEAK_HOURS.contains(&utc_hour) {
            adjusted *= config.peak_hours_multiplier;
            warnings.push(format!(
                "peak trading hours (UTC {utc_hour}:00) adjustment applied"
            ));
        } else {
            adjusted *= config.off_peak_multiplier;
            warnings.push(format!(
                "off-peak hours (UTC {utc_hour}:00) adjustment applied"
            ));
        }
    }

    if config.adjust_for_trade_size {
        let m = trade_size_multiplier(factors.trade_size, config);
        adjusted *= m;
        if m > 1.0 {
            warnings.push(format!(
                "large trade size {:.0} raised tolerance x{:.2}",
                factors.trade_size, m
            ));
        }
    }

    if config.adjust_for_chain {
        adjusted *= config.chain_multiplier(factors.chain_id);
    }

    match factors.market_conditions {
        MarketCondition::Volatile => {
            warnings.push("volatile market conditions detected".to_string());
        }
        MarketCondition::Extreme => {
            warnings.push("extreme market conditions, consider deferring execution".to_string());
        }
        MarketCondition::Stable => {}
    }

    let is_within_limits =
        adjusted >= config.min_tolerance && adjusted <= config.max_tolerance;
    let clamped = adjusted.clamp(config.min_tolerance, config.max_tolerance);
    let risk_level = config.risk_level_for(clamped);

    match risk_level {
        RiskLevel::High => {
            warnings.push(format!(
                "adjusted tolerance {clamped:.2}% is in high-risk territory"
            ));
        }
        RiskLevel::Critical => {
            warnings.push(format!(
                "adjusted tolerance {clamped:.2}% exceeds the critical threshold"
            ));
        }
        _ => {}
    }

    ToleranceResult {
        recommended_tolerance: base,
        adjusted_tolerance: clamped,
        risk_level,
        warnings,
        is_within_limits,
    }
}

fn volatility_multiplier(volatility: f64, config: &ToleranceConfig) -> f64 {
    if volatility > 0.8 {
        config.high_volatility_multiplier
    } else if volatility > 0.5 {
        1.2
    } else if volatility > 0.2 {
        1.1
    } else {
        1.0
    }
}

fn liquidity_multiplier(liquidity: f64, config: &ToleranceConfig) -> f64 {
    if liquidity < 0.3 {
        config.low_liquidity_multiplier
    } else if liquidity < 0.6 {
        1.1
    } else {
        1.0
    }
}

fn trade_size_multiplier(trade_size: f64, config: &ToleranceConfig) -> f64 {
    if trade_size > config.large_trade_threshold {
        config.large_trade_multiplier
    } else if trade_size > config.large_trade_threshold / 2.0 {
        1.2
    } else {
        1.0
    }
}

/// Validate a user-supplied tolerance against the configured bounds.
pub fn validate_tolerance(value: f64, config: &ToleranceConfig) -> ToleranceValidation {
    let mut errors = Vec::new();
    if !value.is_finite() {
        errors.push(format!("tolerance {value} is not a finite number"));
    } else {
        if value < config.min_tolerance {
            errors.push(format!(
                "tolerance {value}% below minimum tolerance of {}%",
                config.min_tolerance
            ));
        }
        if value > config.max_tolerance {
            errors.push(format!(
                "tolerance {value}% exceeds maximum tolerance of {}%",
                config.max_tolerance
            ));
        }
    }
    ToleranceValidation {
        is_valid: errors.is_empty(),
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factors() -> SlippageFactors {
        SlippageFactors {
            volatility: 0.1,
            liquidity: 0.9,
            time_of_day: 0.5,
            trade_size: 100.0,
            chain_id: 1,
            market_conditions: MarketCondition::Stable,
        }
    }

    fn compute(base: f64, factors: &SlippageFactors) -> ToleranceResult {
        // Fixed off-peak hour keeps these tests independent of wall clock.
        compute_tolerance_at_hour(base, factors, &ToleranceConfig::default(), 3)
    }

    #[test]
    fn test_adjusted_tolerance_always_clamped() {
        let config = ToleranceConfig::default();
        let mut f = factors();
        f.volatility = 1.0;
        f.liquidity = 0.0;
        f.trade_size = 1_000_000.0;
        f.chain_id = 137;
        for base in [0.0, 0.0001, 0.5, 5.0, 50.0, 1000.0] {
            let result = compute(base, &f);
            assert!(result.adjusted_tolerance >= config.min_tolerance);
            assert!(result.adjusted_tolerance <= config.max_tolerance);
        }
    }

    #[test]
    fn test_volatility_monotonic() {
        let mut previous = 0.0;
        for vol in [0.0, 0.1, 0.21, 0.35, 0.51, 0.7, 0.81, 0.95] {
            let mut f = factors();
            f.volatility = vol;
            let result = compute(0.5, &f);
            assert!(
                result.adjusted_tolerance >= previous,
                "tolerance decreased at volatility {vol}"
            );
            previous = result.adjusted_tolerance;
        }
    }

    #[test]
    fn test_trade_size_monotonic_past_threshold() {
        let mut previous = 0.0;
        for size in [1_000.0, 5_001.0, 10_001.0, 50_000.0, 500_000.0] {
            let mut f = factors();
            f.trade_size = size;
            let result = compute(0.5, &f);
            assert!(result.adjusted_tolerance >= previous);
            previous = result.adjusted_tolerance;
        }
    }

    #[test]
    fn test_volatile_large_trade_scenario() {
        // base=0.5, volatility=0.8, liquidity=0.3, VOLATILE, trade=15000, Arbitrum
        let f = SlippageFactors {
            volatility: 0.8,
            liquidity: 0.3,
            time_of_day: 10.0 / 24.0,
            trade_size: 15_000.0,
            chain_id: 42161,
            market_conditions: MarketCondition::Volatile,
        };
        for hour in [3, 10] {
            let result =
                compute_tolerance_at_hour(0.5, &f, &ToleranceConfig::default(), hour);
            assert!(result.adjusted_tolerance > 0.5, "hour {hour}");
            assert!(result.risk_level >= RiskLevel::Medium, "hour {hour}");
            assert!(
                result.warnings.iter().any(|w| w.contains("volatil")),
                "missing volatility warning at hour {hour}: {:?}",
                result.warnings
            );
        }
    }

    #[test]
    fn test_peak_hour_raises_over_off_peak() {
        let f = factors();
        let config = ToleranceConfig::default();
        let peak = compute_tolerance_at_hour(0.5, &f, &config, 10);
        let off_peak = compute_tolerance_at_hour(0.5, &f, &config, 3);
        assert!(peak.adjusted_tolerance > off_peak.adjusted_tolerance);
        assert!(peak.warnings.iter().any(|w| w.contains("peak trading hours")));
        assert!(off_peak.warnings.iter().any(|w| w.contains("off-peak")));
    }

    #[test]
    fn test_unknown_chain_multiplier_is_neutral() {
        let config = ToleranceConfig::default();
        assert_eq!(config.chain_multiplier(999_999), 1.0);
    }

    #[test]
    fn test_recommended_tolerance_echoes_input() {
        let result = compute(0.73, &factors());
        assert_eq!(result.recommended_tolerance, 0.73);
    }

    #[test]
    fn test_validate_below_minimum() {
        let mut config = ToleranceConfig::default();
        config.min_tolerance = 0.1;
        let validation = validate_tolerance(0.05, &config);
        assert!(!validation.is_valid);
        assert!(validation.errors[0].contains("minimum"));
    }

    #[test]
    fn test_validate_in_range() {
        let validation = validate_tolerance(0.5, &ToleranceConfig::default());
        assert!(validation.is_valid);
        assert!(validation.errors.is_empty());
    }

    #[test]
    fn test_config_update_applies_valid_fields() {
        let mut config = ToleranceConfig::default();
        let update = ToleranceConfigUpdate {
            default_tolerance: Some(1.0),
            warning_threshold: Some(1.2),
            ..Default::default()
        };
        assert!(config.apply_update(update).is_ok());
        assert_eq!(config.default_tolerance, 1.0);
        assert_eq!(config.warning_threshold, 1.2);
    }

    #[test]
    fn test_config_update_rejected_in_full() {
        let mut config = ToleranceConfig::default();
        let before = config.clone();
        // default_tolerance alone is fine, but min > default violates ordering
        let update = ToleranceConfigUpdate {
            default_tolerance: Some(1.0),
            min_tolerance: Some(2.0),
            ..Default::default()
        };
        assert!(config.apply_update(update).is_err());
        assert_eq!(config.default_tolerance, before.default_tolerance);
        assert_eq!(config.min_tolerance, before.min_tolerance);
    }

    #[test]
    fn test_config_update_rejects_out_of_range_field() {
        let mut config = ToleranceConfig::default();
        let update = ToleranceConfigUpdate {
            max_tolerance: Some(150.0),
            ..Default::default()
        };
        let errors = config.apply_update(update).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("max_tolerance")));
        assert_eq!(config.max_tolerance, 5.0);
    }

    #[test]
    fn test_disabled_adjustments_leave_base_untouched() {
        let mut config = ToleranceConfig::default();
        config.adjust_for_volatility = false;
        config.adjust_for_liquidity = false;
        config.adjust_for_time_of_day = false;
        config.adjust_for_trade_size = false;
        config.adjust_for_chain = false;
        let mut f = factors();
        f.volatility = 1.0;
        f.liquidity = 0.0;
        let result = compute_tolerance_at_hour(0.5, &f, &config, 10);
        assert_eq!(result.adjusted_tolerance, 0.5);
    }
}
