//! Configuration management
//! Load engine settings from .env / environment variables

use crate::bundle::BundleConfig;
use crate::slippage::ToleranceConfig;
use anyhow::{Context, Result};
use std::time::Duration;

/// Everything the engine needs to wire its gateways and models.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    // Aggregator API
    pub aggregator_url: String,
    pub aggregator_api_key: Option<String>,

    // Market data provider; None selects the deterministic synthetic source
    pub market_url: Option<String>,

    // Private relay
    pub relay_url: String,
    pub relay_session_key: Option<String>,

    // Per-call gateway timeouts
    pub quote_timeout: Duration,
    pub market_timeout: Duration,
    pub relay_timeout: Duration,

    pub tolerance: ToleranceConfig,
    pub bundle: BundleConfig,
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_or_f64(key: &str, default: f64) -> Result<f64> {
    match env_opt(key) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("{key} is not a number: {raw}")),
        None => Ok(default),
    }
}

fn env_or_u64(key: &str, default: u64) -> Result<u64> {
    match env_opt(key) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("{key} is not an integer: {raw}")),
        None => Ok(default),
    }
}

fn env_or_bool(key: &str, default: bool) -> bool {
    match env_opt(key).as_deref() {
        Some("1") | Some("true") | Some("yes") => true,
        Some("0") | Some("false") | Some("no") => false,
        _ => default,
    }
}

pub fn load_config() -> Result<EngineConfig> {
    dotenv::dotenv().ok();

    let defaults = ToleranceConfig::default();
    let tolerance = ToleranceConfig {
        default_tolerance: env_or_f64("SLIPPAGE_DEFAULT", defaults.default_tolerance)?,
        min_tolerance: env_or_f64("SLIPPAGE_MIN", defaults.min_tolerance)?,
        max_tolerance: env_or_f64("SLIPPAGE_MAX", defaults.max_tolerance)?,
        warning_threshold: env_or_f64("SLIPPAGE_WARNING", defaults.warning_threshold)?,
        critical_threshold: env_or_f64("SLIPPAGE_CRITICAL", defaults.critical_threshold)?,
        ..defaults
    };

    let bundle_defaults = BundleConfig::default();
    let bundle = BundleConfig {
        max_retries: env_or_u64("RELAY_MAX_RETRIES", bundle_defaults.max_retries as u64)? as u32,
        base_delay_ms: env_or_u64("RELAY_RETRY_BASE_DELAY_MS", bundle_defaults.base_delay_ms)?,
        max_delay_ms: env_or_u64("RELAY_RETRY_MAX_DELAY_MS", bundle_defaults.max_delay_ms)?,
        backoff_multiplier: env_or_f64(
            "RELAY_RETRY_BACKOFF_MULTIPLIER",
            bundle_defaults.backoff_multiplier,
        )?,
        fallback_enabled: env_or_bool("FALLBACK_ENABLED", bundle_defaults.fallback_enabled),
        fallback_gas_price_gwei: env_or_f64(
            "FALLBACK_GAS_PRICE_GWEI",
            bundle_defaults.fallback_gas_price_gwei,
        )?,
        fallback_slippage: env_or_f64("FALLBACK_SLIPPAGE", bundle_defaults.fallback_slippage)?,
        allow_degraded_simulation: env_or_bool(
            "ALLOW_DEGRADED_SIMULATION",
            bundle_defaults.allow_degraded_simulation,
        ),
        ..bundle_defaults
    };

    Ok(EngineConfig {
        aggregator_url: std::env::var("AGGREGATOR_URL").context("AGGREGATOR_URL not set")?,
        aggregator_api_key: env_opt("AGGREGATOR_API_KEY"),
        market_url: env_opt("MARKET_DATA_URL"),
        relay_url: env_opt("RELAY_URL").unwrap_or_else(|| "https://relay.flashbots.net".to_string()),
        relay_session_key: env_opt("RELAY_SESSION_KEY"),
        quote_timeout: Duration::from_secs(env_or_u64("QUOTE_TIMEOUT_SECS", 5)?),
        market_timeout: Duration::from_secs(env_or_u64("MARKET_TIMEOUT_SECS", 3)?),
        relay_timeout: Duration::from_secs(env_or_u64("RELAY_TIMEOUT_SECS", 15)?),
        tolerance,
        bundle,
    })
}
