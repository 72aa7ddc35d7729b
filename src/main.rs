//! Swap execution engine CLI
//!
//! One-shot entry point: quote a swap, print the risk report, and
//! optionally execute it (public path or MEV-protected, per flags).
//! The HTTP controllers consuming this engine live elsewhere; this binary
//! exists for operations and manual inspection.
//!
//! Author: AI-Generated
//! Created: 2026-08-03

use alloy::primitives::{Address, Bytes, U256};
use anyhow::{Context, Result};
use clap::Parser;
use std::str::FromStr;
use std::sync::Arc;
use swapshield::bundle::{BundleExecution, BundleOrchestrator, FallbackContext};
use swapshield::config::load_config;
use swapshield::execution::ExecutionOrchestrator;
use swapshield::gateways::{
    HttpMarketGateway, HttpQuoteGateway, HttpRelayGateway, HttpSubmissionGateway,
    MarketSignalGateway, QuoteGateway, SyntheticMarketGateway,
};
use swapshield::simulation::SimulationPipeline;
use swapshield::store::{InMemoryBundleStore, InMemorySwapStore};
use swapshield::types::SwapRequest;
use tracing::{info, warn, Level};

/// Swap Risk-Analysis & MEV-Protected Execution Engine
#[derive(Parser)]
#[command(name = "swapshield")]
struct Args {
    /// Chain to trade on
    #[arg(long, env = "CHAIN_ID", default_value_t = 1)]
    chain_id: u64,

    /// Token to sell (address)
    #[arg(long)]
    from_token: String,

    /// Token to buy (address)
    #[arg(long)]
    to_token: String,

    /// Amount to sell, in base token units
    #[arg(long)]
    amount: String,

    /// Trading wallet address
    #[arg(long, env = "USER_ADDRESS")]
    user: String,

    /// Execute the swap instead of only printing the risk report
    #[arg(long, default_value_t = false)]
    execute: bool,

    /// Signed transaction blobs (0x-hex, repeatable). When present the
    /// swap is wrapped in a private relay bundle instead of the public
    /// path; the public path remains the fallback.
    #[arg(long = "bundle-tx")]
    bundle_txs: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    let args = Args::parse();
    let config = load_config()?;
    info!("Swapshield starting: chain_id: {}", args.chain_id);
    info!("Aggregator: {}", config.aggregator_url);
    info!(
        "Relay: {} (session: {})",
        config.relay_url,
        config.relay_session_key.is_some()
    );

    let request = SwapRequest::new(
        Address::from_str(&args.from_token).context("invalid --from-token address")?,
        Address::from_str(&args.to_token).context("invalid --to-token address")?,
        U256::from_str(&args.amount).context("invalid --amount")?,
        args.chain_id,
        Address::from_str(&args.user).context("invalid --user address")?,
    );
    request.validate()?;

    let quotes: Arc<dyn QuoteGateway> = Arc::new(HttpQuoteGateway::new(
        config.aggregator_url.clone(),
        config.aggregator_api_key.clone(),
        config.quote_timeout,
    ));
    let market: Arc<dyn MarketSignalGateway> = match &config.market_url {
        Some(url) => Arc::new(HttpMarketGateway::new(url.clone(), config.market_timeout)),
        None => {
            warn!("MARKET_DATA_URL not set, using deterministic synthetic market signals");
            Arc::new(SyntheticMarketGateway)
        }
    };
    let submission = Arc::new(HttpSubmissionGateway::new(
        config.aggregator_url.clone(),
        config.aggregator_api_key.clone(),
        config.quote_timeout,
    ));

    if args.execute && !args.bundle_txs.is_empty() {
        // MEV-protected path: wrap the supplied signed transactions in a
        // relay bundle, with the public path as fallback.
        let transactions = args
            .bundle_txs
            .iter()
            .map(|raw| Bytes::from_str(raw).context("invalid --bundle-tx hex"))
            .collect::<Result<Vec<_>>>()?;
        let relay = Arc::new(HttpRelayGateway::new(
            config.relay_url.clone(),
            config.relay_session_key.clone(),
            config.relay_timeout,
        ));
        let orchestrator = BundleOrchestrator::new(
            relay,
            submission,
            Arc::new(InMemoryBundleStore::new()),
            Arc::new(InMemorySwapStore::new()),
            config.bundle.clone(),
        );
        let quote = quotes.get_quote(&request).await?;
        let user = request.user_address;
        let fallback = FallbackContext { request, quote };
        match orchestrator
            .create_bundle_with_retry(transactions, user, Some(fallback))
            .await?
        {
            BundleExecution::Private(bundle) => info!(
                "Bundle {} submitted: status={} target_block={} attempts={}",
                bundle.bundle_id, bundle.status, bundle.target_block, bundle.submission_attempts
            ),
            BundleExecution::PublicFallback(swap) => warn!(
                "Relay exhausted; fell back to public swap {} ({})",
                swap.swap_id,
                swap.fallback_reason.as_deref().unwrap_or("unknown trigger")
            ),
        }
        return Ok(());
    }

    if args.execute {
        let pipeline = SimulationPipeline::new(market, config.tolerance.clone());
        let store = Arc::new(InMemorySwapStore::new());
        let orchestrator = ExecutionOrchestrator::new(quotes, submission, pipeline, store);
        let record = orchestrator.execute_with_optimization(request).await?;
        info!(
            "Swap {} finished: status={} txs={:?} out={}",
            record.swap_id, record.status, record.tx_hashes, record.quote.to_amount
        );
        return Ok(());
    }

    // Analysis only: quote + risk report, nothing submitted.
    let quote = quotes.get_quote(&request).await?;
    let pipeline = SimulationPipeline::new(market, config.tolerance.clone());
    let report = pipeline.simulate(&request, &quote).await?;

    info!("── Risk report ──────────────────────────────────────");
    info!(
        "Slippage: expected={:.3}% current={:.3}% risk={} recommended={:.3}%",
        report.slippage.expected_slippage,
        report.slippage.current_slippage,
        report.slippage.risk,
        report.slippage.recommended_slippage
    );
    info!(
        "Price impact: {:.4}% risk={} recommended_amount={}",
        report.price_impact.impact, report.price_impact.risk, report.price_impact.recommended_amount
    );
    info!(
        "Gas: optimal={:.1} gwei strategy={:?} est_cost={:.6}",
        report.gas.optimal_gas_price_gwei, report.gas.strategy, report.gas.estimated_cost_native
    );
    info!(
        "Market: condition={} trend={} volatility={:.2} liquidity={:.2}",
        report.market.condition,
        report.market.volume_trend,
        report.market.volatility_index,
        report.market.liquidity_score
    );
    info!(
        "Assessment: score={:.2} level={} factors={}",
        report.assessment.score,
        report.assessment.level,
        report.assessment.factors.len()
    );
    for factor in &report.assessment.factors {
        info!("  - {} ({}): {}", factor.name, factor.severity, factor.mitigation);
    }
    info!(
        "Strategy: {} (confidence {:.2}): {}",
        report.optimization.strategy,
        report.optimization.confidence,
        report.optimization.reasoning.join("; ")
    );
    if let Some(split) = &report.recommendations.split {
        info!(
            "Split plan: {} tranches of {} every {}ms",
            split.parts, split.amount_per_part, split.delay_between_parts_ms
        );
    }

    Ok(())
}
