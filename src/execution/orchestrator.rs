//! Execution Orchestrator
//!
//! Purpose:
//!     Drive one swap from request to terminal record: quote, risk
//!     analysis, parameter tuning, then dispatch per the decided strategy
//!     (immediate, split, deferred, or risk-rejected). Split tranches run
//!     strictly sequentially with intentional delays so the trade's shape
//!     is not visible as a burst.
//!
//! Author: AI-Generated
//! Created: 2026-08-03

use crate::errors::EngineError;
use crate::gateways::{QuoteGateway, SwapSubmissionGateway};
use crate::simulation::{ExecutionStrategy, RiskReport, SimulationPipeline};
use crate::store::SwapStore;
use crate::types::{Quote, SwapRecord, SwapRequest, SwapStatus};
use alloy::primitives::U256;
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub struct ExecutionOrchestrator {
    quotes: Arc<dyn QuoteGateway>,
    submission: Arc<dyn SwapSubmissionGateway>,
    pipeline: SimulationPipeline,
    store: Arc<dyn SwapStore>,
}

impl ExecutionOrchestrator {
    pub fn new(
        quotes: Arc<dyn QuoteGateway>,
        submission: Arc<dyn SwapSubmissionGateway>,
        pipeline: SimulationPipeline,
        store: Arc<dyn SwapStore>,
    ) -> Self {
        Self {
            quotes,
            submission,
            pipeline,
            store,
        }
    }

    /// Full flow: quote → risk analysis → strategy dispatch.
    pub async fn execute_with_optimization(
        &self,
        request: SwapRequest,
    ) -> Result<SwapRecord, EngineError> {
        request.validate()?;
        let quote = self.quotes.get_quote(&request).await?;
        let report = self.pipeline.simulate(&request, &quote).await?;
        self.dispatch(request, quote, &report).await
    }

    /// Strategy dispatch against an already-computed report.
    pub async fn dispatch(
        &self,
        request: SwapRequest,
        quote: Quote,
        report: &RiskReport,
    ) -> Result<SwapRecord, EngineError> {
        let mut tuned = request;
        tuned.slippage = Some(report.recommendations.slippage);
        tuned.gas_price_gwei = Some(report.recommendations.gas_price_gwei);
        let deadline = tuned.deadline.unwrap_or_else(|| {
            Utc::now() + ChronoDuration::seconds(report.recommendations.deadline_secs as i64)
        });

        match report.optimization.strategy {
            ExecutionStrategy::Wait => {
                info!("Execution deferred: {}", report.optimization.reasoning.join("; "));
                Err(EngineError::Deferred(
                    report.optimization.reasoning.join("; "),
                ))
            }
            ExecutionStrategy::Cancel => {
                // Keep an auditable CANCELLED record, then surface the
                // user-actionable rejection.
                let mut record = SwapRecord::new(tuned, quote, deadline);
                record.set_status(SwapStatus::Cancelled);
                self.store.put(record);
                let (reason, mitigation) = match report.assessment.dominant_factor() {
                    Some(factor) => (factor.name.clone(), factor.mitigation.clone()),
                    None => (
                        "aggregate risk".to_string(),
                        "retry when market conditions improve".to_string(),
                    ),
                };
                Err(EngineError::RiskRejection { reason, mitigation })
            }
            ExecutionStrategy::Split => self.execute_split(tuned, quote, report).await,
            ExecutionStrategy::Immediate => self.submit_single(tuned, quote, deadline).await,
        }
    }

    async fn submit_single(
        &self,
        request: SwapRequest,
        quote: Quote,
        deadline: chrono::DateTime<Utc>,
    ) -> Result<SwapRecord, EngineError> {
        let mut record = SwapRecord::new(request, quote, deadline);
        match self
            .submission
            .submit_swap(&record.request, &record.quote)
            .await
        {
            Ok(tx_hash) => {
                record.tx_hashes.push(tx_hash);
                record.set_status(SwapStatus::Confirmed);
                info!("Swap {} confirmed", record.swap_id);
                self.store.put(record.clone());
                Ok(record)
            }
            Err(e) => {
                record.set_status(SwapStatus::Failed);
                self.store.put(record);
                Err(e)
            }
        }
    }

    /// Sequential tranche execution. Successful tranches combine into one
    /// synthetic record whose to_amount is the sum of tranche outputs.
    async fn execute_split(
        &self,
        request: SwapRequest,
        original_quote: Quote,
        report: &RiskReport,
    ) -> Result<SwapRecord, EngineError> {
        let split = match &report.recommendations.split {
            Some(s) => s.clone(),
            // Decision said SPLIT but no plan survived; fall through to a
            // single submission rather than dropping the trade.
            None => {
                let deadline = Utc::now()
                    + ChronoDuration::seconds(report.recommendations.deadline_secs as i64);
                return self.submit_single(request, original_quote, deadline).await;
            }
        };

        info!(
            "Splitting {} into {} tranches of {} ({}ms apart)",
            request.amount, split.parts, split.amount_per_part, split.delay_between_parts_ms
        );

        let mut tx_hashes = Vec::new();
        let mut combined_out = U256::ZERO;
        let mut combined_gas = 0u64;
        let mut last_error: Option<EngineError> = None;

        for part in 0..split.parts {
            let mut tranche = request.clone();
            tranche.amount = if part == split.parts - 1 {
                // Last tranche absorbs the integer remainder.
                request.amount - split.amount_per_part * U256::from(split.parts - 1)
            } else {
                split.amount_per_part
            };

            let outcome = async {
                let quote = self.quotes.get_quote(&tranche).await?;
                let tx_hash = self.submission.submit_swap(&tranche, &quote).await?;
                Ok::<_, EngineError>((quote, tx_hash))
            }
            .await;

            match outcome {
                Ok((quote, tx_hash)) => {
                    combined_out += quote.to_amount;
                    combined_gas += quote.estimated_gas;
                    tx_hashes.push(tx_hash);
                    info!("Tranche {}/{} submitted", part + 1, split.parts);
                }
                Err(e) => {
                    warn!("Tranche {}/{} failed: {e}", part + 1, split.parts);
                    last_error = Some(e);
                }
            }

            if part + 1 < split.parts {
                tokio::time::sleep(Duration::from_millis(split.delay_between_parts_ms)).await;
            }
        }

        let deadline =
            Utc::now() + ChronoDuration::seconds(report.recommendations.deadline_secs as i64);

        if tx_hashes.is_empty() {
            let mut record = SwapRecord::new(request, original_quote, deadline);
            record.set_status(SwapStatus::Failed);
            self.store.put(record);
            return Err(EngineError::Submission(format!(
                "all {} tranches failed; last error: {}",
                split.parts,
                last_error.map(|e| e.to_string()).unwrap_or_default()
            )));
        }

        if (tx_hashes.len() as u32) < split.parts {
            warn!(
                "Split swap partially filled: {}/{} tranches landed",
                tx_hashes.len(),
                split.parts
            );
        }

        let synthetic_quote = Quote {
            to_amount: combined_out,
            estimated_gas: combined_gas,
            route: original_quote.route,
        };
        let mut record = SwapRecord::new(request, synthetic_quote, deadline);
        record.tx_hashes = tx_hashes;
        record.set_status(SwapStatus::Confirmed);
        self.store.put(record.clone());
        Ok(record)
    }

    /// Read a swap record, applying the lazy deadline-expiry transition.
    pub fn get_swap(&self, swap_id: &str) -> Option<SwapRecord> {
        let mut record = self.store.get(swap_id)?;
        if record.expire_if_past_deadline(Utc::now()) {
            warn!("Swap {} expired past its deadline", record.swap_id);
            self.store.put(record.clone());
        }
        Some(record)
    }

    pub fn swap_history(&self, owner: alloy::primitives::Address) -> Vec<SwapRecord> {
        self.store.list_by_owner(owner)
    }
}
