//! Bundle Orchestrator
//!
//! Purpose:
//!     Build → simulate → submit → retry-with-backoff → fallback for
//!     private relay bundles. One BundleRecord per orchestrated call;
//!     exhausted bundles optionally fall back to the public submission
//!     path with the triggering error recorded on the resulting swap.
//!
//! Author: AI-Generated
//! Created: 2026-08-03
//!
//! Notes:
//!     - A failed relay simulation aborts before submission and is never
//!       retried; only submission failures consume the retry budget.
//!     - retry_bundle mints a fresh record (RetryLink chain); the original
//!       terminal record is left frozen.

use crate::bundle::types::{
    backoff_delay, validate_bundle_transactions, BundleConfig, BundleRecord, BundleStatus,
    RetryLink,
};
use crate::errors::EngineError;
use crate::gateways::{BundleSimulation, RelayGateway, SwapSubmissionGateway};
use crate::store::{BundleStore, SwapStore};
use crate::types::{Quote, SwapRecord, SwapRequest, SwapStatus};
use alloy::primitives::{Address, Bytes};
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{info, warn};

/// Bundles older than this are never retried; the market has moved.
const RETRY_STALENESS_MINUTES: i64 = 30;

/// Fixed per-transaction gas estimate for degraded (no-session) simulation.
const DEGRADED_GAS_PER_TX: u64 = 150_000;

/// Outcome of an orchestrated bundle: either a private-relay record or the
/// public-path swap the engine fell back to.
#[derive(Debug, Clone)]
pub enum BundleExecution {
    Private(BundleRecord),
    PublicFallback(SwapRecord),
}

/// Swap context enabling the public fallback path (and its deadline).
#[derive(Debug, Clone)]
pub struct FallbackContext {
    pub request: SwapRequest,
    pub quote: Quote,
}

pub struct BundleOrchestrator {
    relay: Arc<dyn RelayGateway>,
    submission: Arc<dyn SwapSubmissionGateway>,
    bundles: Arc<dyn BundleStore>,
    swaps: Arc<dyn SwapStore>,
    config: BundleConfig,
}

impl BundleOrchestrator {
    pub fn new(
        relay: Arc<dyn RelayGateway>,
        submission: Arc<dyn SwapSubmissionGateway>,
        bundles: Arc<dyn BundleStore>,
        swaps: Arc<dyn SwapStore>,
        config: BundleConfig,
    ) -> Self {
        Self {
            relay,
            submission,
            bundles,
            swaps,
            config,
        }
    }

    /// Orchestrate one bundle end to end.
    pub async fn create_bundle_with_retry(
        &self,
        transactions: Vec<Bytes>,
        user_address: Address,
        fallback: Option<FallbackContext>,
    ) -> Result<BundleExecution, EngineError> {
        validate_bundle_transactions(&transactions)?;
        let head = self.relay.block_number().await?;
        let target_block = head + self.config.target_block_offset;
        let simulation = self.simulate(&transactions, target_block).await?;
        self.submit_new_record(
            transactions,
            user_address,
            target_block,
            simulation,
            None,
            fallback,
        )
        .await
    }

    /// Retry a terminal bundle as a fresh record linked to the original.
    pub async fn retry_bundle(
        &self,
        bundle_id: &str,
        target_block_override: Option<u64>,
    ) -> Result<BundleRecord, EngineError> {
        let original = self.bundles.get(bundle_id).ok_or_else(|| {
            EngineError::validation("bundle_id", format!("unknown bundle {bundle_id}"))
        })?;

        if !original.status.is_retryable() {
            return Err(EngineError::validation(
                "status",
                format!(
                    "bundle {bundle_id} has status {} and is not retryable",
                    original.status
                ),
            ));
        }
        let attempt_number = original
            .retry_link
            .as_ref()
            .map(|link| link.attempt_number)
            .unwrap_or(0)
            + 1;
        if attempt_number > self.config.max_retries {
            return Err(EngineError::validation(
                "retry",
                format!(
                    "bundle {bundle_id} already used its {} retries",
                    self.config.max_retries
                ),
            ));
        }
        if original.age(Utc::now()) > ChronoDuration::minutes(RETRY_STALENESS_MINUTES) {
            return Err(EngineError::validation(
                "retry",
                format!("bundle {bundle_id} is older than {RETRY_STALENESS_MINUTES} minutes"),
            ));
        }

        let target_block = target_block_override.unwrap_or(original.target_block + 1);
        let simulation = self.simulate(&original.transactions, target_block).await?;
        let link = RetryLink {
            original_bundle_id: original.bundle_id.clone(),
            attempt_number,
            max_retries: self.config.max_retries,
            last_error: original.last_error.clone().unwrap_or_default(),
        };
        info!(
            "Retrying bundle {bundle_id} as attempt {attempt_number} targeting block {target_block}"
        );
        match self
            .submit_new_record(
                original.transactions.clone(),
                original.owner,
                target_block,
                simulation,
                Some(link),
                None,
            )
            .await?
        {
            BundleExecution::Private(record) => Ok(record),
            // No fallback context is passed on retries.
            BundleExecution::PublicFallback(_) => unreachable!("retry path has no fallback"),
        }
    }

    /// Read a bundle record, lazily expiring SUBMITTED bundles whose target
    /// block has passed. A failed height read leaves the status unchanged.
    pub async fn get_bundle_status(&self, bundle_id: &str) -> Option<BundleRecord> {
        let mut record = self.bundles.get(bundle_id)?;
        if record.status == BundleStatus::Submitted {
            match self.relay.block_number().await {
                Ok(height) if height > record.target_block => {
                    if record.transition(BundleStatus::Expired).is_ok() {
                        warn!(
                            "Bundle {} expired: chain height {height} passed target block {}",
                            record.bundle_id, record.target_block
                        );
                        self.bundles.put(record.clone());
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("Chain height read failed; bundle status left unchanged: {e}");
                }
            }
        }
        Some(record)
    }

    pub fn bundle_history(&self, owner: Address) -> Vec<BundleRecord> {
        self.bundles.list_by_owner(owner)
    }

    async fn simulate(
        &self,
        transactions: &[Bytes],
        target_block: u64,
    ) -> Result<BundleSimulation, EngineError> {
        if self.relay.has_session() {
            return self.relay.simulate_bundle(transactions, target_block).await;
        }
        if self.config.allow_degraded_simulation {
            warn!("No relay session; using degraded fixed simulation estimates");
            return Ok(BundleSimulation {
                gas_used: DEGRADED_GAS_PER_TX * transactions.len() as u64,
                effective_gas_price_gwei: self.config.fallback_gas_price_gwei,
                profit_wei: 0,
            });
        }
        Err(EngineError::Relay(
            "no relay session configured and degraded simulation is disabled".to_string(),
        ))
    }

    /// The bounded submission state machine: at most max_retries + 1
    /// attempts, backoff between them, then fallback or RetryExhausted.
    async fn submit_new_record(
        &self,
        transactions: Vec<Bytes>,
        owner: Address,
        target_block: u64,
        simulation: BundleSimulation,
        retry_link: Option<RetryLink>,
        fallback: Option<FallbackContext>,
    ) -> Result<BundleExecution, EngineError> {
        let mut record = BundleRecord::new(owner, transactions, target_block);
        record.gas_estimate = simulation.gas_used;
        record.gas_price_gwei = simulation.effective_gas_price_gwei;
        record.refund = self.config.refund;
        record.retry_link = retry_link;
        let deadline = fallback.as_ref().and_then(|ctx| ctx.request.deadline);

        let total_attempts = self.config.max_retries + 1;
        let mut last_error = String::new();

        for attempt in 1..=total_attempts {
            record.submission_attempts = attempt;
            record.last_submission_attempt = Some(Utc::now());
            match self
                .relay
                .submit_bundle(
                    &record.transactions,
                    target_block,
                    self.config.refund.as_ref(),
                )
                .await
            {
                Ok(bundle_hash) => {
                    record.bundle_hash = Some(bundle_hash);
                    record.transition(BundleStatus::Submitted)?;
                    self.bundles.put(record.clone());
                    info!(
                        "Bundle {} submitted for block {target_block} (attempt {attempt}/{total_attempts})",
                        record.bundle_id
                    );
                    return Ok(BundleExecution::Private(record));
                }
                Err(e) => {
                    last_error = e.to_string();
                    warn!(
                        "Bundle submission attempt {attempt}/{total_attempts} failed: {last_error}"
                    );
                    if attempt < total_attempts {
                        let delay = backoff_delay(&self.config, attempt);
                        if let Some(d) = deadline {
                            let resume =
                                Utc::now() + ChronoDuration::milliseconds(delay.as_millis() as i64);
                            if resume > d {
                                record.last_error = Some(last_error.clone());
                                record.transition(BundleStatus::Failed)?;
                                self.bundles.put(record);
                                return Err(EngineError::TimeoutExpired {
                                    context: format!(
                                        "waiting {}ms to resubmit bundle after attempt {attempt}",
                                        delay.as_millis()
                                    ),
                                });
                            }
                        }
                        sleep(delay).await;
                    }
                }
            }
        }

        record.last_error = Some(last_error.clone());
        record.transition(BundleStatus::Failed)?;
        self.bundles.put(record.clone());

        if self.config.fallback_enabled {
            if let Some(ctx) = fallback {
                return self
                    .fallback_public(ctx, &record.bundle_id, &last_error)
                    .await
                    .map(BundleExecution::PublicFallback);
            }
        }
        Err(EngineError::RetryExhausted {
            attempts: total_attempts,
            last_error,
        })
    }

    /// Public (non-relay) fallback at the configured gas price and
    /// slippage. The resulting swap records why it exists.
    async fn fallback_public(
        &self,
        ctx: FallbackContext,
        bundle_id: &str,
        trigger: &str,
    ) -> Result<SwapRecord, EngineError> {
        warn!("Bundle {bundle_id} exhausted retries; falling back to public submission");
        let mut request = ctx.request;
        request.slippage = Some(self.config.fallback_slippage);
        request.gas_price_gwei = Some(self.config.fallback_gas_price_gwei);
        let deadline = request
            .deadline
            .unwrap_or_else(|| Utc::now() + ChronoDuration::seconds(300));

        let mut record = SwapRecord::new(request, ctx.quote, deadline);
        record.bundle_id = Some(bundle_id.to_string());
        record.fallback_used = true;
        record.fallback_reason = Some(trigger.to_string());

        match self
            .submission
            .submit_swap(&record.request, &record.quote)
            .await
        {
            Ok(tx_hash) => {
                record.tx_hashes.push(tx_hash);
                record.set_status(SwapStatus::Confirmed);
                self.swaps.put(record.clone());
                Ok(record)
            }
            Err(e) => {
                record.set_status(SwapStatus::Failed);
                self.swaps.put(record);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryBundleStore, InMemorySwapStore};
    use alloy::primitives::{B256, U256};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    struct MockRelay {
        session: bool,
        height: Result<u64, String>,
        simulate_ok: bool,
        submit_outcomes: Mutex<Vec<Result<B256, String>>>,
        submit_calls: AtomicU32,
        simulate_calls: AtomicU32,
    }

    impl MockRelay {
        fn new(height: u64, submit_outcomes: Vec<Result<B256, String>>) -> Self {
            Self {
                session: true,
                height: Ok(height),
                simulate_ok: true,
                submit_outcomes: Mutex::new(submit_outcomes),
                submit_calls: AtomicU32::new(0),
                simulate_calls: AtomicU32::new(0),
            }
        }

        fn submit_count(&self) -> u32 {
            self.submit_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RelayGateway for MockRelay {
        fn has_session(&self) -> bool {
            self.session
        }

        async fn simulate_bundle(
            &self,
            txs: &[Bytes],
            _target_block: u64,
        ) -> Result<BundleSimulation, EngineError> {
            self.simulate_calls.fetch_add(1, Ordering::SeqCst);
            if !self.simulate_ok {
                return Err(EngineError::Relay("simulation reverted".to_string()));
            }
            Ok(BundleSimulation {
                gas_used: 100_000 * txs.len() as u64,
                effective_gas_price_gwei: 40.0,
                profit_wei: 0,
            })
        }

        async fn submit_bundle(
            &self,
            _txs: &[Bytes],
            _target_block: u64,
            _refund: Option<&crate::bundle::RefundConfig>,
        ) -> Result<B256, EngineError> {
            self.submit_calls.fetch_add(1, Ordering::SeqCst);
            let mut outcomes = self.submit_outcomes.lock().unwrap();
            if outcomes.is_empty() {
                return Err(EngineError::Relay("script exhausted".to_string()));
            }
            outcomes.remove(0).map_err(EngineError::Relay)
        }

        async fn block_number(&self) -> Result<u64, EngineError> {
            self.height.clone().map_err(EngineError::Relay)
        }
    }

    struct OkSubmission {
        calls: AtomicU32,
    }

    #[async_trait]
    impl SwapSubmissionGateway for OkSubmission {
        async fn submit_swap(
            &self,
            _request: &SwapRequest,
            _quote: &Quote,
        ) -> Result<String, EngineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok("0xfallback".to_string())
        }
    }

    fn fast_config(max_retries: u32, fallback_enabled: bool) -> BundleConfig {
        BundleConfig {
            max_retries,
            base_delay_ms: 1,
            max_delay_ms: 4,
            backoff_multiplier: 2.0,
            fallback_enabled,
            ..BundleConfig::default()
        }
    }

    fn typed_tx() -> Bytes {
        Bytes::from(vec![0x02, 0xf8, 0x6f, 0x01])
    }

    fn hash(byte: u8) -> B256 {
        B256::repeat_byte(byte)
    }

    fn owner() -> Address {
        Address::repeat_byte(0xaa)
    }

    fn fallback_ctx() -> FallbackContext {
        FallbackContext {
            request: SwapRequest::new(
                Address::repeat_byte(0x11),
                Address::repeat_byte(0x22),
                U256::from(1_000_000u64),
                1,
                owner(),
            ),
            quote: Quote {
                to_amount: U256::from(990_000u64),
                estimated_gas: 210_000,
                route: vec![],
            },
        }
    }

    fn orchestrator(
        relay: Arc<MockRelay>,
        config: BundleConfig,
    ) -> (BundleOrchestrator, Arc<InMemoryBundleStore>, Arc<InMemorySwapStore>) {
        let bundles = Arc::new(InMemoryBundleStore::new());
        let swaps = Arc::new(InMemorySwapStore::new());
        let submission = Arc::new(OkSubmission {
            calls: AtomicU32::new(0),
        });
        (
            BundleOrchestrator::new(relay, submission, bundles.clone(), swaps.clone(), config),
            bundles,
            swaps,
        )
    }

    #[tokio::test]
    async fn test_first_attempt_success() {
        let relay = Arc::new(MockRelay::new(100, vec![Ok(hash(0x01))]));
        let (orchestrator, bundles, _) = orchestrator(relay.clone(), fast_config(3, false));
        let outcome = orchestrator
            .create_bundle_with_retry(vec![typed_tx()], owner(), None)
            .await
            .unwrap();
        let record = match outcome {
            BundleExecution::Private(r) => r,
            other => panic!("expected private record, got {other:?}"),
        };
        assert_eq!(record.status, BundleStatus::Submitted);
        assert_eq!(record.bundle_hash, Some(hash(0x01)));
        assert_eq!(record.submission_attempts, 1);
        assert_eq!(record.target_block, 101);
        assert_eq!(relay.submit_count(), 1);
        assert!(bundles.get(&record.bundle_id).is_some());
    }

    #[tokio::test]
    async fn test_retry_budget_is_max_retries_plus_one() {
        let relay = Arc::new(MockRelay::new(100, vec![]));
        let (orchestrator, bundles, _) = orchestrator(relay.clone(), fast_config(2, false));
        let err = orchestrator
            .create_bundle_with_retry(vec![typed_tx()], owner(), None)
            .await
            .unwrap_err();
        match err {
            EngineError::RetryExhausted { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("expected RetryExhausted, got {other:?}"),
        }
        assert_eq!(relay.submit_count(), 3);
        // The failed record is persisted for the retry chain.
        let history = bundles.list_by_owner(owner());
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, BundleStatus::Failed);
        assert_eq!(history[0].submission_attempts, 3);
        assert!(history[0].last_error.is_some());
    }

    #[tokio::test]
    async fn test_validation_failure_consumes_no_attempt() {
        let relay = Arc::new(MockRelay::new(100, vec![Ok(hash(0x01))]));
        let (orchestrator, _, _) = orchestrator(relay.clone(), fast_config(3, true));
        let err = orchestrator
            .create_bundle_with_retry(vec![], owner(), Some(fallback_ctx()))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation { .. }));
        assert_eq!(relay.submit_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_simulation_aborts_without_submission() {
        let mut relay = MockRelay::new(100, vec![Ok(hash(0x01))]);
        relay.simulate_ok = false;
        let relay = Arc::new(relay);
        let (orchestrator, _, _) = orchestrator(relay.clone(), fast_config(3, true));
        let err = orchestrator
            .create_bundle_with_retry(vec![typed_tx()], owner(), Some(fallback_ctx()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("simulation reverted"));
        assert_eq!(relay.submit_count(), 0);
    }

    #[tokio::test]
    async fn test_fallback_after_exhaustion() {
        let relay = Arc::new(MockRelay::new(100, vec![]));
        let (orchestrator, _, swaps) = orchestrator(relay.clone(), fast_config(1, true));
        let outcome = orchestrator
            .create_bundle_with_retry(vec![typed_tx()], owner(), Some(fallback_ctx()))
            .await
            .unwrap();
        let record = match outcome {
            BundleExecution::PublicFallback(r) => r,
            other => panic!("expected fallback swap, got {other:?}"),
        };
        assert!(record.fallback_used);
        assert!(record
            .fallback_reason
            .as_deref()
            .unwrap()
            .contains("script exhausted"));
        assert_eq!(record.request.slippage, Some(1.0));
        assert_eq!(record.request.gas_price_gwei, Some(50.0));
        assert_eq!(record.status, SwapStatus::Confirmed);
        assert!(record.bundle_id.is_some());
        assert_eq!(swaps.list_by_owner(owner()).len(), 1);
    }

    #[tokio::test]
    async fn test_degraded_simulation_gate() {
        let mut relay = MockRelay::new(100, vec![Ok(hash(0x01))]);
        relay.session = false;
        let relay = Arc::new(relay);

        // Disabled: hard refusal before submission.
        let (orchestrator, _, _) = orchestrator(relay.clone(), fast_config(1, false));
        let err = orchestrator
            .create_bundle_with_retry(vec![typed_tx()], owner(), None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("degraded simulation is disabled"));
        assert_eq!(relay.submit_count(), 0);

        // Enabled: fixed estimates, submission proceeds.
        let mut config = fast_config(1, false);
        config.allow_degraded_simulation = true;
        let (orchestrator, _, _) = orchestrator(relay.clone(), config);
        let outcome = orchestrator
            .create_bundle_with_retry(vec![typed_tx()], owner(), None)
            .await
            .unwrap();
        match outcome {
            BundleExecution::Private(record) => {
                assert_eq!(record.gas_estimate, DEGRADED_GAS_PER_TX);
            }
            other => panic!("expected private record, got {other:?}"),
        }
        assert_eq!(relay.simulate_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_retry_bundle_links_fresh_record() {
        let relay = Arc::new(MockRelay::new(
            100,
            vec![Err("relay busy".to_string()), Ok(hash(0x02))],
        ));
        let (orchestrator, bundles, _) = orchestrator(relay.clone(), fast_config(0, false));

        // Seed: first call fails outright (max_retries = 0 → single attempt).
        let err = orchestrator
            .create_bundle_with_retry(vec![typed_tx()], owner(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::RetryExhausted { attempts: 1, .. }));
        let original = bundles.list_by_owner(owner()).remove(0);
        assert_eq!(original.status, BundleStatus::Failed);

        // Bump the budget so the chain retry is allowed, reusing the same
        // bundle store and relay script.
        let orchestrator = BundleOrchestrator::new(
            relay.clone(),
            Arc::new(OkSubmission {
                calls: AtomicU32::new(0),
            }),
            bundles.clone(),
            Arc::new(InMemorySwapStore::new()),
            fast_config(2, false),
        );

        let retried = orchestrator
            .retry_bundle(&original.bundle_id, None)
            .await
            .unwrap();
        assert_ne!(retried.bundle_id, original.bundle_id);
        assert_eq!(retried.status, BundleStatus::Submitted);
        assert_eq!(retried.target_block, original.target_block + 1);
        let link = retried.retry_link.as_ref().unwrap();
        assert_eq!(link.original_bundle_id, original.bundle_id);
        assert_eq!(link.attempt_number, 1);
        assert!(link.last_error.contains("relay busy"));
        // Original record untouched by the retry.
        let frozen = bundles.get(&original.bundle_id).unwrap();
        assert_eq!(frozen.status, BundleStatus::Failed);
        assert_eq!(frozen.submission_attempts, original.submission_attempts);
    }

    #[tokio::test]
    async fn test_retry_rejects_non_terminal_and_stale() {
        let relay = Arc::new(MockRelay::new(100, vec![]));
        let (orchestrator, bundles, _) = orchestrator(relay, fast_config(3, false));

        let mut submitted = BundleRecord::new(owner(), vec![typed_tx()], 101);
        submitted.status = BundleStatus::Submitted;
        let submitted_id = submitted.bundle_id.clone();
        bundles.put(submitted);
        let err = orchestrator.retry_bundle(&submitted_id, None).await.unwrap_err();
        assert!(err.to_string().contains("not retryable"));

        let mut stale = BundleRecord::new(owner(), vec![typed_tx()], 101);
        stale.status = BundleStatus::Failed;
        stale.created_at = Utc::now() - ChronoDuration::minutes(31);
        let stale_id = stale.bundle_id.clone();
        bundles.put(stale);
        let err = orchestrator.retry_bundle(&stale_id, None).await.unwrap_err();
        assert!(err.to_string().contains("older than 30 minutes"));
    }

    #[tokio::test]
    async fn test_status_read_expires_past_target_block() {
        let relay = Arc::new(MockRelay::new(150, vec![]));
        let (orchestrator, bundles, _) = orchestrator(relay, fast_config(3, false));
        let mut record = BundleRecord::new(owner(), vec![typed_tx()], 120);
        record.status = BundleStatus::Submitted;
        let id = record.bundle_id.clone();
        bundles.put(record);

        let read = orchestrator.get_bundle_status(&id).await.unwrap();
        assert_eq!(read.status, BundleStatus::Expired);
        assert_eq!(bundles.get(&id).unwrap().status, BundleStatus::Expired);
    }

    #[tokio::test]
    async fn test_status_read_survives_height_failure() {
        let mut relay = MockRelay::new(150, vec![]);
        relay.height = Err("rpc down".to_string());
        let relay = Arc::new(relay);
        let (orchestrator, bundles, _) = orchestrator(relay, fast_config(3, false));
        let mut record = BundleRecord::new(owner(), vec![typed_tx()], 120);
        record.status = BundleStatus::Submitted;
        let id = record.bundle_id.clone();
        bundles.put(record);

        // Best-effort: the read still succeeds, status unchanged.
        let read = orchestrator.get_bundle_status(&id).await.unwrap();
        assert_eq!(read.status, BundleStatus::Submitted);
    }

    #[tokio::test]
    async fn test_deadline_aborts_backoff_wait() {
        let relay = Arc::new(MockRelay::new(100, vec![]));
        let mut config = fast_config(3, true);
        config.base_delay_ms = 60_000; // next wait would blow the deadline
        config.max_delay_ms = 60_000;
        let (orchestrator, bundles, _) = orchestrator(relay.clone(), config);

        let mut ctx = fallback_ctx();
        ctx.request.deadline = Some(Utc::now() + ChronoDuration::seconds(5));
        let err = orchestrator
            .create_bundle_with_retry(vec![typed_tx()], owner(), Some(ctx))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::TimeoutExpired { .. }));
        // Only the first attempt ran; the wait was refused, not served.
        assert_eq!(relay.submit_count(), 1);
        assert_eq!(bundles.list_by_owner(owner())[0].status, BundleStatus::Failed);
    }
}
