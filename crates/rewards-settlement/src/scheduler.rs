use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rewards_core::constants::{ENGINE_TICK_MS, LEADER_CHECK_MS};
use rewards_core::error::RewardsError;
use rewards_store::AdvisoryLock;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::engine::{SettlementEngine, TickOutcome};

/// Leader election + tick scheduler. Runs two cooperative loops — leader
/// heartbeat and settlement tick — sharing a cancellation token.
pub struct Scheduler {
    engine: Arc<SettlementEngine>,
    is_leader: Arc<AtomicBool>,
    processing: Arc<AtomicBool>,
    cancel: CancellationToken,
}

impl Scheduler {
    pub fn new(engine: Arc<SettlementEngine>) -> Self {
        Self {
            engine,
            is_leader: Arc::new(AtomicBool::new(false)),
            processing: Arc::new(AtomicBool::new(false)),
            cancel: CancellationToken::new(),
        }
    }

    pub fn is_leader(&self) -> bool {
        self.is_leader.load(Ordering::SeqCst)
    }

    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::SeqCst)
    }

    /// Startup sequence: attempt initial leadership, spawn both timer loops,
    /// then run one immediate tick.
    pub async fn start(&self, database_url: &str) -> Result<(), RewardsError> {
        let mut lock = AdvisoryLock::connect(database_url).await?;
        let acquired = lock.try_acquire().await.unwrap_or(false);
        self.is_leader.store(acquired, Ordering::SeqCst);
        if acquired {
            info!("acquired leader advisory lock at startup");
        }

        tokio::spawn(Self::leader_loop(lock, self.is_leader.clone(), self.cancel.clone()));
        tokio::spawn(Self::tick_loop(
            self.engine.clone(),
            self.is_leader.clone(),
            self.processing.clone(),
            self.cancel.clone(),
        ));

        if self.is_leader() {
            Self::run_tick(&self.engine, &self.processing).await;
        }

        Ok(())
    }

    /// Orderly shutdown: stop both loops. The leader loop releases the
    /// advisory lock before its connection closes.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// The manual-trigger entry point for `POST /run`. Shares the same
    /// single-flight guard and the same `tick()` call as the timer path.
    pub async fn trigger_manual(&self) -> Result<TickOutcome, RewardsError> {
        if !self.is_leader() {
            return Err(RewardsError::NotLeader);
        }
        if self.processing.swap(true, Ordering::SeqCst) {
            return Err(RewardsError::AlreadyProcessing);
        }
        let result = self.engine.tick().await;
        self.processing.store(false, Ordering::SeqCst);
        result
    }

    async fn leader_loop(mut lock: AdvisoryLock, is_leader: Arc<AtomicBool>, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(Duration::from_millis(LEADER_CHECK_MS));
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    if let Err(e) = lock.release().await {
                        warn!(error = %e, "failed to release advisory lock on shutdown");
                    }
                    break;
                }
                _ = interval.tick() => {
                    if lock.is_held() {
                        if let Err(e) = lock.heartbeat().await {
                            warn!(error = %e, "leader heartbeat failed — leadership lost");
                            is_leader.store(false, Ordering::SeqCst);
                        }
                    } else {
                        match lock.try_acquire().await {
                            Ok(true) => {
                                info!("acquired leadership");
                                is_leader.store(true, Ordering::SeqCst);
                            }
                            Ok(false) => {}
                            Err(e) => warn!(error = %e, "leader acquisition attempt failed"),
                        }
                    }
                }
            }
        }
    }

    async fn tick_loop(
        engine: Arc<SettlementEngine>,
        is_leader: Arc<AtomicBool>,
        processing: Arc<AtomicBool>,
        cancel: CancellationToken,
    ) {
        let mut interval = tokio::time::interval(Duration::from_millis(ENGINE_TICK_MS));
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    if is_leader.load(Ordering::SeqCst) {
                        Self::run_tick(&engine, &processing).await;
                    }
                }
            }
        }
    }

    async fn run_tick(engine: &Arc<SettlementEngine>, processing: &Arc<AtomicBool>) {
        if processing.swap(true, Ordering::SeqCst) {
            return;
        }
        match engine.tick().await {
            Ok(outcome) => info!(?outcome, "settlement tick complete"),
            Err(e) => warn!(error = %e, "settlement tick failed"),
        }
        processing.store(false, Ordering::SeqCst);
    }
}
