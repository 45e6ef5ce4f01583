use std::sync::Arc;

use chrono::{Duration, Utc};
use rewards_core::constants::WINNER_COUNT;
use rewards_core::error::{GatewayError, RewardsError};
use rewards_core::status::{failure_reason, EpochStatus};
use rewards_core::types::{Lamports, PayoutPlanEntry, WinnerRecord};
use rewards_ledger::LedgerGateway;
use rewards_query::{Period, QueryPort};
use rewards_store::state_store::{self, ClaimOutcome};
use rewards_store::StateStore;
use tracing::{info, warn};

/// Config the settlement core needs beyond what the Ledger Gateway already
/// carries.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub rewards_pool_bps: u32,
    pub min_trades: u32,
    pub stuck_timeout: Duration,
}

/// Outcome of one `tick()` call, surfaced to the scheduler and the status
/// endpoint.
#[derive(Debug, Clone)]
pub enum TickOutcome {
    /// No period was ready to process this tick.
    Idle,
    /// An epoch reached a terminal state this tick.
    Settled { epoch_id: i64, period_id: String, status: EpochStatus },
    /// An epoch is mid-phase (claiming/paying) and was left for the next
    /// tick's recovery sweep.
    InProgress { epoch_id: i64, period_id: String },
}

/// The result of the in-memory Claim phase, not yet committed
/// to the epoch row — that happens atomically at the top of Decide.
struct ClaimContext {
    after_balance: Lamports,
    total_inflow: Lamports,
    reward_inflow: Lamports,
    treasury_inflow: Lamports,
    claim_tx_signatures: Vec<String>,
}

/// Drives one epoch at a time through phases A–F. Holds no
/// mutable state of its own beyond its collaborators — every durable fact
/// lives in the State Store.
pub struct SettlementEngine {
    store: StateStore,
    query: QueryPort,
    gateway: Arc<LedgerGateway>,
    config: EngineConfig,
}

impl SettlementEngine {
    pub fn new(store: StateStore, query: QueryPort, gateway: Arc<LedgerGateway>, config: EngineConfig) -> Self {
        Self { store, query, gateway, config }
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn gateway(&self) -> &LedgerGateway {
        &self.gateway
    }

    /// One full pass: recovery sweep, then at most one period processed.
    pub async fn tick(&self) -> Result<TickOutcome, RewardsError> {
        self.run_recovery().await?;

        let state = self.store.get_state().await?;
        let period = self
            .query
            .next_period_to_process(state.last_processed_period_end)
            .await?;

        let Some(period) = period else {
            return Ok(TickOutcome::Idle);
        };

        let epoch = self.resolve_epoch(&period).await?;

        match epoch.status() {
            EpochStatus::Completed | EpochStatus::Skipped => Ok(TickOutcome::Settled {
                epoch_id: epoch.epoch_id,
                period_id: epoch.leaderboard_period_id,
                status: epoch.status(),
            }),
            EpochStatus::Claiming | EpochStatus::Paying => Ok(TickOutcome::InProgress {
                epoch_id: epoch.epoch_id,
                period_id: epoch.leaderboard_period_id,
            }),
            EpochStatus::Created => {
                let claim = if epoch.claim_completed_at.is_some() {
                    // Recovered claim — don't call claimFees() again.
                    ClaimContext {
                        after_balance: epoch.after_balance.unwrap_or(0) as Lamports,
                        total_inflow: epoch.total_inflow.unwrap_or(0) as Lamports,
                        reward_inflow: epoch.reward_inflow.unwrap_or(0) as Lamports,
                        treasury_inflow: epoch.treasury_inflow.unwrap_or(0) as Lamports,
                        claim_tx_signatures: epoch.claim_tx_signatures(),
                    }
                } else {
                    self.claim_phase(epoch.epoch_id).await?
                };

                let decision = self.decide_phase(epoch.epoch_id, &period, claim).await?;
                match decision {
                    Decision::Skipped { .. } => Ok(TickOutcome::Settled {
                        epoch_id: epoch.epoch_id,
                        period_id: period.period_id,
                        status: EpochStatus::Skipped,
                    }),
                    Decision::Paying { plan, total_pot } => {
                        self.payout_phase(epoch.epoch_id, &plan, total_pot, &period).await?;
                        let mut conn = self.store.pool().acquire().await?;
                        let row = state_store::get_epoch(&mut conn, epoch.epoch_id)
                            .await?
                            .ok_or_else(|| RewardsError::EpochNotFound(epoch.epoch_id.to_string()))?;
                        Ok(TickOutcome::Settled {
                            epoch_id: epoch.epoch_id,
                            period_id: period.period_id,
                            status: row.status(),
                        })
                    }
                }
            }
            EpochStatus::Failed => unreachable!("resolve_epoch always clears failed into created"),
        }
    }

    /// Phase A.
    async fn resolve_epoch(&self, period: &Period) -> Result<rewards_store::models::EpochRow, RewardsError> {
        let mut conn = self.store.pool().acquire().await?;

        let existing = state_store::get_epoch_by_period(&mut conn, &period.period_id).await?;

        let epoch = match existing {
            Some(row) => match row.status() {
                EpochStatus::Completed | EpochStatus::Skipped => {
                    let mut tx = self.store.begin_serializable().await?;
                    state_store::advance_cursor(&mut tx, &period.period_id, period.end_time).await?;
                    tx.commit().await?;
                    row
                }
                EpochStatus::Claiming | EpochStatus::Paying => row,
                EpochStatus::Failed => {
                    state_store::reset_failed_to_created(&mut conn, row.epoch_id).await?;
                    state_store::get_epoch(&mut conn, row.epoch_id)
                        .await?
                        .ok_or_else(|| RewardsError::EpochNotFound(row.epoch_id.to_string()))?
                }
                EpochStatus::Created => row,
            },
            None => state_store::insert_epoch_created(&mut conn, &period.period_id, self.config.rewards_pool_bps).await?,
        };

        Ok(epoch)
    }

    /// Phase B.
    async fn claim_phase(&self, epoch_id: i64) -> Result<ClaimContext, RewardsError> {
        let before_balance = self.gateway.vault_balance().await?;

        let mut conn = self.store.pool().acquire().await?;
        state_store::mark_claiming(&mut conn, epoch_id, before_balance).await?;

        let (claim_tx_signatures, _ok) = self.gateway.claim_fees().await?;
        let after_balance = self.gateway.vault_balance().await?;
        let total_inflow = after_balance.saturating_sub(before_balance);
        let (reward_inflow, treasury_inflow) =
            rewards_pot::split_inflow(total_inflow, self.config.rewards_pool_bps);

        Ok(ClaimContext {
            after_balance,
            total_inflow,
            reward_inflow,
            treasury_inflow,
            claim_tx_signatures,
        })
    }

    /// Phase C — the atomic decide transaction.
    async fn decide_phase(
        &self,
        epoch_id: i64,
        period: &Period,
        claim: ClaimContext,
    ) -> Result<Decision, RewardsError> {
        let mut tx = self.store.begin_serializable().await?;

        let state = state_store::get_state_for_update(&mut tx).await?;
        let carry_in = state.carry();
        let total_pot = rewards_pot::compose_pot(carry_in, claim.reward_inflow);

        let outcome = ClaimOutcome {
            after_balance: claim.after_balance,
            total_inflow: claim.total_inflow,
            reward_inflow: claim.reward_inflow,
            treasury_inflow: claim.treasury_inflow,
            claim_tx_signatures: claim.claim_tx_signatures,
            carry_in,
            total_pot,
        };
        state_store::record_claim_outcome(&mut tx, epoch_id, &outcome).await?;

        let epoch_row = state_store::get_epoch(&mut tx, epoch_id)
            .await?
            .ok_or_else(|| RewardsError::EpochNotFound(epoch_id.to_string()))?;
        if !epoch_row.treasury_accrued_recorded {
            state_store::add_treasury_accrued(&mut tx, claim.treasury_inflow).await?;
            state_store::mark_treasury_accrued_recorded(&mut tx, epoch_id).await?;
        }

        let top = self
            .query
            .top_wallets_for_period(period.start_time, period.end_time, self.config.min_trades, WINNER_COUNT as u32)
            .await?;

        if top.len() < WINNER_COUNT {
            state_store::mark_skipped(&mut tx, epoch_id, failure_reason::INSUFFICIENT_ELIGIBLE_WALLETS).await?;
            state_store::set_carry(&mut tx, total_pot).await?;
            state_store::advance_cursor(&mut tx, &period.period_id, period.end_time).await?;
            tx.commit().await?;
            info!(epoch_id, "epoch skipped: insufficient eligible wallets");
            return Ok(Decision::Skipped { reason: failure_reason::INSUFFICIENT_ELIGIBLE_WALLETS });
        }

        let min_required =
            total_pot + self.gateway.vault_reserve_lamports() + self.gateway.estimate_payout_fee(WINNER_COUNT);
        if claim.after_balance < min_required {
            state_store::mark_skipped(&mut tx, epoch_id, failure_reason::INSUFFICIENT_VAULT_BALANCE).await?;
            state_store::set_carry(&mut tx, total_pot).await?;
            state_store::advance_cursor(&mut tx, &period.period_id, period.end_time).await?;
            tx.commit().await?;
            info!(epoch_id, "epoch skipped: insufficient vault balance");
            return Ok(Decision::Skipped { reason: failure_reason::INSUFFICIENT_VAULT_BALANCE });
        }

        let plan = rewards_pot::build_payout_plan(total_pot, &top[..WINNER_COUNT]);
        state_store::set_carry(&mut tx, 0).await?;
        state_store::commit_to_paying(&mut tx, epoch_id, &plan, total_pot).await?;
        tx.commit().await?;
        info!(epoch_id, total_pot, "epoch committed to paying");

        Ok(Decision::Paying { plan: plan.to_vec(), total_pot })
    }

    /// Phase D + E.
    async fn payout_phase(
        &self,
        epoch_id: i64,
        plan: &[PayoutPlanEntry],
        total_pot: Lamports,
        period: &Period,
    ) -> Result<(), RewardsError> {
        let (signature, ok) = match self.gateway.send_payout(plan).await {
            Ok(pair) => pair,
            Err(GatewayError::Permanent(reason)) => {
                let mut tx = self.store.begin_serializable().await?;
                state_store::fail_epoch_restore_carry(&mut tx, epoch_id, "payout_send_failed", total_pot).await?;
                tx.commit().await?;
                warn!(epoch_id, reason, "payout send permanently failed — pot restored to carry");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        if !ok {
            let mut tx = self.store.begin_serializable().await?;
            state_store::fail_epoch_restore_carry(&mut tx, epoch_id, "payout_send_failed", total_pot).await?;
            tx.commit().await?;
            warn!(epoch_id, "payout send failed — pot restored to carry");
            return Ok(());
        }

        state_store::persist_payout_signature(self.store.pool(), epoch_id, &signature).await?;
        self.finalize(epoch_id, plan, &signature, total_pot, period).await
    }

    async fn finalize(
        &self,
        epoch_id: i64,
        plan: &[PayoutPlanEntry],
        signature: &str,
        total_paid: Lamports,
        period: &Period,
    ) -> Result<(), RewardsError> {
        let winners: Vec<WinnerRecord> = plan.iter().map(|e| WinnerRecord::from((epoch_id, e))).collect();
        let mut tx = self.store.begin_serializable().await?;
        state_store::finalize(&mut tx, epoch_id, &winners, signature, total_paid, &period.period_id, period.end_time)
            .await?;
        tx.commit().await?;
        info!(epoch_id, signature, "epoch finalized");
        Ok(())
    }

    /// Phase F. Runs at the start of every tick.
    async fn run_recovery(&self) -> Result<(), RewardsError> {
        let stuck_before = Utc::now() - self.config.stuck_timeout;
        let mut conn = self.store.pool().acquire().await?;
        let stuck = state_store::list_stuck_epochs(&mut conn, stuck_before).await?;
        drop(conn);

        for epoch in stuck {
            let result = match epoch.status() {
                EpochStatus::Claiming => self.recover_claiming(&epoch).await,
                EpochStatus::Paying => self.recover_paying(&epoch).await,
                _ => Ok(()),
            };
            if let Err(e) = result {
                warn!(epoch_id = epoch.epoch_id, error = %e, "recovery step failed, will retry next tick");
            }
        }
        Ok(())
    }

    async fn recover_claiming(&self, epoch: &rewards_store::models::EpochRow) -> Result<(), RewardsError> {
        let Some(before_balance) = epoch.before_balance else {
            let mut tx = self.store.begin_serializable().await?;
            state_store::fail_epoch_restore_carry(
                &mut tx,
                epoch.epoch_id,
                failure_reason::STUCK_IN_CLAIMING_NO_BEFORE_BALANCE,
                0,
            )
            .await?;
            tx.commit().await?;
            warn!(epoch_id = epoch.epoch_id, "recovery: claiming epoch had no beforeBalance, marked failed");
            return Ok(());
        };

        let after_balance = self.gateway.vault_balance().await?;
        let total_inflow = after_balance.saturating_sub(before_balance as Lamports);
        let (reward_inflow, treasury_inflow) =
            rewards_pot::split_inflow(total_inflow, epoch.rewards_pool_bps as u32);

        let mut tx = self.store.begin_serializable().await?;
        let outcome = ClaimOutcome {
            after_balance,
            total_inflow,
            reward_inflow,
            treasury_inflow,
            claim_tx_signatures: epoch.claim_tx_signatures(),
            carry_in: 0,
            total_pot: 0,
        };
        state_store::record_claim_outcome(&mut tx, epoch.epoch_id, &outcome).await?;
        state_store::reset_claiming_to_created(&mut tx, epoch.epoch_id).await?;
        tx.commit().await?;
        info!(epoch_id = epoch.epoch_id, total_inflow, "recovery: recomputed claim inflow, reset to created");
        Ok(())
    }

    async fn recover_paying(&self, epoch: &rewards_store::models::EpochRow) -> Result<(), RewardsError> {
        let period = self
            .query
            .get_period_by_id(&epoch.leaderboard_period_id)
            .await?
            .ok_or_else(|| RewardsError::Other(format!("recovery: period {} not found", epoch.leaderboard_period_id)))?;

        if let Some(sig) = epoch.payout_tx_signature.clone() {
            if self.gateway.verify_transaction(&sig).await? {
                if let Some(plan) = epoch.payout_plan() {
                    let total_paid = epoch.total_paid.unwrap_or(0) as Lamports;
                    self.finalize(epoch.epoch_id, &plan, &sig, total_paid, &period).await?;
                    info!(epoch_id = epoch.epoch_id, "recovery: confirmed prior payout, finalized");
                }
                return Ok(());
            }
        }

        if let Some(plan) = epoch.payout_plan() {
            let total_pot = epoch.total_pot.unwrap_or(0) as Lamports;
            warn!(epoch_id = epoch.epoch_id, "recovery: re-entering payout phase");
            self.payout_phase(epoch.epoch_id, &plan, total_pot, &period).await?;
            return Ok(());
        }

        let total_pot = epoch.total_pot.unwrap_or(0) as Lamports;
        let mut tx = self.store.begin_serializable().await?;
        state_store::fail_epoch_restore_carry(&mut tx, epoch.epoch_id, failure_reason::STUCK_IN_PAYING_NO_PLAN, total_pot)
            .await?;
        tx.commit().await?;
        warn!(epoch_id = epoch.epoch_id, "recovery: paying epoch had no plan, marked failed");
        Ok(())
    }
}

enum Decision {
    Skipped { reason: &'static str },
    Paying { plan: Vec<PayoutPlanEntry>, total_pot: Lamports },
}
