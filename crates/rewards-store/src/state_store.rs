use chrono::{DateTime, Utc};
use rewards_core::error::RewardsError;
use rewards_core::types::{Lamports, PayoutPlanEntry, WinnerRecord};
use sqlx::{PgConnection, PgPool, Postgres, Transaction};

use crate::models::{EpochRow, RewardsStateRow, WinnerRow};

/// Durable access to the rewards-state singleton, per-period epoch records,
/// and per-epoch winners.
///
/// Every method takes an explicit `&mut PgConnection` rather than hiding a
/// pool internally: callers that need several writes to land atomically
/// (the Decide-phase transaction, Finalize, every compensating rollback)
/// acquire one `Transaction` via `StateStore::begin_serializable` and pass
/// `&mut *tx` through a sequence of these calls; callers that only need a
/// single read borrow a connection from the pool for the duration of the
/// call.
#[derive(Clone)]
pub struct StateStore {
    pool: PgPool,
}

impl StateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Begin a `SERIALIZABLE` transaction. Every money-affecting transition
    /// in the state machine executes inside one such transaction.
    pub async fn begin_serializable(&self) -> Result<Transaction<'static, Postgres>, RewardsError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }

    pub async fn get_state(&self) -> Result<RewardsStateRow, RewardsError> {
        let mut conn = self.pool.acquire().await?;
        get_state(&mut conn).await
    }
}

// ── RewardsState ──────────────────────────────────────────────────────────────

pub async fn get_state(conn: &mut PgConnection) -> Result<RewardsStateRow, RewardsError> {
    sqlx::query_as::<_, RewardsStateRow>("SELECT * FROM rewards_state WHERE id = 1")
        .fetch_optional(conn)
        .await?
        .ok_or(RewardsError::MissingState)
}

/// Lock the singleton row `FOR UPDATE` for the duration of the caller's
/// transaction — used at the top of the Decide phase so two concurrent
/// settlers (which should never happen under correct leader election, but
/// this is cheap insurance at the SQL level too) cannot both read the same
/// carry value.
pub async fn get_state_for_update(tx: &mut PgConnection) -> Result<RewardsStateRow, RewardsError> {
    sqlx::query_as::<_, RewardsStateRow>("SELECT * FROM rewards_state WHERE id = 1 FOR UPDATE")
        .fetch_optional(tx)
        .await?
        .ok_or(RewardsError::MissingState)
}

pub async fn add_treasury_accrued(tx: &mut PgConnection, amount: Lamports) -> Result<(), RewardsError> {
    sqlx::query("UPDATE rewards_state SET treasury_accrued_lamports = treasury_accrued_lamports + $1, updated_at = now() WHERE id = 1")
        .bind(amount as i64)
        .execute(tx)
        .await?;
    Ok(())
}

pub async fn set_carry(tx: &mut PgConnection, amount: Lamports) -> Result<(), RewardsError> {
    sqlx::query("UPDATE rewards_state SET carry_rewards_lamports = $1, updated_at = now() WHERE id = 1")
        .bind(amount as i64)
        .execute(tx)
        .await?;
    Ok(())
}

pub async fn add_carry(tx: &mut PgConnection, amount: Lamports) -> Result<(), RewardsError> {
    sqlx::query("UPDATE rewards_state SET carry_rewards_lamports = carry_rewards_lamports + $1, updated_at = now() WHERE id = 1")
        .bind(amount as i64)
        .execute(tx)
        .await?;
    Ok(())
}

/// Advance the cursor to `(period_id, period_end)`. Only ever moves forward —
/// callers are responsible for only calling this with a `period_end` at or
/// after the current cursor.
pub async fn advance_cursor(
    tx: &mut PgConnection,
    period_id: &str,
    period_end: DateTime<Utc>,
) -> Result<(), RewardsError> {
    sqlx::query(
        "UPDATE rewards_state SET last_processed_period_id = $1, last_processed_period_end = $2, updated_at = now() WHERE id = 1",
    )
    .bind(period_id)
    .bind(period_end)
    .execute(tx)
    .await?;
    Ok(())
}

// ── Epochs ────────────────────────────────────────────────────────────────────

pub async fn get_epoch_by_period(
    conn: &mut PgConnection,
    leaderboard_period_id: &str,
) -> Result<Option<EpochRow>, RewardsError> {
    let row = sqlx::query_as::<_, EpochRow>("SELECT * FROM epochs WHERE leaderboard_period_id = $1")
        .bind(leaderboard_period_id)
        .fetch_optional(conn)
        .await?;
    Ok(row)
}

pub async fn get_epoch(conn: &mut PgConnection, epoch_id: i64) -> Result<Option<EpochRow>, RewardsError> {
    let row = sqlx::query_as::<_, EpochRow>("SELECT * FROM epochs WHERE epoch_id = $1")
        .bind(epoch_id)
        .fetch_optional(conn)
        .await?;
    Ok(row)
}

/// Phase A: create a fresh `created` epoch for a period that has never been
/// seen before, snapshotting the current `rewardsPoolBps` config.
pub async fn insert_epoch_created(
    conn: &mut PgConnection,
    leaderboard_period_id: &str,
    rewards_pool_bps: u32,
) -> Result<EpochRow, RewardsError> {
    let row = sqlx::query_as::<_, EpochRow>(
        "INSERT INTO epochs (leaderboard_period_id, rewards_pool_bps, status)
         VALUES ($1, $2, 'created')
         RETURNING *",
    )
    .bind(leaderboard_period_id)
    .bind(rewards_pool_bps as i32)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

/// Phase A: reset a `failed` epoch back to `created`, clearing the failure
/// reason, so the next tick retries it from scratch.
pub async fn reset_failed_to_created(conn: &mut PgConnection, epoch_id: i64) -> Result<(), RewardsError> {
    sqlx::query(
        "UPDATE epochs SET status = 'created', failure_reason = NULL, updated_at = now() WHERE epoch_id = $1",
    )
    .bind(epoch_id)
    .execute(conn)
    .await?;
    Ok(())
}

/// Phase B step 2: `created -> claiming`, recording `claimStartedAt` and
/// `beforeBalance`.
pub async fn mark_claiming(
    conn: &mut PgConnection,
    epoch_id: i64,
    before_balance: Lamports,
) -> Result<(), RewardsError> {
    sqlx::query(
        "UPDATE epochs SET status = 'claiming', claim_started_at = now(), before_balance = $2, updated_at = now() WHERE epoch_id = $1",
    )
    .bind(epoch_id)
    .bind(before_balance as i64)
    .execute(conn)
    .await?;
    Ok(())
}

/// Inputs to the Decide-phase atomic transaction, gathered by
/// the state machine once the claim has completed.
pub struct ClaimOutcome {
    pub after_balance: Lamports,
    pub total_inflow: Lamports,
    pub reward_inflow: Lamports,
    pub treasury_inflow: Lamports,
    pub claim_tx_signatures: Vec<String>,
    pub carry_in: Lamports,
    pub total_pot: Lamports,
}

/// Record the claim-phase results onto the epoch row. Called at the start
/// of the Decide-phase transaction, before the skip/pay branch is decided.
pub async fn record_claim_outcome(
    tx: &mut PgConnection,
    epoch_id: i64,
    outcome: &ClaimOutcome,
) -> Result<(), RewardsError> {
    let sigs = serde_json::to_value(&outcome.claim_tx_signatures).unwrap_or_default();
    sqlx::query(
        "UPDATE epochs SET
            claim_completed_at = now(),
            claim_tx_signatures = $2,
            after_balance = $3,
            total_inflow = $4,
            reward_inflow = $5,
            treasury_inflow = $6,
            carry_in = $7,
            total_pot = $8,
            updated_at = now()
         WHERE epoch_id = $1",
    )
    .bind(epoch_id)
    .bind(sigs)
    .bind(outcome.after_balance as i64)
    .bind(outcome.total_inflow as i64)
    .bind(outcome.reward_inflow as i64)
    .bind(outcome.treasury_inflow as i64)
    .bind(outcome.carry_in as i64)
    .bind(outcome.total_pot as i64)
    .execute(tx)
    .await?;
    Ok(())
}

/// Recovery's claiming path: the epoch goes back to `created`
/// but carries forward the recomputed claim results, so phase A's resolver
/// can recognize it already has a completed claim and jump straight to
/// Decide instead of re-running `claimFees()`.
pub async fn reset_claiming_to_created(conn: &mut PgConnection, epoch_id: i64) -> Result<(), RewardsError> {
    sqlx::query("UPDATE epochs SET status = 'created', updated_at = now() WHERE epoch_id = $1")
        .bind(epoch_id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn mark_treasury_accrued_recorded(tx: &mut PgConnection, epoch_id: i64) -> Result<(), RewardsError> {
    sqlx::query("UPDATE epochs SET treasury_accrued_recorded = true WHERE epoch_id = $1")
        .bind(epoch_id)
        .execute(tx)
        .await?;
    Ok(())
}

/// Decide phase, skip branch: the epoch cannot be paid (too few eligible
/// wallets or insufficient vault balance). Pot is returned to carry inline.
pub async fn mark_skipped(tx: &mut PgConnection, epoch_id: i64, failure_reason: &str) -> Result<(), RewardsError> {
    sqlx::query(
        "UPDATE epochs SET status = 'skipped', failure_reason = $2, updated_at = now() WHERE epoch_id = $1",
    )
    .bind(epoch_id)
    .bind(failure_reason)
    .execute(tx)
    .await?;
    Ok(())
}

/// Decide phase, pay branch: the central correctness hinge.
/// Commits the payout plan and transitions to `paying` in the same
/// transaction that zeroes `state.carry` — once this commits, the pot is
/// reserved for this epoch and cannot be double-claimed by any other epoch.
pub async fn commit_to_paying(
    tx: &mut PgConnection,
    epoch_id: i64,
    plan: &[PayoutPlanEntry],
    total_paid: Lamports,
) -> Result<(), RewardsError> {
    let plan_json = serde_json::to_value(plan).unwrap_or_default();
    sqlx::query(
        "UPDATE epochs SET
            status = 'paying',
            payout_plan = $2,
            payout_started_at = now(),
            total_paid = $3,
            updated_at = now()
         WHERE epoch_id = $1",
    )
    .bind(epoch_id)
    .bind(plan_json)
    .bind(total_paid as i64)
    .execute(tx)
    .await?;
    Ok(())
}

/// Phase D success path: persist the on-chain signature immediately, in its
/// own single-column transaction, before Finalize runs. This
/// is what lets recovery distinguish "sent but not finalized" from "never
/// sent" after a crash.
pub async fn persist_payout_signature(
    pool: &PgPool,
    epoch_id: i64,
    signature: &str,
) -> Result<(), RewardsError> {
    sqlx::query("UPDATE epochs SET payout_tx_signature = $2, updated_at = now() WHERE epoch_id = $1")
        .bind(epoch_id)
        .bind(signature)
        .execute(pool)
        .await?;
    Ok(())
}

/// Phase D failure path / Recovery stuck-paying-no-plan path: roll the pot
/// back to carry and mark the epoch permanently failed. Cursor is left
/// untouched.
pub async fn fail_epoch_restore_carry(
    tx: &mut PgConnection,
    epoch_id: i64,
    failure_reason: &str,
    pot_to_restore: Lamports,
) -> Result<(), RewardsError> {
    add_carry(tx, pot_to_restore).await?;
    sqlx::query("UPDATE epochs SET status = 'failed', failure_reason = $2, updated_at = now() WHERE epoch_id = $1")
        .bind(epoch_id)
        .bind(failure_reason)
        .execute(tx)
        .await?;
    Ok(())
}

/// Phase E (Finalize): insert the 3 winners (insert-or-ignore), mark the
/// epoch completed, and advance the cursor — all in one transaction.
pub async fn finalize(
    tx: &mut PgConnection,
    epoch_id: i64,
    winners: &[WinnerRecord],
    payout_tx_signature: &str,
    total_paid: Lamports,
    leaderboard_period_id: &str,
    period_end: DateTime<Utc>,
) -> Result<(), RewardsError> {
    insert_winners(tx, winners).await?;

    sqlx::query(
        "UPDATE epochs SET
            status = 'completed',
            payout_completed_at = now(),
            payout_tx_signature = $2,
            total_paid = $3,
            updated_at = now()
         WHERE epoch_id = $1",
    )
    .bind(epoch_id)
    .bind(payout_tx_signature)
    .bind(total_paid as i64)
    .execute(&mut *tx)
    .await?;

    advance_cursor(tx, leaderboard_period_id, period_end).await?;
    Ok(())
}

async fn insert_winners(tx: &mut PgConnection, winners: &[WinnerRecord]) -> Result<(), RewardsError> {
    for w in winners {
        sqlx::query(
            "INSERT INTO winners (epoch_id, rank, wallet_address, user_id, profit_lamports, trade_count, payout_lamports)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT DO NOTHING",
        )
        .bind(w.epoch_id)
        .bind(w.rank as i16)
        .bind(&w.wallet_address)
        .bind(&w.user_id)
        .bind(w.profit_lamports as i64)
        .bind(w.trade_count as i32)
        .bind(w.payout_lamports as i64)
        .execute(&mut *tx)
        .await?;
    }
    Ok(())
}

pub async fn get_winners_for_epoch(
    conn: &mut PgConnection,
    epoch_id: i64,
) -> Result<Vec<WinnerRow>, RewardsError> {
    let rows = sqlx::query_as::<_, WinnerRow>("SELECT * FROM winners WHERE epoch_id = $1 ORDER BY rank ASC")
        .bind(epoch_id)
        .fetch_all(conn)
        .await?;
    Ok(rows)
}

// ── Recovery support ──────────────────────────────────────────────────────────

/// Every non-terminal epoch whose `updated_at` is older than `stuck_before`.
pub async fn list_stuck_epochs(conn: &mut PgConnection, stuck_before: DateTime<Utc>) -> Result<Vec<EpochRow>, RewardsError> {
    let rows = sqlx::query_as::<_, EpochRow>(
        "SELECT * FROM epochs WHERE status IN ('claiming', 'paying') AND updated_at < $1",
    )
    .bind(stuck_before)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

pub async fn most_recent_history(conn: &mut PgConnection, limit: i64) -> Result<Vec<EpochRow>, RewardsError> {
    let rows = sqlx::query_as::<_, EpochRow>("SELECT * FROM epochs ORDER BY created_at DESC LIMIT $1")
        .bind(limit)
        .fetch_all(conn)
        .await?;
    Ok(rows)
}
