use chrono::{DateTime, Utc};
use rewards_core::status::EpochStatus;
use rewards_core::types::{Lamports, PayoutPlanEntry};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// The process-wide rewards-state singleton. Exactly one row
/// ever exists, with fixed id `1`.
#[derive(Debug, Clone, FromRow)]
pub struct RewardsStateRow {
    pub id: i16,
    pub carry_rewards_lamports: i64,
    pub treasury_accrued_lamports: i64,
    pub last_processed_period_id: Option<String>,
    pub last_processed_period_end: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl RewardsStateRow {
    pub fn carry(&self) -> Lamports {
        self.carry_rewards_lamports as Lamports
    }

    pub fn treasury_accrued(&self) -> Lamports {
        self.treasury_accrued_lamports as Lamports
    }
}

/// One leaderboard-period settlement row.
#[derive(Debug, Clone, FromRow)]
pub struct EpochRow {
    pub epoch_id: i64,
    pub leaderboard_period_id: String,

    pub rewards_pool_bps: i32,

    pub before_balance: Option<i64>,
    pub after_balance: Option<i64>,
    pub total_inflow: Option<i64>,
    pub reward_inflow: Option<i64>,
    pub treasury_inflow: Option<i64>,
    pub claim_started_at: Option<DateTime<Utc>>,
    pub claim_completed_at: Option<DateTime<Utc>>,
    pub claim_tx_signatures: serde_json::Value,

    pub treasury_accrued_recorded: bool,

    pub carry_in: Option<i64>,
    pub total_pot: Option<i64>,

    pub payout_plan: Option<serde_json::Value>,
    pub payout_started_at: Option<DateTime<Utc>>,
    pub payout_completed_at: Option<DateTime<Utc>>,
    pub payout_tx_signature: Option<String>,
    pub total_paid: Option<i64>,

    pub status: String,
    pub failure_reason: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EpochRow {
    pub fn status(&self) -> EpochStatus {
        EpochStatus::from_str(&self.status).unwrap_or(EpochStatus::Failed)
    }

    pub fn claim_tx_signatures(&self) -> Vec<String> {
        serde_json::from_value(self.claim_tx_signatures.clone()).unwrap_or_default()
    }

    pub fn payout_plan(&self) -> Option<Vec<PayoutPlanEntry>> {
        self.payout_plan
            .as_ref()
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// A single persisted winner row.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct WinnerRow {
    pub id: i64,
    pub epoch_id: i64,
    pub rank: i16,
    pub wallet_address: String,
    pub user_id: String,
    pub profit_lamports: i64,
    pub trade_count: i32,
    pub payout_lamports: i64,
    pub created_at: DateTime<Utc>,
}
