use rewards_core::constants::{REWARD_SPLIT_PCT, WINNER_COUNT};
use rewards_core::types::lamports_to_wire;
use rewards_store::models::{EpochRow, WinnerRow};
use serde::Serialize;

/// `GET /status` response. All 64-bit amounts are decimal
/// strings — wire safety for integers outside JS's safe range.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub enabled: bool,
    pub is_leader: bool,
    pub dry_run: bool,
    pub vault_balance_lamports: String,
    pub carry_rewards_lamports: String,
    pub treasury_accrued_lamports: String,
    pub last_processed_period_id: Option<String>,
    pub last_processed_period_end: Option<String>,
    pub last_epoch: Option<EpochSummary>,
    pub processing: bool,
}

/// `GET /history` response entry: one epoch with its winners
/// attached, sorted by rank.
#[derive(Debug, Serialize)]
pub struct EpochSummary {
    pub epoch_id: i64,
    pub leaderboard_period_id: String,
    pub status: String,
    pub failure_reason: Option<String>,
    pub total_inflow_lamports: Option<String>,
    pub reward_inflow_lamports: Option<String>,
    pub treasury_inflow_lamports: Option<String>,
    pub total_pot_lamports: Option<String>,
    pub total_paid_lamports: Option<String>,
    pub payout_tx_signature: Option<String>,
    pub claim_started_at: Option<String>,
    pub payout_completed_at: Option<String>,
    pub winners: Vec<WinnerSummary>,
}

#[derive(Debug, Serialize)]
pub struct WinnerSummary {
    pub rank: i16,
    pub wallet_address: String,
    pub user_id: String,
    pub profit_lamports: String,
    pub trade_count: i32,
    pub payout_lamports: String,
}

impl EpochSummary {
    pub fn from_row(row: EpochRow, winners: Vec<WinnerRow>) -> Self {
        EpochSummary {
            epoch_id: row.epoch_id,
            leaderboard_period_id: row.leaderboard_period_id,
            status: row.status,
            failure_reason: row.failure_reason,
            total_inflow_lamports: row.total_inflow.map(|v| lamports_to_wire(v as u64)),
            reward_inflow_lamports: row.reward_inflow.map(|v| lamports_to_wire(v as u64)),
            treasury_inflow_lamports: row.treasury_inflow.map(|v| lamports_to_wire(v as u64)),
            total_pot_lamports: row.total_pot.map(|v| lamports_to_wire(v as u64)),
            total_paid_lamports: row.total_paid.map(|v| lamports_to_wire(v as u64)),
            payout_tx_signature: row.payout_tx_signature,
            claim_started_at: row.claim_started_at.map(|t| t.to_rfc3339()),
            payout_completed_at: row.payout_completed_at.map(|t| t.to_rfc3339()),
            winners: winners
                .into_iter()
                .map(|w| WinnerSummary {
                    rank: w.rank,
                    wallet_address: w.wallet_address,
                    user_id: w.user_id,
                    profit_lamports: lamports_to_wire(w.profit_lamports as u64),
                    trade_count: w.trade_count,
                    payout_lamports: lamports_to_wire(w.payout_lamports as u64),
                })
                .collect(),
        }
    }
}

/// `GET /rules` response: static configuration snapshot.
#[derive(Debug, Serialize)]
pub struct RulesResponse {
    pub rewards_pool_bps: u32,
    pub min_trades: u32,
    pub winner_count: usize,
    pub split_pct: [u32; WINNER_COUNT],
    pub vault_reserve_lamports: String,
}

impl Default for RulesResponse {
    fn default() -> Self {
        RulesResponse {
            rewards_pool_bps: 0,
            min_trades: 0,
            winner_count: WINNER_COUNT,
            split_pct: REWARD_SPLIT_PCT,
            vault_reserve_lamports: "0".to_string(),
        }
    }
}

/// `POST /run` response.
#[derive(Debug, Serialize)]
pub struct RunResponse {
    pub ok: bool,
    pub message: String,
}

/// `GET /leader` response.
#[derive(Debug, Serialize)]
pub struct LeaderResponse {
    pub is_leader: bool,
}

#[derive(Debug, serde::Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}
