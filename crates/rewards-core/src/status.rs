use serde::{Deserialize, Serialize};
use std::fmt;

/// Epoch lifecycle status. Forms a DAG with terminal sinks
/// `completed` and `skipped`; `failed` is recoverable via a fresh `created`
/// cycle on the next tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpochStatus {
    Created,
    Claiming,
    Paying,
    Completed,
    Skipped,
    Failed,
}

impl EpochStatus {
    /// Terminal statuses never transition again; the cursor may advance past
    /// them.
    pub fn is_terminal(self) -> bool {
        matches!(self, EpochStatus::Completed | EpochStatus::Skipped)
    }

    /// Non-terminal statuses are candidates for the stuck-epoch recovery
    /// sweep once `updated_at` exceeds `STUCK_TIMEOUT_SECS`.
    pub fn is_in_flight(self) -> bool {
        matches!(self, EpochStatus::Claiming | EpochStatus::Paying)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EpochStatus::Created => "created",
            EpochStatus::Claiming => "claiming",
            EpochStatus::Paying => "paying",
            EpochStatus::Completed => "completed",
            EpochStatus::Skipped => "skipped",
            EpochStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "created" => EpochStatus::Created,
            "claiming" => EpochStatus::Claiming,
            "paying" => EpochStatus::Paying,
            "completed" => EpochStatus::Completed,
            "skipped" => EpochStatus::Skipped,
            "failed" => EpochStatus::Failed,
            _ => return None,
        })
    }
}

impl fmt::Display for EpochStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Well-known `failureReason` values written by the state machine. Not an
/// exhaustive enum on the wire — stored as plain text — but centralized
/// here so every writer agrees on the spelling.
pub mod failure_reason {
    pub const INSUFFICIENT_ELIGIBLE_WALLETS: &str = "insufficient_eligible_wallets";
    pub const INSUFFICIENT_VAULT_BALANCE: &str = "insufficient_vault_balance";
    pub const STUCK_IN_CLAIMING_NO_BEFORE_BALANCE: &str = "stuck_in_claiming_no_before_balance";
    pub const STUCK_IN_PAYING_NO_PLAN: &str = "stuck_in_paying_no_plan";
}
