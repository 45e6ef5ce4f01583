use thiserror::Error;

/// Error taxonomy for the Ledger Gateway. Transient errors are caught by
/// the recovery sweep; permanent errors are treated as epoch failures by the
/// settlement state machine.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway not configured: {0}")]
    NotConfigured(String),

    #[error("transient RPC error: {0}")]
    Transient(String),

    #[error("permanent RPC error: {0}")]
    Permanent(String),

    #[error("pre-validation failed for payout entry {index}: {reason}")]
    InvalidPayoutEntry { index: usize, reason: String },
}

impl GatewayError {
    /// Whether this error should be treated as recoverable by a later tick
    /// rather than an immediate epoch failure.
    pub fn is_transient(&self) -> bool {
        matches!(self, GatewayError::Transient(_))
    }
}

/// Error taxonomy for the settlement core (state machine, pot accounting,
/// state store, query port). Grouped by subsystem, flat enum, one
/// `#[error(...)]` message per variant — mirrors `chronx_core::error::ChronxError`.
#[derive(Debug, Error)]
pub enum RewardsError {
    // ── State store ──────────────────────────────────────────────────────────
    #[error("database error: {0}")]
    Database(String),

    #[error("migration error: {0}")]
    Migration(String),

    #[error("rewards state singleton row is missing — database was not seeded")]
    MissingState,

    #[error("epoch not found: {0}")]
    EpochNotFound(String),

    // ── Leader / scheduler ───────────────────────────────────────────────────
    #[error("advisory lock connection unavailable")]
    LockConnectionLost,

    #[error("engine is not leader")]
    NotLeader,

    #[error("engine is not configured")]
    NotConfigured,

    #[error("a settlement tick is already in progress")]
    AlreadyProcessing,

    // ── Pot accounting / payout plan ─────────────────────────────────────────
    #[error("payout plan must contain exactly {expected} entries, got {got}")]
    PayoutPlanSizeMismatch { expected: usize, got: usize },

    #[error("invalid wallet address: {0}")]
    InvalidWalletAddress(String),

    #[error("payout amount out of range: {0}")]
    AmountOutOfRange(u64),

    // ── Ledger gateway ────────────────────────────────────────────────────────
    #[error("ledger gateway error: {0}")]
    Gateway(#[from] GatewayError),

    // ── General ───────────────────────────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

impl From<sqlx::Error> for RewardsError {
    fn from(e: sqlx::Error) -> Self {
        RewardsError::Database(e.to_string())
    }
}
