//! ─── Rewards Engine Constants ───────────────────────────────────────────────
//!
//! Fixed, compile-time protocol parameters. Changing the payout split or the
//! winner count is a code change, not a runtime configuration.

/// Number of ranked winners paid out per settled epoch. Always exactly 3 —
/// three-or-none, never a partial payout.
pub const WINNER_COUNT: usize = 3;

/// Payout split in basis points, rank 1..=3. Sums to 10_000.
pub const REWARD_SPLIT_BPS: [u32; WINNER_COUNT] = [5_000, 3_000, 2_000];

/// Same split expressed as whole percent, for display purposes (`GET /rules`).
pub const REWARD_SPLIT_PCT: [u32; WINNER_COUNT] = [50, 30, 20];

/// Upper bound on `REWARDS_POOL_BPS` / basis-point fields generally.
pub const BPS_DENOMINATOR: u32 = 10_000;

/// Default rewards-pool share of claimed fees if `REWARDS_POOL_BPS` is unset.
pub const DEFAULT_REWARDS_POOL_BPS: u32 = 5_000;

/// Default minimum trades-closed per wallet to qualify for a payout.
pub const DEFAULT_MIN_TRADES: u32 = 3;

/// Default minimum balance to keep in the vault after a payout, in lamports.
pub const DEFAULT_VAULT_RESERVE_LAMPORTS: u64 = 50_000_000;

/// Sentinel transaction signature written when `REWARDS_DRY_RUN` suppresses
/// the on-chain transfer but the state machine still finalizes normally.
pub const DRY_RUN_SIGNATURE: &str = "DRY_RUN_NO_TX";

/// A non-terminal epoch older than this is considered stuck and is handed to
/// the recovery sweep at the start of the next tick.
pub const STUCK_TIMEOUT_SECS: i64 = 15 * 60;

/// Leader heartbeat period: how often the lock-holder re-confirms its session
/// connection is alive.
pub const LEADER_CHECK_MS: u64 = 30_000;

/// Settlement tick period: how often the scheduler attempts to process one
/// period, when leader.
pub const ENGINE_TICK_MS: u64 = 60_000;

/// Fixed 64-bit key for the session-scoped Postgres advisory lock that
/// implements single-leader exclusion. Arbitrary but fixed —
/// every replica must agree on the same key to contend for the same lock.
pub const LEADER_LOCK_KEY: i64 = 7_735_661_204_991_001;

/// Solana base58 address length bounds.
pub const WALLET_ADDRESS_MIN_LEN: usize = 32;
pub const WALLET_ADDRESS_MAX_LEN: usize = 44;

/// Maximum safe integer for callers that hand amounts to a transfer builder
/// expecting a native JS-style number.
/// This engine does not clamp against it (lamports amounts are kept as
/// native `u64` end to end) but callers constructing wire payloads for such
/// a builder MUST check against it explicitly.
pub const MAX_SAFE_JS_INTEGER: u64 = (1u64 << 53) - 1;

/// Small bounded retry count for the payout submission's client-side retry
/// loop.
pub const PAYOUT_SEND_MAX_RETRIES: usize = 3;
