//! rewards-query
//!
//! Read-only queries against tables the core does not own: the leaderboard
//! period table, the trade-history table, and the user table. The core
//! consumes them only through this narrow interface.

use chrono::{DateTime, Utc};
use rewards_core::address::is_valid_wallet_address;
use rewards_core::error::RewardsError;
use rewards_core::types::WalletProfit;
use sqlx::PgPool;

/// One externally defined leaderboard period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Period {
    pub period_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Read-only query port over the leaderboard, trade-history, and user
/// tables. Holds a plain pool reference — query methods never open a
/// transaction, since they only ever read.
#[derive(Clone)]
pub struct QueryPort {
    pool: PgPool,
}

impl QueryPort {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The next leaderboard period to settle.
    ///
    /// Normal mode (`last_end` is `Some`): the period with the smallest
    /// `end_time` strictly greater than `last_end`, restricted to periods
    /// that have already ended. Ties broken by `end_time` ascending.
    ///
    /// First-run mode (`last_end` is `None`): the most recently ended
    /// period instead — every earlier period is permanently skipped. This is
    /// documented, deliberate behavior, not an oversight.
    pub async fn next_period_to_process(
        &self,
        last_end: Option<DateTime<Utc>>,
    ) -> Result<Option<Period>, RewardsError> {
        let row = match last_end {
            Some(last_end) => {
                sqlx::query_as::<_, (String, DateTime<Utc>, DateTime<Utc>)>(
                    "SELECT period_id, start_time, end_time
                     FROM leaderboard_periods
                     WHERE end_time > $1 AND end_time <= now()
                     ORDER BY end_time ASC
                     LIMIT 1",
                )
                .bind(last_end)
                .fetch_optional(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, (String, DateTime<Utc>, DateTime<Utc>)>(
                    "SELECT period_id, start_time, end_time
                     FROM leaderboard_periods
                     WHERE end_time <= now()
                     ORDER BY end_time DESC
                     LIMIT 1",
                )
                .fetch_optional(&self.pool)
                .await?
            }
        };

        Ok(row.map(|(period_id, start_time, end_time)| Period {
            period_id,
            start_time,
            end_time,
        }))
    }

    /// Look up a single period by id. Used by the recovery path to
    /// re-derive `periodEnd` for an epoch that is being resolved
    /// without having gone through `next_period_to_process` this tick.
    pub async fn get_period_by_id(&self, period_id: &str) -> Result<Option<Period>, RewardsError> {
        let row = sqlx::query_as::<_, (String, DateTime<Utc>, DateTime<Utc>)>(
            "SELECT period_id, start_time, end_time FROM leaderboard_periods WHERE period_id = $1",
        )
        .bind(period_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(period_id, start_time, end_time)| Period {
            period_id,
            start_time,
            end_time,
        }))
    }

    /// Top wallets by realized profit in `[start, end)`.
    ///
    /// Groups closed trades by wallet address, filters to
    /// `trade_count >= min_trades`, `sum_profit > 0`, and a syntactically
    /// valid chain address, orders by `sum_profit` descending breaking ties
    /// by `trade_count` descending then `wallet` ascending for
    /// determinism, and returns at most `limit`.
    pub async fn top_wallets_for_period(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        min_trades: u32,
        limit: u32,
    ) -> Result<Vec<WalletProfit>, RewardsError> {
        // Over-fetch a little past `limit` so the address-syntax filter
        // (applied in Rust, since base58 validation isn't expressible as a
        // plain SQL predicate) can drop a few rows without starving the
        // result below `limit` in the common case.
        let fetch_limit = (limit as i64).max(3) * 4;

        let rows: Vec<(String, String, i64, i32)> = sqlx::query_as(
            "SELECT
                t.wallet_address,
                (array_agg(t.user_id ORDER BY t.closed_at DESC))[1] AS user_id,
                SUM(t.profit_lamports)::BIGINT AS sum_profit,
                COUNT(*)::INT AS trade_count
             FROM trades t
             WHERE t.closed_at >= $1 AND t.closed_at < $2
             GROUP BY t.wallet_address
             HAVING COUNT(*) >= $3 AND SUM(t.profit_lamports) > 0
             ORDER BY sum_profit DESC, trade_count DESC, t.wallet_address ASC
             LIMIT $4",
        )
        .bind(start)
        .bind(end)
        .bind(min_trades as i64)
        .bind(fetch_limit)
        .fetch_all(&self.pool)
        .await?;

        let wallets: Vec<WalletProfit> = rows
            .into_iter()
            .filter(|(wallet, _, _, _)| is_valid_wallet_address(wallet))
            .take(limit as usize)
            .map(|(wallet_address, user_id, sum_profit, trade_count)| WalletProfit {
                wallet_address,
                user_id,
                sum_profit_lamports: sum_profit as u64,
                trade_count: trade_count as u32,
            })
            .collect();

        Ok(wallets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_equality() {
        let now = Utc::now();
        let a = Period {
            period_id: "p1".into(),
            start_time: now,
            end_time: now,
        };
        let b = a.clone();
        assert_eq!(a, b);
    }
}
