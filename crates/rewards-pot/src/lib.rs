//! rewards-pot
//!
//! Pure pot-accounting functions: inflow split, pot composition, and
//! payout-plan construction with a remainder-to-last dust rule. No I/O, no
//! async — every function here is a total function of its arguments, which
//! is what makes the quantified conservation invariants provable by property
//! testing rather than by exercising the whole state machine.

use rewards_core::constants::{BPS_DENOMINATOR, REWARD_SPLIT_BPS, WINNER_COUNT};
use rewards_core::types::{Lamports, PayoutPlanEntry, WalletProfit};

/// Split a period's total fee inflow between the rewards pool and the
/// treasury, per `poolBps`.
///
/// `rewardInflow = floor(totalInflow * poolBps / 10_000)`,
/// `treasuryInflow = totalInflow - rewardInflow`. Both are non-negative by
/// construction; if `totalInflow` is zero, both are zero.
pub fn split_inflow(total_inflow: Lamports, pool_bps: u32) -> (Lamports, Lamports) {
    let total = total_inflow as u128;
    let bps = pool_bps.min(BPS_DENOMINATOR) as u128;
    let reward_inflow = (total * bps / BPS_DENOMINATOR as u128) as Lamports;
    let treasury_inflow = total_inflow - reward_inflow;
    (reward_inflow, treasury_inflow)
}

/// Compose this epoch's total pot from the carried-forward balance and the
/// fresh reward inflow.
pub fn compose_pot(carry_in: Lamports, reward_inflow: Lamports) -> Lamports {
    carry_in + reward_inflow
}

/// Build the ordered, exactly-3-entry payout plan for `total_pot`, given the
/// top 3 wallets by profit for the period.
///
/// Amounts use the fixed split `REWARD_SPLIT_BPS` with a remainder-to-last
/// rule: `a1 = floor(pot*w1)`, `a2 = floor(pot*w2)`, `a3 = pot - a1 - a2`.
/// This guarantees `a1 + a2 + a3 == total_pot` exactly — no dust is ever
/// lost or left unaccounted for.
///
/// # Panics
/// Panics if `top.len() != WINNER_COUNT`. Callers are expected to have
/// already checked eligibility.
pub fn build_payout_plan(total_pot: Lamports, top: &[WalletProfit]) -> [PayoutPlanEntry; WINNER_COUNT] {
    assert_eq!(
        top.len(),
        WINNER_COUNT,
        "build_payout_plan requires exactly {WINNER_COUNT} candidate wallets"
    );

    let pot = total_pot as u128;
    let a1 = (pot * REWARD_SPLIT_BPS[0] as u128 / BPS_DENOMINATOR as u128) as Lamports;
    let a2 = (pot * REWARD_SPLIT_BPS[1] as u128 / BPS_DENOMINATOR as u128) as Lamports;
    let a3 = total_pot - a1 - a2;

    let amounts = [a1, a2, a3];

    std::array::from_fn(|i| PayoutPlanEntry {
        rank: (i + 1) as u8,
        wallet: top[i].wallet_address.clone(),
        amount_lamports: amounts[i],
        user_id: top[i].user_id.clone(),
        profit_lamports: top[i].sum_profit_lamports,
        trade_count: top[i].trade_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wallet(addr: &str, profit: Lamports, trades: u32) -> WalletProfit {
        WalletProfit {
            wallet_address: addr.to_string(),
            user_id: format!("user-{addr}"),
            sum_profit_lamports: profit,
            trade_count: trades,
        }
    }

    #[test]
    fn split_inflow_basic() {
        let (reward, treasury) = split_inflow(200_000_000, 5_000);
        assert_eq!(reward, 100_000_000);
        assert_eq!(treasury, 100_000_000);
    }

    #[test]
    fn split_inflow_zero() {
        assert_eq!(split_inflow(0, 5_000), (0, 0));
    }

    #[test]
    fn compose_pot_sums_carry_and_reward() {
        assert_eq!(compose_pot(1_000, 2_000), 3_000);
    }

    #[test]
    fn build_payout_plan_s1_happy_path() {
        let top = vec![
            wallet("W1", 10, 4),
            wallet("W2", 5, 3),
            wallet("W3", 3, 3),
        ];
        let plan = build_payout_plan(100_000_000, &top);
        assert_eq!(plan[0].amount_lamports, 50_000_000);
        assert_eq!(plan[1].amount_lamports, 30_000_000);
        assert_eq!(plan[2].amount_lamports, 20_000_000);
    }

    #[test]
    #[should_panic]
    fn build_payout_plan_requires_exactly_three() {
        let top = vec![wallet("W1", 10, 4)];
        let _ = build_payout_plan(100, &top);
    }

    proptest::proptest! {
        #[test]
        fn prop_split_inflow_reward_plus_treasury_equals_total(total in 0u64..u64::MAX, bps in 0u32..=10_000u32) {
            let (reward, treasury) = split_inflow(total, bps);
            proptest::prop_assert_eq!(reward as u128 + treasury as u128, total as u128);
            proptest::prop_assert_eq!(reward, ((total as u128 * bps as u128) / 10_000) as Lamports);
        }

        #[test]
        fn prop_build_payout_plan_sums_to_pot_and_is_nonincreasing(pot in 0u64..(1u64 << 62)) {
            let top = vec![
                wallet("W1", 10, 4),
                wallet("W2", 5, 3),
                wallet("W3", 3, 3),
            ];
            let plan = build_payout_plan(pot, &top);
            let sum: u128 = plan.iter().map(|e| e.amount_lamports as u128).sum();
            proptest::prop_assert_eq!(sum, pot as u128);
            proptest::prop_assert!(plan[0].amount_lamports >= plan[1].amount_lamports);
            proptest::prop_assert!(plan[1].amount_lamports >= plan[2].amount_lamports);
        }
    }
}
