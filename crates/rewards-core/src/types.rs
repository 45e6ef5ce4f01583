use serde::{Deserialize, Serialize};

/// Smallest integer unit of account on the target chain.
/// Kept as a plain `u64` alias — every monetary field in this engine is a
/// non-negative count of lamports, never a fractional amount.
pub type Lamports = u64;

/// Serialize a `Lamports` value as a decimal string — wire safety for 64-bit
/// integers across the JSON boundary.
pub fn lamports_to_wire(amount: Lamports) -> String {
    amount.to_string()
}

/// Parse a decimal-string lamports value received over the wire.
pub fn lamports_from_wire(s: &str) -> Result<Lamports, std::num::ParseIntError> {
    s.parse()
}

/// One entry of an Epoch's ordered, exactly-3-entry payout plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutPlanEntry {
    pub rank: u8,
    pub wallet: String,
    pub amount_lamports: Lamports,
    pub user_id: String,
    pub profit_lamports: Lamports,
    pub trade_count: u32,
}

/// A settled winner row. Distinct from `PayoutPlanEntry` in that
/// it is keyed to a persisted `epoch_id` rather than carried inline on the
/// epoch record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinnerRecord {
    pub epoch_id: i64,
    pub rank: u8,
    pub wallet_address: String,
    pub user_id: String,
    pub profit_lamports: Lamports,
    pub trade_count: u32,
    pub payout_lamports: Lamports,
}

impl From<(i64, &PayoutPlanEntry)> for WinnerRecord {
    fn from((epoch_id, entry): (i64, &PayoutPlanEntry)) -> Self {
        WinnerRecord {
            epoch_id,
            rank: entry.rank,
            wallet_address: entry.wallet.clone(),
            user_id: entry.user_id.clone(),
            profit_lamports: entry.profit_lamports,
            trade_count: entry.trade_count,
            payout_lamports: entry.amount_lamports,
        }
    }
}

/// A candidate wallet returned by the Query Port's top-N lookup,
/// before it has been assigned a rank or turned into a payout plan entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletProfit {
    pub wallet_address: String,
    pub user_id: String,
    pub sum_profit_lamports: Lamports,
    pub trade_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_round_trip() {
        let amount: Lamports = 123_456_789_012;
        let wire = lamports_to_wire(amount);
        assert_eq!(wire, "123456789012");
        assert_eq!(lamports_from_wire(&wire).unwrap(), amount);
    }
}
