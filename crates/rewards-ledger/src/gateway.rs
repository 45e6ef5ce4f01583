use std::str::FromStr;
use std::sync::Arc;

use rewards_core::constants::{DRY_RUN_SIGNATURE, PAYOUT_SEND_MAX_RETRIES, WALLET_ADDRESS_MAX_LEN, WALLET_ADDRESS_MIN_LEN};
use rewards_core::error::GatewayError;
use rewards_core::types::{Lamports, PayoutPlanEntry};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcSendTransactionConfig;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::system_instruction;
use solana_sdk::transaction::Transaction;
use solana_transaction_status::UiTransactionEncoding;
use tracing::{info, warn};

use crate::fee_source::FeeClaimSource;
use crate::keypair::load_vault_keypair;

/// Configuration required for the Ledger Gateway to come up. All
/// four of `rpc_url`, `vault_private_key`, `token_mint`, `bags_api_key` are
/// required — absence of any one disables the engine cleanly at startup.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub rpc_url: Option<String>,
    pub vault_private_key: Option<String>,
    pub token_mint: Option<String>,
    pub bags_api_key: Option<String>,
    pub dry_run: bool,
    pub vault_reserve_lamports: Lamports,
}

impl GatewayConfig {
    fn required(&self) -> Option<(&str, &str, &str, &str)> {
        Some((
            self.rpc_url.as_deref()?,
            self.vault_private_key.as_deref()?,
            self.token_mint.as_deref()?,
            self.bags_api_key.as_deref()?,
        ))
    }
}

/// The Ledger Gateway. Owns the RPC client, the vault
/// keypair, and the fee-claim source port. Never touches the State Store —
/// every method here is a pure chain/HTTP operation; the settlement state
/// machine is responsible for durability around these calls.
pub struct LedgerGateway {
    rpc: RpcClient,
    vault: Keypair,
    token_mint: String,
    fee_source: Arc<dyn FeeClaimSource>,
    dry_run: bool,
    vault_reserve_lamports: Lamports,
}

impl LedgerGateway {
    /// Returns `Ok(None)` — not an error — when
    /// required configuration is absent, so the caller can disable the
    /// engine cleanly without any state mutation.
    pub async fn init(
        config: GatewayConfig,
        fee_source: Arc<dyn FeeClaimSource>,
    ) -> Result<Option<Self>, GatewayError> {
        let Some((rpc_url, vault_key, token_mint, _bags_api_key)) = config.required() else {
            warn!("ledger gateway not configured — missing one or more required variables");
            return Ok(None);
        };

        let vault = load_vault_keypair(vault_key)?;
        let rpc = RpcClient::new_with_commitment(rpc_url.to_string(), CommitmentConfig::confirmed());

        // Smoke call: confirm connectivity before declaring readiness.
        if let Err(e) = rpc.get_balance(&vault.pubkey()).await {
            warn!(error = %e, "ledger gateway smoke call failed — staying disabled");
            return Ok(None);
        }

        info!(vault = %vault.pubkey(), rpc_url, "ledger gateway ready");
        Ok(Some(Self {
            rpc,
            vault,
            token_mint: token_mint.to_string(),
            fee_source,
            dry_run: config.dry_run,
            vault_reserve_lamports: config.vault_reserve_lamports,
        }))
    }

    pub fn vault_address(&self) -> String {
        self.vault.pubkey().to_string()
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn vault_reserve_lamports(&self) -> Lamports {
        self.vault_reserve_lamports
    }

    pub async fn vault_balance(&self) -> Result<Lamports, GatewayError> {
        self.rpc
            .get_balance(&self.vault.pubkey())
            .await
            .map_err(|e| GatewayError::Transient(e.to_string()))
    }

    /// Enumerates claimable batches, submits
    /// one signed transaction per batch, and confirms each individually.
    /// A failing sub-transaction is logged and skipped, not propagated —
    /// the method still returns `ok=true` with whatever signatures
    /// succeeded, since a partial claim is recoverable by recomputing
    /// inflow from the balance delta.
    pub async fn claim_fees(&self) -> Result<(Vec<String>, bool), GatewayError> {
        let batches = self
            .fee_source
            .enumerate_claimable_batches(&self.token_mint)
            .await?;

        if batches.is_empty() {
            return Ok((Vec::new(), true));
        }

        let blockhash = self
            .rpc
            .get_latest_blockhash()
            .await
            .map_err(|e| GatewayError::Transient(e.to_string()))?;

        let mut signatures = Vec::with_capacity(batches.len());
        for batch in &batches {
            if batch.instructions.is_empty() {
                continue;
            }
            let tx = Transaction::new_signed_with_payer(
                &batch.instructions,
                Some(&self.vault.pubkey()),
                &[&self.vault],
                blockhash,
            );
            match self.rpc.send_and_confirm_transaction(&tx).await {
                Ok(sig) => signatures.push(sig.to_string()),
                Err(e) => warn!(error = %e, "claim sub-transaction failed — skipping"),
            }
        }

        Ok((signatures, true))
    }

    /// Pre-validates every entry
    /// before building the single batch transaction; any pre-validation
    /// failure returns `ok=false` without sending anything on-chain.
    pub async fn send_payout(
        &self,
        entries: &[PayoutPlanEntry],
    ) -> Result<(String, bool), GatewayError> {
        if self.dry_run {
            info!("dry run — suppressing on-chain payout transfer");
            return Ok((DRY_RUN_SIGNATURE.to_string(), true));
        }

        if let Err((index, reason)) = pre_validate_entries(entries) {
            warn!(index, reason, "payout entry pre-validation failed");
            return Ok((String::new(), false));
        }

        let instructions: Vec<_> = entries
            .iter()
            .map(|e| {
                let to = Pubkey::from_str(&e.wallet).expect("pre-validated above");
                system_instruction::transfer(&self.vault.pubkey(), &to, e.amount_lamports)
            })
            .collect();

        let mut last_err = None;
        for attempt in 0..PAYOUT_SEND_MAX_RETRIES.max(1) {
            let blockhash = self
                .rpc
                .get_latest_blockhash()
                .await
                .map_err(|e| GatewayError::Transient(e.to_string()))?;
            let tx = Transaction::new_signed_with_payer(
                &instructions,
                Some(&self.vault.pubkey()),
                &[&self.vault],
                blockhash,
            );
            match self
                .rpc
                .send_transaction_with_config(
                    &tx,
                    RpcSendTransactionConfig {
                        skip_preflight: false,
                        ..Default::default()
                    },
                )
                .await
            {
                Ok(sig) => {
                    return self.confirm_sent(sig).await;
                }
                Err(e) => {
                    warn!(attempt, error = %e, "sendPayout attempt failed");
                    last_err = Some(e);
                }
            }
        }

        Err(GatewayError::Permanent(format!(
            "sendPayout exhausted retries: {}",
            last_err.map(|e| e.to_string()).unwrap_or_default()
        )))
    }

    async fn confirm_sent(&self, sig: Signature) -> Result<(String, bool), GatewayError> {
        match self.rpc.confirm_transaction(&sig).await {
            Ok(true) => Ok((sig.to_string(), true)),
            Ok(false) => Ok((sig.to_string(), false)),
            Err(e) => Err(GatewayError::Transient(e.to_string())),
        }
    }

    /// Checks confirmation
    /// status first; falls back to a direct transaction lookup, since a
    /// signature can confirm and then age out of the status cache.
    pub async fn verify_transaction(&self, signature: &str) -> Result<bool, GatewayError> {
        if signature == DRY_RUN_SIGNATURE {
            return Ok(true);
        }

        let sig = Signature::from_str(signature)
            .map_err(|e| GatewayError::Permanent(format!("malformed signature: {e}")))?;

        if let Ok(Some(status)) = self.rpc.get_signature_status(&sig).await {
            return Ok(status.is_ok());
        }

        match self
            .rpc
            .get_transaction(&sig, UiTransactionEncoding::Json)
            .await
        {
            Ok(tx) => Ok(tx
                .transaction
                .meta
                .map(|meta| meta.status.is_ok())
                .unwrap_or(false)),
            Err(_) => Ok(false),
        }
    }

    /// A conservative overestimate
    /// covering base signature fee + per-transfer cost + slack.
    pub fn estimate_payout_fee(&self, n: usize) -> Lamports {
        const BASE_SIGNATURE_FEE: Lamports = 5_000;
        const PER_TRANSFER_OVERHEAD: Lamports = 200;
        const SLACK: Lamports = 10_000;
        BASE_SIGNATURE_FEE + PER_TRANSFER_OVERHEAD * n as Lamports + SLACK
    }
}

/// Pre-validation rule: strictly positive
/// amount, amount within safe wire-encoding range, wallet matches chain
/// address syntax.
fn pre_validate_entries(entries: &[PayoutPlanEntry]) -> Result<(), (usize, &'static str)> {
    for (i, e) in entries.iter().enumerate() {
        if e.amount_lamports == 0 {
            return Err((i, "amount must be strictly positive"));
        }
        if e.wallet.len() < WALLET_ADDRESS_MIN_LEN || e.wallet.len() > WALLET_ADDRESS_MAX_LEN {
            return Err((i, "wallet address length out of range"));
        }
        if Pubkey::from_str(&e.wallet).is_err() {
            return Err((i, "wallet is not a valid chain address"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(wallet: &str, amount: Lamports) -> PayoutPlanEntry {
        PayoutPlanEntry {
            rank: 1,
            wallet: wallet.to_string(),
            amount_lamports: amount,
            user_id: "u1".to_string(),
            profit_lamports: 10,
            trade_count: 3,
        }
    }

    #[test]
    fn pre_validate_rejects_zero_amount() {
        let entries = vec![entry("11111111111111111111111111111111", 0)];
        assert!(pre_validate_entries(&entries).is_err());
    }

    #[test]
    fn pre_validate_rejects_bad_address() {
        let entries = vec![entry("not-an-address", 100)];
        assert!(pre_validate_entries(&entries).is_err());
    }

    #[test]
    fn pre_validate_accepts_well_formed_entries() {
        let entries = vec![entry("11111111111111111111111111111111", 100)];
        assert!(pre_validate_entries(&entries).is_ok());
    }
}
