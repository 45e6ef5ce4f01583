use rewards_core::error::GatewayError;
use solana_sdk::signature::Keypair;
use solana_sdk::signer::Signer;

/// Load the vault keypair from `REWARDS_VAULT_PRIVATE_KEY`.
/// Accepts the two conventional Solana CLI encodings: a JSON byte array
/// (`[12, 34, ...]`, 64 bytes) or a base58-encoded 64-byte secret key.
pub fn load_vault_keypair(raw: &str) -> Result<Keypair, GatewayError> {
    let trimmed = raw.trim();

    let bytes = if trimmed.starts_with('[') {
        let values: Vec<u8> = serde_json::from_str(trimmed)
            .map_err(|e| GatewayError::NotConfigured(format!("invalid keypair JSON: {e}")))?;
        values
    } else {
        bs58::decode(trimmed)
            .into_vec()
            .map_err(|e| GatewayError::NotConfigured(format!("invalid keypair base58: {e}")))?
    };

    let keypair = Keypair::from_bytes(&bytes)
        .map_err(|e| GatewayError::NotConfigured(format!("malformed keypair bytes: {e}")))?;

    tracing::info!(vault = %keypair.pubkey(), "loaded vault keypair");
    Ok(keypair)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_garbage_json() {
        assert!(load_vault_keypair("[1, 2, \"x\"]").is_err());
    }

    #[test]
    fn rejects_garbage_base58() {
        assert!(load_vault_keypair("not-valid-base58-!!!").is_err());
    }
}
