use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rewards_core::error::GatewayError;
use solana_sdk::instruction::Instruction;

/// One claimable batch returned by the upstream fee-claim SDK: a set of
/// instructions that, assembled into a single transaction and signed by the
/// vault, claim the accrued creator fees for one claimable position.
#[derive(Debug, Clone)]
pub struct ClaimBatch {
    pub instructions: Vec<Instruction>,
}

/// Trait boundary over the upstream fee-claim SDK. The engine
/// only depends on this narrow contract — enumerate what can be claimed for
/// a token mint, expressed as ready-to-sign instruction batches.
#[async_trait]
pub trait FeeClaimSource: Send + Sync {
    async fn enumerate_claimable_batches(&self, token_mint: &str) -> Result<Vec<ClaimBatch>, GatewayError>;
}

/// Production client for the upstream fee-claim service, authenticated with
/// `BAGS_API_KEY`. The wire format here — a JSON envelope
/// carrying bincode-serialized, base64-encoded instructions — is this
/// crate's own contract with that external service; the service itself is
/// out of scope for this core.
pub struct HttpFeeClaimSource {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(serde::Deserialize)]
struct ClaimableBatchWire {
    instructions_b64: Vec<String>,
}

#[derive(serde::Deserialize)]
struct EnumerateClaimableResponse {
    batches: Vec<ClaimableBatchWire>,
}

impl HttpFeeClaimSource {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }
}

#[async_trait]
impl FeeClaimSource for HttpFeeClaimSource {
    async fn enumerate_claimable_batches(&self, token_mint: &str) -> Result<Vec<ClaimBatch>, GatewayError> {
        let url = format!("{}/v1/claimable", self.base_url.trim_end_matches('/'));
        let resp = self
            .http
            .get(&url)
            .query(&[("mint", token_mint)])
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| GatewayError::Transient(format!("fee-claim SDK request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(GatewayError::Transient(format!(
                "fee-claim SDK returned status {}",
                resp.status()
            )));
        }

        let body: EnumerateClaimableResponse = resp
            .json()
            .await
            .map_err(|e| GatewayError::Permanent(format!("fee-claim SDK response malformed: {e}")))?;

        body.batches
            .into_iter()
            .map(|wire| decode_batch(&wire))
            .collect()
    }
}

fn decode_batch(wire: &ClaimableBatchWire) -> Result<ClaimBatch, GatewayError> {
    let instructions = wire
        .instructions_b64
        .iter()
        .map(|b64| {
            let bytes = BASE64
                .decode(b64)
                .map_err(|e| GatewayError::Permanent(format!("bad base64 instruction: {e}")))?;
            bincode::deserialize::<Instruction>(&bytes)
                .map_err(|e| GatewayError::Permanent(format!("bad instruction encoding: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ClaimBatch { instructions })
}

/// Deterministic fake used in settlement-layer tests: returns a fixed set of
/// batches regardless of the token mint argument.
pub struct FakeFeeClaimSource {
    pub batches: Vec<ClaimBatch>,
}

#[async_trait]
impl FeeClaimSource for FakeFeeClaimSource {
    async fn enumerate_claimable_batches(&self, _token_mint: &str) -> Result<Vec<ClaimBatch>, GatewayError> {
        Ok(self.batches.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fake_source_returns_configured_batches() {
        let source = FakeFeeClaimSource { batches: vec![] };
        let batches = source.enumerate_claimable_batches("mint").await.unwrap();
        assert!(batches.is_empty());
    }

    #[test]
    fn base64_decodes_full_final_chunk() {
        let decoded = BASE64.decode("TWFu").unwrap();
        assert_eq!(decoded, b"Man");
    }
}
