//! rewards-ledger
//!
//! The Ledger Gateway: claims creator fees, reads the vault balance, signs
//! and sends the batch payout transfer, and verifies confirmation. Never
//! touches the State Store — durability around these calls is the
//! settlement state machine's job.

pub mod fee_source;
pub mod gateway;
pub mod keypair;

pub use fee_source::{ClaimBatch, FakeFeeClaimSource, FeeClaimSource, HttpFeeClaimSource};
pub use gateway::{GatewayConfig, LedgerGateway};
pub use keypair::load_vault_keypair;
