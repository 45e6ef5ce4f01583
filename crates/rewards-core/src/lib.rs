//! rewards-core
//!
//! Shared types, error taxonomy, and protocol constants for the rewards
//! settlement engine. Every other crate in this workspace depends on this
//! one; it has no dependency on any other workspace crate.

pub mod address;
pub mod constants;
pub mod error;
pub mod status;
pub mod types;

pub use constants::{REWARD_SPLIT_BPS, REWARD_SPLIT_PCT};
pub use error::{GatewayError, RewardsError};
pub use status::EpochStatus;
pub use types::{Lamports, PayoutPlanEntry, WinnerRecord};
