//! rewards-store
//!
//! Durable state: the rewards-state singleton, per-period epoch records, and
//! per-epoch winners, backed by Postgres via `sqlx`. Also owns the
//! session-scoped advisory lock primitive consumed by the leader scheduler
//! — see `advisory_lock`.

pub mod advisory_lock;
pub mod models;
pub mod pool;
pub mod state_store;

pub use advisory_lock::AdvisoryLock;
pub use pool::{connect, migrate};
pub use state_store::{ClaimOutcome, StateStore};
