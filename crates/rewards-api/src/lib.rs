//! rewards-api
//!
//! REST surface over the settlement engine: status, history, rules, manual
//! trigger, and leader probe — a plain REST router rather than JSON-RPC,
//! since the consumers here are dashboards and curl, not an RPC client.

pub mod routes;
pub mod server;
pub mod types;

pub use server::{build_router, AppState, RulesConfig};
