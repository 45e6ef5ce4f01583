use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use rewards_core::types::Lamports;
use rewards_settlement::{Scheduler, SettlementEngine};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::routes;

/// Static rules snapshot served by `GET /rules` — mirrors the
/// engine's own `EngineConfig` so the two never drift.
#[derive(Debug, Clone)]
pub struct RulesConfig {
    pub rewards_pool_bps: u32,
    pub min_trades: u32,
    pub vault_reserve_lamports: Lamports,
}

/// Shared server state. `engine`/`scheduler` are `None` when the ledger
/// gateway could not be configured at startup — the HTTP surface still comes up and reports the disabled
/// state rather than refusing to serve at all.
pub struct AppState {
    pub engine: Option<Arc<SettlementEngine>>,
    pub scheduler: Option<Arc<Scheduler>>,
    pub admin_secret: String,
    pub rules: RulesConfig,
}

/// Build the REST router. Permissive CORS, since this is an
/// operator/dashboard surface rather than a browser-facing public API.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    info!("building rewards-api router");

    Router::new()
        .route("/status", get(routes::status))
        .route("/history", get(routes::history))
        .route("/rules", get(routes::rules))
        .route("/run", post(routes::run))
        .route("/leader", get(routes::leader))
        .layer(ServiceBuilder::new().layer(cors))
        .with_state(state)
}
