//! rewards-node — the rewards-settlement engine binary.
//!
//! Startup sequence:
//!   1. Load configuration from the environment
//!   2. Open the state database and run migrations
//!   3. Initialize the Ledger Gateway — disable cleanly if not ready
//!   4. Build the settlement engine and leader/tick scheduler
//!   5. Start the REST API server
//!   6. Install timers and run one immediate tick

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use chrono::Duration;
use rewards_api::{build_router, AppState, RulesConfig};
use rewards_core::constants::{
    DEFAULT_MIN_TRADES, DEFAULT_REWARDS_POOL_BPS, DEFAULT_VAULT_RESERVE_LAMPORTS, STUCK_TIMEOUT_SECS,
};
use rewards_ledger::{GatewayConfig, HttpFeeClaimSource, LedgerGateway};
use rewards_query::QueryPort;
use rewards_settlement::{EngineConfig, Scheduler, SettlementEngine};
use rewards_store::{connect, migrate, StateStore};
use serde::Deserialize;
use tracing::{info, warn};

/// Environment configuration. Every field is read through `envy` into a
/// typed struct rather than scattering `std::env::var` calls through
/// startup.
#[derive(Debug, Deserialize)]
struct RewardsConfig {
    database_url: String,
    rewards_admin_secret: String,

    #[serde(default)]
    bind_addr: Option<String>,

    #[serde(default = "default_rewards_pool_bps")]
    rewards_pool_bps: u32,
    #[serde(default = "default_min_trades")]
    rewards_min_trades: u32,
    #[serde(default = "default_vault_reserve_lamports")]
    vault_reserve_lamports: u64,
    #[serde(default)]
    rewards_dry_run: bool,

    #[serde(default)]
    solana_rpc_url: Option<String>,
    #[serde(default)]
    rewards_vault_private_key: Option<String>,
    #[serde(default)]
    rewards_token_mint: Option<String>,
    #[serde(default)]
    bags_api_key: Option<String>,
    #[serde(default)]
    bags_api_base_url: Option<String>,
}

fn default_rewards_pool_bps() -> u32 {
    DEFAULT_REWARDS_POOL_BPS
}

fn default_min_trades() -> u32 {
    DEFAULT_MIN_TRADES
}

fn default_vault_reserve_lamports() -> u64 {
    DEFAULT_VAULT_RESERVE_LAMPORTS
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,rewards=debug".parse().unwrap()),
        )
        .init();

    let config: RewardsConfig = envy::from_env().context("loading configuration from environment")?;
    info!("rewards-node starting");

    // ── State database ────────────────────────────────────────────────────────
    let pool = connect(&config.database_url).await.context("connecting to state database")?;
    migrate(&pool).await.context("running migrations")?;
    let store = StateStore::new(pool.clone());
    let query = QueryPort::new(pool);

    // ── Ledger gateway — disable cleanly if not ready ─────────────────────────
    let gateway_config = GatewayConfig {
        rpc_url: config.solana_rpc_url.clone(),
        vault_private_key: config.rewards_vault_private_key.clone(),
        token_mint: config.rewards_token_mint.clone(),
        bags_api_key: config.bags_api_key.clone(),
        dry_run: config.rewards_dry_run,
        vault_reserve_lamports: config.vault_reserve_lamports,
    };
    let fee_source = Arc::new(HttpFeeClaimSource::new(
        config.bags_api_base_url.clone().unwrap_or_default(),
        config.bags_api_key.clone().unwrap_or_default(),
    ));
    let gateway = LedgerGateway::init(gateway_config, fee_source)
        .await
        .context("initializing ledger gateway")?
        .map(Arc::new);

    // ── Settlement engine + scheduler ─────────────────────────────────────────
    let rules = RulesConfig {
        rewards_pool_bps: config.rewards_pool_bps,
        min_trades: config.rewards_min_trades,
        vault_reserve_lamports: config.vault_reserve_lamports,
    };

    let (engine, scheduler) = match gateway {
        Some(gateway) => {
            let engine_config = EngineConfig {
                rewards_pool_bps: config.rewards_pool_bps,
                min_trades: config.rewards_min_trades,
                stuck_timeout: Duration::seconds(STUCK_TIMEOUT_SECS),
            };
            let engine = Arc::new(SettlementEngine::new(store, query, gateway, engine_config));
            let scheduler = Arc::new(Scheduler::new(engine.clone()));
            scheduler.start(&config.database_url).await.context("starting scheduler")?;
            (Some(engine), Some(scheduler))
        }
        None => {
            warn!("ledger gateway not configured — settlement engine disabled, serving status-only API");
            (None, None)
        }
    };

    // ── REST API server ────────────────────────────────────────────────────────
    let app_state = Arc::new(AppState {
        engine,
        scheduler,
        admin_secret: config.rewards_admin_secret,
        rules,
    });
    let router = build_router(app_state);

    let bind_addr: SocketAddr = config
        .bind_addr
        .unwrap_or_else(|| "0.0.0.0:8080".to_string())
        .parse()
        .context("parsing BIND_ADDR")?;

    info!(%bind_addr, "rewards-node ready");
    let listener = tokio::net::TcpListener::bind(bind_addr).await.context("binding HTTP listener")?;
    axum::serve(listener, router).await.context("serving HTTP")?;

    Ok(())
}
