use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use rewards_core::types::lamports_to_wire;
use rewards_store::state_store;
use serde_json::json;

use crate::server::AppState;
use crate::types::{
    EpochSummary, HistoryQuery, LeaderResponse, RulesResponse, RunResponse, StatusResponse,
};

type ApiError = (StatusCode, Json<serde_json::Value>);

fn err_body(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "error": message.into() })))
}

fn not_configured() -> ApiError {
    err_body(StatusCode::SERVICE_UNAVAILABLE, "settlement engine is not configured")
}

/// `GET /status`: engine status snapshot.
pub async fn status(State(state): State<Arc<AppState>>) -> Result<Json<StatusResponse>, ApiError> {
    let Some(engine) = state.engine.as_ref() else {
        return Ok(Json(StatusResponse {
            enabled: false,
            is_leader: false,
            dry_run: true,
            vault_balance_lamports: "0".to_string(),
            carry_rewards_lamports: "0".to_string(),
            treasury_accrued_lamports: "0".to_string(),
            last_processed_period_id: None,
            last_processed_period_end: None,
            last_epoch: None,
            processing: false,
        }));
    };

    let rewards_state = engine
        .store()
        .get_state()
        .await
        .map_err(|e| err_body(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let vault_balance = engine
        .gateway()
        .vault_balance()
        .await
        .map_err(|e| err_body(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let mut conn = engine
        .store()
        .pool()
        .acquire()
        .await
        .map_err(|e| err_body(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let last_epoch = match state_store::most_recent_history(&mut conn, 1)
        .await
        .map_err(|e| err_body(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .into_iter()
        .next()
    {
        Some(row) => {
            let winners = state_store::get_winners_for_epoch(&mut conn, row.epoch_id)
                .await
                .map_err(|e| err_body(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
            Some(EpochSummary::from_row(row, winners))
        }
        None => None,
    };

    let scheduler = state.scheduler.as_ref();

    Ok(Json(StatusResponse {
        enabled: true,
        is_leader: scheduler.map(|s| s.is_leader()).unwrap_or(false),
        dry_run: engine.gateway().dry_run(),
        vault_balance_lamports: lamports_to_wire(vault_balance),
        carry_rewards_lamports: lamports_to_wire(rewards_state.carry()),
        treasury_accrued_lamports: lamports_to_wire(rewards_state.treasury_accrued()),
        last_processed_period_id: rewards_state.last_processed_period_id,
        last_processed_period_end: rewards_state.last_processed_period_end.map(|t| t.to_rfc3339()),
        last_epoch,
        processing: scheduler.map(|s| s.is_processing()).unwrap_or(false),
    }))
}

/// `GET /history?limit=N`: most recent settled epochs, winners
/// attached and sorted by rank. `1 <= limit <= 100`, default 20.
pub async fn history(
    State(state): State<Arc<AppState>>,
    Query(q): Query<HistoryQuery>,
) -> Result<Json<Vec<EpochSummary>>, ApiError> {
    let engine = state.engine.as_ref().ok_or_else(not_configured)?;
    let limit = q.limit.unwrap_or(20).clamp(1, 100);

    let mut conn = engine
        .store()
        .pool()
        .acquire()
        .await
        .map_err(|e| err_body(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let rows = state_store::most_recent_history(&mut conn, limit)
        .await
        .map_err(|e| err_body(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let mut summaries = Vec::with_capacity(rows.len());
    for row in rows {
        let winners = state_store::get_winners_for_epoch(&mut conn, row.epoch_id)
            .await
            .map_err(|e| err_body(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
        summaries.push(EpochSummary::from_row(row, winners));
    }

    Ok(Json(summaries))
}

/// `GET /rules`: static configuration snapshot.
pub async fn rules(State(state): State<Arc<AppState>>) -> Json<RulesResponse> {
    Json(RulesResponse {
        rewards_pool_bps: state.rules.rewards_pool_bps,
        min_trades: state.rules.min_trades,
        vault_reserve_lamports: lamports_to_wire(state.rules.vault_reserve_lamports),
        ..RulesResponse::default()
    })
}

/// `GET /leader`.
pub async fn leader(State(state): State<Arc<AppState>>) -> Json<LeaderResponse> {
    Json(LeaderResponse {
        is_leader: state.scheduler.as_ref().map(|s| s.is_leader()).unwrap_or(false),
    })
}

/// `POST /run`: manual trigger, requires the admin secret header.
pub async fn run(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<RunResponse>, ApiError> {
    let provided = headers
        .get("x-admin-secret")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if provided.is_empty() || provided != state.admin_secret {
        return Err(err_body(StatusCode::UNAUTHORIZED, "invalid admin secret"));
    }

    let scheduler = state.scheduler.as_ref().ok_or_else(not_configured)?;

    match scheduler.trigger_manual().await {
        Ok(outcome) => Ok(Json(RunResponse {
            ok: true,
            message: format!("{:?}", outcome),
        })),
        Err(rewards_core::error::RewardsError::NotLeader) => Ok(Json(RunResponse {
            ok: false,
            message: "not leader".to_string(),
        })),
        Err(rewards_core::error::RewardsError::AlreadyProcessing) => Ok(Json(RunResponse {
            ok: false,
            message: "a settlement tick is already in progress".to_string(),
        })),
        Err(e) => Err(err_body(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}
