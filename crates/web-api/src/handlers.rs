use crate::server::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use factor_pulse_data::{FactorRecord, SummaryRecord, UniverseEntry};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

const DEFAULT_HISTORY_LIMIT: i64 = 48;
const MAX_HISTORY_LIMIT: i64 = 1000;

fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_HISTORY_LIMIT).clamp(1, MAX_HISTORY_LIMIT)
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Full cross-section at the most recent computed timestamp.
///
/// # Errors
/// Returns `StatusCode::INTERNAL_SERVER_ERROR` on storage failure and
/// `StatusCode::NOT_FOUND` when no factors have been computed yet.
pub async fn latest_factors(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<FactorRecord>>, StatusCode> {
    let timestamp = state
        .factors
        .latest_timestamp()
        .await
        .map_err(|e| {
            error!(error = %e, "latest_timestamp failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::NOT_FOUND)?;

    let records = state.factors.cross_section(timestamp).await.map_err(|e| {
        error!(error = %e, "cross_section failed");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(Json(records))
}

/// Recent factor history for one symbol, newest first.
///
/// # Errors
/// Returns `StatusCode::INTERNAL_SERVER_ERROR` on storage failure and
/// `StatusCode::NOT_FOUND` for an unknown symbol.
pub async fn symbol_history(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<FactorRecord>>, StatusCode> {
    let records = state
        .factors
        .history(&symbol, clamp_limit(query.limit))
        .await
        .map_err(|e| {
            error!(error = %e, symbol, "history failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    if records.is_empty() {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(records))
}

/// Outliers at the most recent cross-section.
///
/// # Errors
/// Returns `StatusCode::INTERNAL_SERVER_ERROR` on storage failure and
/// `StatusCode::NOT_FOUND` when no factors exist.
pub async fn latest_outliers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<FactorRecord>>, StatusCode> {
    let timestamp = state
        .factors
        .latest_timestamp()
        .await
        .map_err(|e| {
            error!(error = %e, "latest_timestamp failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::NOT_FOUND)?;

    let records = state.factors.outliers(timestamp).await.map_err(|e| {
        error!(error = %e, "outliers failed");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(Json(records))
}

/// The current tracked universe, ranked by quote volume.
///
/// # Errors
/// Returns `StatusCode::INTERNAL_SERVER_ERROR` on storage failure.
pub async fn universe(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<UniverseEntry>>, StatusCode> {
    let entries = state.universe.latest().await.map_err(|e| {
        error!(error = %e, "universe failed");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(Json(entries))
}

/// Summary audit trail, newest first, sent and suppressed alike.
///
/// # Errors
/// Returns `StatusCode::INTERNAL_SERVER_ERROR` on storage failure.
pub async fn summaries(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<SummaryRecord>>, StatusCode> {
    let records = state
        .summaries
        .history(clamp_limit(query.limit))
        .await
        .map_err(|e| {
            error!(error = %e, "summaries failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    Ok(Json(records))
}
