//! API Routes
//!
//! HTTP endpoint definitions: batch ingestion and the two read-only stats
//! endpoints.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::event::EventCandidate;
use crate::domain::Rejection;
use crate::error::AppError;
use crate::ingestion::IngestionFacade;
use crate::stats::{DefectLineStat, MachineHealth, StatsAggregator};

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub facade: Arc<IngestionFacade>,
    pub stats: Arc<StatsAggregator>,
}

// =========================================================================
// Request/Response types
// =========================================================================

/// The batch endpoint's body is a bare JSON array of event objects, not an
/// envelope — matches the wire contract, not the teacher's enveloped
/// request shape.
#[derive(Debug, Clone, Serialize)]
pub struct BatchResponse {
    pub accepted: usize,
    pub deduped: usize,
    pub updated: usize,
    pub rejected: usize,
    pub rejections: Vec<Rejection>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineStatsQuery {
    pub machine_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

fn default_limit() -> usize {
    10
}

/// `factory_id` here is not a filter: its mere presence selects factory-level
/// grouping for the ranking instead of the default per-machine grouping.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopDefectLinesQuery {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub factory_id: Option<String>,
}

// =========================================================================
// Handlers
// =========================================================================

async fn health_check() -> &'static str {
    "OK"
}

async fn ingest_batch(State(state): State<AppState>, Json(events): Json<Vec<EventCandidate>>) -> Json<BatchResponse> {
    let outcome = state.facade.process_batch(events).await;

    Json(BatchResponse {
        accepted: outcome.accepted,
        deduped: outcome.deduped,
        updated: outcome.updated,
        rejected: outcome.rejected,
        rejections: outcome.rejections,
    })
}

async fn machine_stats(
    State(state): State<AppState>,
    Query(query): Query<MachineStatsQuery>,
) -> Result<Json<MachineHealth>, AppError> {
    let health = state
        .stats
        .machine_stats(&query.machine_id, query.start, query.end)
        .await?;

    Ok(Json(health))
}

async fn top_defect_lines(
    State(state): State<AppState>,
    Query(query): Query<TopDefectLinesQuery>,
) -> Result<Json<Vec<DefectLineStat>>, AppError> {
    let lines = state
        .stats
        .top_defect_lines(query.from, query.to, query.factory_id.as_deref(), query.limit)
        .await?;

    Ok(Json(lines))
}

/// Build the application router. Paths are unprefixed (no `/api/v1`): the
/// wire contract names them literally as `/events/batch`, `/stats`, and
/// `/stats/top-defect-lines`.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/events/batch", post(ingest_batch))
        .route("/stats", get(machine_stats))
        .route("/stats/top-defect-lines", get(top_defect_lines))
        .with_state(state)
}
