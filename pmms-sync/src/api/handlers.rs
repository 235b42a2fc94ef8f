//! HTTP request handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use pmms_common::events::HostCommand;
use serde::Serialize;
use tracing::{debug, error, warn};

use super::AppContext;
use crate::playback::EntitySnapshot;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
    port: u16,
    started_at: String,
    subscribers: usize,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    status: String,
}

#[derive(Debug, Serialize)]
pub struct AcceptedResponse {
    status: String,
    command: String,
}

#[derive(Debug, Serialize)]
pub struct EntitiesResponse {
    count: usize,
    entities: Vec<EntitySnapshot>,
}

type ApiError = (StatusCode, Json<StatusResponse>);

fn api_error(code: StatusCode, status: impl Into<String>) -> ApiError {
    (
        code,
        Json(StatusResponse {
            status: status.into(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health
pub async fn health(State(ctx): State<AppContext>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "pmms-sync".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        port: ctx.port,
        started_at: ctx.started_at.to_rfc3339(),
        subscribers: ctx.bus.subscriber_count(),
    })
}

/// POST /message - enqueue one host command
///
/// Accepted commands are processed later, in arrival order, by the engine
/// task; the response only confirms they were queued.
pub async fn post_message(
    State(ctx): State<AppContext>,
    payload: Result<Json<HostCommand>, JsonRejection>,
) -> Result<(StatusCode, Json<AcceptedResponse>), ApiError> {
    let Json(command) = payload.map_err(|rejection| {
        warn!("Rejected host message: {}", rejection.body_text());
        api_error(StatusCode::BAD_REQUEST, format!("error: {}", rejection.body_text()))
    })?;

    let name = command.name();
    debug!(command = name, handle = %command.handle(), "Host message received");

    ctx.engine.submit(command).map_err(|e| {
        error!("Failed to enqueue host message: {}", e);
        api_error(StatusCode::SERVICE_UNAVAILABLE, format!("error: {}", e))
    })?;

    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedResponse {
            status: "queued".to_string(),
            command: name.to_string(),
        }),
    ))
}

/// GET /entities - registry snapshot
pub async fn get_entities(
    State(ctx): State<AppContext>,
) -> Result<Json<EntitiesResponse>, ApiError> {
    let entities = ctx.engine.snapshot().await.map_err(|e| {
        error!("Failed to read registry snapshot: {}", e);
        api_error(StatusCode::SERVICE_UNAVAILABLE, format!("error: {}", e))
    })?;

    Ok(Json(EntitiesResponse {
        count: entities.len(),
        entities,
    }))
}
