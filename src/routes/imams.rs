use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::{
    error::AppError,
    middleware::{auth::AdminSession, json::ApiJson},
    models::imam::{CreateImamRequest, Imam, ImamProfile},
    services::imams::ImamService,
    AppState,
};

/// GET /api/imams (public profiles, no access codes)
pub async fn list_imams(State(state): State<AppState>) -> Result<Json<Vec<ImamProfile>>, AppError> {
    ImamService::list_public(state.store.as_ref()).await.map(Json)
}

/// GET /api/admin/imams
pub async fn list_imams_admin(
    State(state): State<AppState>,
    _session: AdminSession,
) -> Result<Json<Vec<Imam>>, AppError> {
    ImamService::list(state.store.as_ref()).await.map(Json)
}

pub async fn create_imam(
    State(state): State<AppState>,
    _session: AdminSession,
    ApiJson(body): ApiJson<CreateImamRequest>,
) -> Result<(StatusCode, Json<Imam>), AppError> {
    let imam = ImamService::create(state.store.as_ref(), &body).await?;
    Ok((StatusCode::CREATED, Json(imam)))
}

pub async fn delete_imam(
    State(state): State<AppState>,
    session: AdminSession,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    ImamService::delete(state.store.as_ref(), id).await?;
    tracing::info!("Admin {} deleted imam {id}", session.username);
    Ok(Json(json!({ "success": true })))
}
