use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::{
    error::AppError,
    middleware::{auth::AdminSession, json::ApiJson},
    models::settings::{SettingsMap, UpdateStartDateRequest},
    services::settings::SettingsService,
    AppState,
};

/// GET /api/settings (public)
pub async fn get_settings(State(state): State<AppState>) -> Result<Json<SettingsMap>, AppError> {
    SettingsService::all(state.store.as_ref()).await.map(Json)
}

/// PUT /api/settings/ramadhan-start (admin only)
pub async fn update_start_date(
    State(state): State<AppState>,
    session: AdminSession,
    ApiJson(body): ApiJson<UpdateStartDateRequest>,
) -> Result<Json<Value>, AppError> {
    let date = SettingsService::set_start_date(state.store.as_ref(), body.date.as_deref()).await?;
    tracing::info!("start date changed by {}", session.username);
    Ok(Json(json!({ "success": true, "date": date })))
}
