use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::{
    error::AppError,
    middleware::{
        auth::AdminSession,
        client_ip::ClientIp,
        json::ApiJson,
        rate_limit::check_rate_limit,
    },
    models::{
        admin::{LoginRequest, LoginResponse},
        imam::{ImamProfile, VerifyAccessCodeRequest},
    },
    services::{auth::AuthService, imams::ImamService},
    AppState,
};

/// POST /api/admin/login
pub async fn login(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let rate_key = format!("login:{ip}");
    check_rate_limit(state.limiter.as_ref(), &rate_key).await?;

    tracing::info!(
        "Admin login attempt for username {:?} from {ip}",
        body.username.as_deref().unwrap_or_default()
    );

    let result = AuthService::login(
        state.store.as_ref(),
        body.username.as_deref(),
        body.password.as_deref(),
        state.config.session_ttl_hours,
    )
    .await;

    if matches!(result, Err(AppError::InvalidCredentials)) {
        state.limiter.record_failure(&rate_key).await;
    }
    result.map(Json)
}

/// POST /api/admin/logout
pub async fn logout(
    State(state): State<AppState>,
    session: AdminSession,
) -> Result<Json<Value>, AppError> {
    AuthService::logout(state.store.as_ref(), &session.token).await?;
    tracing::info!("Admin logout successful for {}", session.username);
    Ok(Json(json!({ "success": true })))
}

/// GET /api/admin/verify
pub async fn verify(session: AdminSession) -> Json<Value> {
    Json(json!({ "success": true, "username": session.username }))
}

/// POST /api/auth/verify: imam access-code check, rate limited per client.
pub async fn verify_access_code(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    ApiJson(body): ApiJson<VerifyAccessCodeRequest>,
) -> Result<Json<ImamProfile>, AppError> {
    let rate_key = format!("verify:{ip}");
    check_rate_limit(state.limiter.as_ref(), &rate_key).await?;

    let result = ImamService::verify_access_code(state.store.as_ref(), body.access_code.as_deref()).await;
    if matches!(result, Err(AppError::InvalidCredentials)) {
        tracing::warn!("invalid access code from {ip}");
        state.limiter.record_failure(&rate_key).await;
    }
    result.map(Json)
}
