use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde_json::{json, Value};

use crate::{
    error::AppError,
    middleware::{auth::AdminSession, client_ip::ClientIp, json::ApiJson, rate_limit::check_rate_limit},
    models::booking::{AssignDayRequest, BookingMap, CommitBookingsRequest, CommitResponse},
    services::bookings::BookingService,
    AppState,
};

/// GET /api/bookings: `{ "2025-03-01": 7, ... }`
pub async fn list_bookings(State(state): State<AppState>) -> Result<Json<BookingMap>, AppError> {
    BookingService::list(state.store.as_ref()).await.map(Json)
}

/// POST /api/bookings. Callers need an admin session or the imam's own access code.
pub async fn commit_bookings(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    headers: HeaderMap,
    ApiJson(body): ApiJson<CommitBookingsRequest>,
) -> Result<Json<CommitResponse>, AppError> {
    let (Some(imam_id), Some(dates)) = (body.imam_id, body.dates.as_ref()) else {
        return Err(AppError::validation("Imam ID and dates array are required"));
    };

    let is_admin = match AdminSession::from_headers(&headers, &state).await {
        Ok(_) => true,
        Err(AppError::InvalidSession) => false,
        Err(e) => return Err(e),
    };

    if !is_admin {
        let rate_key = format!("verify:{ip}");
        check_rate_limit(state.limiter.as_ref(), &rate_key).await?;
        let auth = BookingService::authorize_imam(state.store.as_ref(), imam_id, body.access_code.as_deref()).await;
        if let Err(e) = auth {
            if matches!(e, AppError::InvalidCredentials) {
                state.limiter.record_failure(&rate_key).await;
            }
            return Err(e);
        }
    }

    let outcome = BookingService::commit(state.store.as_ref(), imam_id, dates).await?;
    Ok(Json(outcome.into()))
}

/// PUT /api/bookings/{date_key} (admin reassignment)
pub async fn assign_day(
    State(state): State<AppState>,
    session: AdminSession,
    Path(date_key): Path<String>,
    ApiJson(body): ApiJson<AssignDayRequest>,
) -> Result<Json<CommitResponse>, AppError> {
    let imam_id = body.imam_id.ok_or_else(|| AppError::validation("Imam ID is required"))?;
    let outcome = BookingService::assign_day(state.store.as_ref(), &date_key, imam_id).await?;
    tracing::info!("Admin {} assigned {date_key} to imam {imam_id}", session.username);
    Ok(Json(outcome.into()))
}

/// DELETE /api/bookings/{date_key}
pub async fn remove_booking(
    State(state): State<AppState>,
    session: AdminSession,
    Path(date_key): Path<String>,
) -> Result<Json<Value>, AppError> {
    BookingService::remove(state.store.as_ref(), &date_key).await?;
    tracing::info!("Admin {} deleted booking for date {date_key}", session.username);
    Ok(Json(json!({ "success": true, "message": "Booking deleted successfully" })))
}
