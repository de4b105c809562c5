use axum::{extract::State, Json};

use crate::{error::AppError, models::schedule::Schedule, services::schedule::ScheduleService, AppState};

/// GET /api/schedule
pub async fn get_schedule(State(state): State<AppState>) -> Result<Json<Schedule>, AppError> {
    ScheduleService::build(state.store.as_ref()).await.map(Json)
}
