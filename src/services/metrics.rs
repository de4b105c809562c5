use lazy_static::lazy_static;
use prometheus::{register_counter, register_counter_vec, Counter, CounterVec};

use crate::error::AppError;

lazy_static! {
    pub static ref BOOKING_COMMITS_COUNTER: CounterVec = register_counter_vec!(
        "api_booking_commits_total",
        "Booking batches by outcome",
        &["status"]
    ).unwrap();

    pub static ref DAYS_BOOKED_COUNTER: Counter = register_counter!(
        "api_days_booked_total",
        "Days newly assigned through committed batches"
    ).unwrap();

    pub static ref DAYS_FREED_COUNTER: Counter = register_counter!(
        "api_days_freed_total",
        "Days freed by an admin"
    ).unwrap();

    pub static ref IMAMS_CREATED_COUNTER: Counter = register_counter!(
        "api_imams_created_total",
        "Imams created by an admin"
    ).unwrap();

    pub static ref ADMIN_LOGINS_COUNTER: CounterVec = register_counter_vec!(
        "api_admin_logins_total",
        "Admin login attempts by status",
        &["status"]
    ).unwrap();

    pub static ref ACCESS_CODE_CHECKS_COUNTER: CounterVec = register_counter_vec!(
        "api_access_code_checks_total",
        "Access code verifications by status",
        &["status"]
    ).unwrap();
}

/// Label value for an operation result in the counters above.
pub fn status_label<T>(result: &Result<T, AppError>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(AppError::Validation(_)) => "invalid",
        Err(AppError::NotFound(_)) => "not_found",
        Err(AppError::QuotaExceeded { .. }) => "quota_exceeded",
        Err(AppError::InvalidCredentials | AppError::InvalidSession | AppError::Forbidden) => {
            "denied"
        }
        Err(_) => "error",
    }
}
