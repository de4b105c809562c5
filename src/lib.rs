pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use db::Store;
use middleware::rate_limit::RateLimiter;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub limiter: Arc<dyn RateLimiter>,
    pub config: Arc<Config>,
}

/// Builds the HTTP API over `state`.
pub fn app(state: AppState) -> Router {
    let base_url = state.config.app_base_url.clone();
    let cors_origin = AllowOrigin::predicate(move |origin: &HeaderValue, _| {
        let Ok(o) = origin.to_str() else {
            return false;
        };
        // Always allow localhost / 127.0.0.1 for local development
        o.starts_with("http://localhost") || o.starts_with("http://127.0.0.1") || o == base_url
    });

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_origin(cors_origin);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::metrics::metrics_handler))
        // Admin session
        .route("/api/admin/login", post(routes::auth::login))
        .route("/api/admin/logout", post(routes::auth::logout))
        .route("/api/admin/verify", get(routes::auth::verify))
        .route("/api/admin/imams", get(routes::imams::list_imams_admin))
        // Settings
        .route("/api/settings", get(routes::settings::get_settings))
        .route("/api/settings/ramadhan-start", put(routes::settings::update_start_date))
        // Imams
        .route("/api/imams", get(routes::imams::list_imams).post(routes::imams::create_imam))
        .route("/api/imams/{id}", axum::routing::delete(routes::imams::delete_imam))
        .route("/api/auth/verify", post(routes::auth::verify_access_code))
        // Bookings
        .route("/api/bookings", get(routes::bookings::list_bookings).post(routes::bookings::commit_bookings))
        .route(
            "/api/bookings/{date_key}",
            put(routes::bookings::assign_day).delete(routes::bookings::remove_booking),
        )
        .route("/api/schedule", get(routes::schedule::get_schedule))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
