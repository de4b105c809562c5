use std::{net::SocketAddr, sync::Arc, time::Duration};

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jadwal_imam_api::{
    app,
    config::{Config, DEFAULT_ADMIN_PASSWORD},
    db,
    middleware::rate_limit::{MemoryRateLimiter, RateLimiter, RedisRateLimiter},
    services::auth::AuthService,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(Config::from_env()?);

    let store = db::connect(config.database_url.as_deref()).await?;

    let created = AuthService::ensure_default_admin(
        store.as_ref(),
        &config.default_admin_username,
        &config.default_admin_password,
        config.bcrypt_cost,
    )
    .await?;
    if created && config.default_admin_password == DEFAULT_ADMIN_PASSWORD {
        warn!("Default admin password is in use; set DEFAULT_ADMIN_PASSWORD before deploying");
    }

    let limiter: Arc<dyn RateLimiter> = match &config.redis_url {
        Some(url) => {
            let client = redis::Client::open(url.as_str())?;
            let conn = client.get_multiplexed_async_connection().await?;
            info!("Redis connected, login attempts shared across instances");
            Arc::new(RedisRateLimiter::new(
                conn,
                config.login_max_attempts,
                config.login_window_secs,
            ))
        }
        None => Arc::new(MemoryRateLimiter::new(
            config.login_max_attempts,
            Duration::from_secs(config.login_window_secs),
        )),
    };

    let state = AppState {
        store,
        limiter,
        config: config.clone(),
    };

    let addr = format!("{}:{}", config.host, config.port);
    info!("jadwal-imam API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
