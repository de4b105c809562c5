pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::{
        admin::{AdminUser, SessionRecord},
        booking::{BookingMap, CommitOutcome},
        imam::{Imam, NewImam},
        settings::SettingsMap,
    },
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Authoritative storage for settings, imams, bookings and admin sessions.
///
/// Implementations guarantee one imam per day-key and one imam per access code,
/// and remove an imam's bookings together with the imam.
#[async_trait]
pub trait Store: Send + Sync {
    async fn ping(&self) -> Result<(), AppError>;

    async fn settings(&self) -> Result<SettingsMap, AppError>;
    async fn put_setting(&self, key: &str, value: &str) -> Result<(), AppError>;

    /// Newest first.
    async fn list_imams(&self) -> Result<Vec<Imam>, AppError>;
    async fn find_imam(&self, id: i64) -> Result<Option<Imam>, AppError>;
    async fn find_imam_by_code(&self, access_code: &str) -> Result<Option<Imam>, AppError>;
    async fn access_code_exists(&self, access_code: &str) -> Result<bool, AppError>;
    /// Returns `None` when the access code is already taken.
    async fn insert_imam(&self, imam: &NewImam) -> Result<Option<Imam>, AppError>;
    /// Returns `false` when no such imam exists.
    async fn delete_imam(&self, id: i64) -> Result<bool, AppError>;

    async fn bookings(&self) -> Result<BookingMap, AppError>;
    /// Quota check and upserts in one transaction; nothing is written on error.
    async fn commit_bookings(&self, imam_id: i64, dates: &[String]) -> Result<CommitOutcome, AppError>;
    /// Returns the previous owner, `None` when the day was free.
    async fn delete_booking(&self, date_key: &str) -> Result<Option<i64>, AppError>;

    async fn find_admin(&self, username: &str) -> Result<Option<AdminUser>, AppError>;
    async fn insert_admin(&self, username: &str, password_hash: &str) -> Result<AdminUser, AppError>;
    async fn insert_session(
        &self,
        admin_id: i64,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError>;
    /// Expired sessions are returned as well; callers compare `expires_at`.
    async fn find_session(&self, token_hash: &str) -> Result<Option<SessionRecord>, AppError>;
    async fn delete_session(&self, token_hash: &str) -> Result<(), AppError>;
    /// Deletes sessions that expired before `now`, optionally for one admin only.
    async fn purge_expired_sessions(
        &self,
        admin_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<u64, AppError>;
}

pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Run the migrations embedded from ./migrations/
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Postgres when a database URL is configured, otherwise a process-local store.
pub async fn connect(database_url: Option<&str>) -> anyhow::Result<Arc<dyn Store>> {
    match database_url {
        Some(url) => {
            let pool = create_pool(url).await?;
            run_migrations(&pool).await?;
            tracing::info!("Database connected and migrations applied");
            Ok(Arc::new(PgStore::new(pool)))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store (data is lost on restart)");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
