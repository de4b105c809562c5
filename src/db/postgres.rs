use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::{
    db::Store,
    error::AppError,
    models::{
        admin::{AdminUser, SessionRecord},
        booking::{BookingMap, CommitOutcome},
        imam::{Imam, NewImam},
        settings::SettingsMap,
    },
    services::quota::{normalize_keys, plan_commit},
};

const IMAM_COLUMNS: &str = "i.id, i.name, i.access_code, i.quota, i.created_at,
    (SELECT COUNT(*) FROM bookings b WHERE b.imam_id = i.id) AS booked";

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn settings(&self) -> Result<SettingsMap, AppError> {
        let rows: Vec<(String, String)> = sqlx::query_as("SELECT key, value FROM settings")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().collect())
    }

    async fn put_setting(&self, key: &str, value: &str) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO settings (key, value, updated_at)
             VALUES ($1, $2, NOW())
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_imams(&self) -> Result<Vec<Imam>, AppError> {
        let imams = sqlx::query_as::<_, Imam>(&format!(
            "SELECT {IMAM_COLUMNS} FROM imams i ORDER BY i.created_at DESC, i.id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(imams)
    }

    async fn find_imam(&self, id: i64) -> Result<Option<Imam>, AppError> {
        let imam = sqlx::query_as::<_, Imam>(&format!(
            "SELECT {IMAM_COLUMNS} FROM imams i WHERE i.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(imam)
    }

    async fn find_imam_by_code(&self, access_code: &str) -> Result<Option<Imam>, AppError> {
        let imam = sqlx::query_as::<_, Imam>(&format!(
            "SELECT {IMAM_COLUMNS} FROM imams i WHERE i.access_code = $1"
        ))
        .bind(access_code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(imam)
    }

    async fn access_code_exists(&self, access_code: &str) -> Result<bool, AppError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM imams WHERE access_code = $1)")
                .bind(access_code)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn insert_imam(&self, imam: &NewImam) -> Result<Option<Imam>, AppError> {
        let created = sqlx::query_as::<_, Imam>(
            "INSERT INTO imams (name, access_code, quota)
             VALUES ($1, $2, $3)
             ON CONFLICT (access_code) DO NOTHING
             RETURNING id, name, access_code, quota, created_at, 0::BIGINT AS booked",
        )
        .bind(&imam.name)
        .bind(&imam.access_code)
        .bind(imam.quota)
        .fetch_optional(&self.pool)
        .await?;
        Ok(created)
    }

    async fn delete_imam(&self, id: i64) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;
        // The foreign key cascades too; deleting explicitly keeps the count visible in logs.
        let freed = sqlx::query("DELETE FROM bookings WHERE imam_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let deleted = sqlx::query("DELETE FROM imams WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if deleted == 0 {
            return Ok(false);
        }
        tx.commit().await?;
        tracing::debug!(imam_id = id, freed, "imam deleted");
        Ok(true)
    }

    async fn bookings(&self) -> Result<BookingMap, AppError> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT date_key, imam_id FROM bookings ORDER BY date_key")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().collect())
    }

    async fn commit_bookings(&self, imam_id: i64, dates: &[String]) -> Result<CommitOutcome, AppError> {
        let keys: Vec<String> = normalize_keys(dates)?.into_iter().collect();

        let mut tx = self.pool.begin().await?;

        // Row lock serialises concurrent batches for the same imam.
        let quota: i32 = sqlx::query_scalar("SELECT quota FROM imams WHERE id = $1 FOR UPDATE")
            .bind(imam_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::NotFound("Imam"))?;

        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT date_key, imam_id FROM bookings WHERE imam_id = $1 OR date_key = ANY($2)",
        )
        .bind(imam_id)
        .bind(&keys)
        .fetch_all(&mut *tx)
        .await?;
        let current: BookingMap = rows.into_iter().collect();

        let plan = plan_commit(imam_id, quota, &current, &keys)?;

        for key in &plan.outcome.added {
            sqlx::query(
                "INSERT INTO bookings (date_key, imam_id)
                 VALUES ($1, $2)
                 ON CONFLICT (date_key) DO UPDATE SET imam_id = EXCLUDED.imam_id, created_at = NOW()",
            )
            .bind(key)
            .bind(imam_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(plan.outcome)
    }

    async fn delete_booking(&self, date_key: &str) -> Result<Option<i64>, AppError> {
        let owner: Option<i64> =
            sqlx::query_scalar("DELETE FROM bookings WHERE date_key = $1 RETURNING imam_id")
                .bind(date_key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(owner)
    }

    async fn find_admin(&self, username: &str) -> Result<Option<AdminUser>, AppError> {
        let admin = sqlx::query_as::<_, AdminUser>(
            "SELECT id, username, password_hash FROM admin_users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(admin)
    }

    async fn insert_admin(&self, username: &str, password_hash: &str) -> Result<AdminUser, AppError> {
        let admin = sqlx::query_as::<_, AdminUser>(
            "INSERT INTO admin_users (username, password_hash)
             VALUES ($1, $2)
             RETURNING id, username, password_hash",
        )
        .bind(username)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(admin)
    }

    async fn insert_session(
        &self,
        admin_id: i64,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO admin_sessions (admin_id, token_hash, expires_at) VALUES ($1, $2, $3)",
        )
        .bind(admin_id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_session(&self, token_hash: &str) -> Result<Option<SessionRecord>, AppError> {
        let session = sqlx::query_as::<_, SessionRecord>(
            "SELECT s.admin_id, u.username, s.expires_at
             FROM admin_sessions s
             JOIN admin_users u ON u.id = s.admin_id
             WHERE s.token_hash = $1",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }

    async fn delete_session(&self, token_hash: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM admin_sessions WHERE token_hash = $1")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn purge_expired_sessions(
        &self,
        admin_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        let purged = sqlx::query(
            "DELETE FROM admin_sessions
             WHERE expires_at < $1 AND ($2::BIGINT IS NULL OR admin_id = $2)",
        )
        .bind(now)
        .bind(admin_id)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(purged)
    }
}
