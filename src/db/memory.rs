use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::{
    db::Store,
    error::AppError,
    models::{
        admin::{AdminUser, SessionRecord},
        booking::{BookingMap, CommitOutcome},
        imam::{Imam, NewImam},
        settings::SettingsMap,
    },
    services::quota::plan_commit,
};

#[derive(Debug, Clone)]
struct ImamRow {
    name: String,
    access_code: String,
    quota: i32,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct SessionRow {
    admin_id: i64,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Inner {
    settings: SettingsMap,
    imams: BTreeMap<i64, ImamRow>,
    bookings: BookingMap,
    admins: BTreeMap<i64, AdminUser>,
    sessions: HashMap<String, SessionRow>,
    next_id: i64,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn imam(&self, id: i64) -> Option<Imam> {
        self.imams.get(&id).map(|row| Imam {
            id,
            name: row.name.clone(),
            access_code: row.access_code.clone(),
            quota: row.quota,
            booked: self.bookings.values().filter(|owner| **owner == id).count() as i64,
            created_at: row.created_at,
        })
    }
}

/// Process-local store. Every operation holds one lock, so batches are atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn settings(&self) -> Result<SettingsMap, AppError> {
        Ok(self.inner.lock().await.settings.clone())
    }

    async fn put_setting(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.inner
            .lock()
            .await
            .settings
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn list_imams(&self) -> Result<Vec<Imam>, AppError> {
        let inner = self.inner.lock().await;
        // Ids grow monotonically, so reverse id order is newest first.
        Ok(inner
            .imams
            .keys()
            .rev()
            .filter_map(|id| inner.imam(*id))
            .collect())
    }

    async fn find_imam(&self, id: i64) -> Result<Option<Imam>, AppError> {
        Ok(self.inner.lock().await.imam(id))
    }

    async fn find_imam_by_code(&self, access_code: &str) -> Result<Option<Imam>, AppError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .imams
            .iter()
            .find(|(_, row)| row.access_code == access_code)
            .and_then(|(id, _)| inner.imam(*id)))
    }

    async fn access_code_exists(&self, access_code: &str) -> Result<bool, AppError> {
        let inner = self.inner.lock().await;
        Ok(inner.imams.values().any(|row| row.access_code == access_code))
    }

    async fn insert_imam(&self, imam: &NewImam) -> Result<Option<Imam>, AppError> {
        let mut inner = self.inner.lock().await;
        if inner.imams.values().any(|row| row.access_code == imam.access_code) {
            return Ok(None);
        }
        let id = inner.next_id();
        inner.imams.insert(
            id,
            ImamRow {
                name: imam.name.clone(),
                access_code: imam.access_code.clone(),
                quota: imam.quota,
                created_at: Utc::now(),
            },
        );
        Ok(inner.imam(id))
    }

    async fn delete_imam(&self, id: i64) -> Result<bool, AppError> {
        let mut inner = self.inner.lock().await;
        if inner.imams.remove(&id).is_none() {
            return Ok(false);
        }
        inner.bookings.retain(|_, owner| *owner != id);
        Ok(true)
    }

    async fn bookings(&self) -> Result<BookingMap, AppError> {
        Ok(self.inner.lock().await.bookings.clone())
    }

    async fn commit_bookings(&self, imam_id: i64, dates: &[String]) -> Result<CommitOutcome, AppError> {
        let mut inner = self.inner.lock().await;
        let quota = inner
            .imams
            .get(&imam_id)
            .map(|row| row.quota)
            .ok_or(AppError::NotFound("Imam"))?;

        let plan = plan_commit(imam_id, quota, &inner.bookings, dates)?;
        for key in &plan.outcome.added {
            inner.bookings.insert(key.clone(), imam_id);
        }
        Ok(plan.outcome)
    }

    async fn delete_booking(&self, date_key: &str) -> Result<Option<i64>, AppError> {
        Ok(self.inner.lock().await.bookings.remove(date_key))
    }

    async fn find_admin(&self, username: &str) -> Result<Option<AdminUser>, AppError> {
        let inner = self.inner.lock().await;
        Ok(inner.admins.values().find(|a| a.username == username).cloned())
    }

    async fn insert_admin(&self, username: &str, password_hash: &str) -> Result<AdminUser, AppError> {
        let mut inner = self.inner.lock().await;
        if inner.admins.values().any(|a| a.username == username) {
            return Err(AppError::validation(format!("Admin '{username}' already exists")));
        }
        let id = inner.next_id();
        let admin = AdminUser {
            id,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
        };
        inner.admins.insert(id, admin.clone());
        Ok(admin)
    }

    async fn insert_session(
        &self,
        admin_id: i64,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        self.inner.lock().await.sessions.insert(
            token_hash.to_string(),
            SessionRow { admin_id, expires_at },
        );
        Ok(())
    }

    async fn find_session(&self, token_hash: &str) -> Result<Option<SessionRecord>, AppError> {
        let inner = self.inner.lock().await;
        Ok(inner.sessions.get(token_hash).and_then(|session| {
            inner.admins.get(&session.admin_id).map(|admin| SessionRecord {
                admin_id: admin.id,
                username: admin.username.clone(),
                expires_at: session.expires_at,
            })
        }))
    }

    async fn delete_session(&self, token_hash: &str) -> Result<(), AppError> {
        self.inner.lock().await.sessions.remove(token_hash);
        Ok(())
    }

    async fn purge_expired_sessions(
        &self,
        admin_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        let mut inner = self.inner.lock().await;
        let before = inner.sessions.len();
        inner.sessions.retain(|_, s| {
            let in_scope = admin_id.map_or(true, |id| id == s.admin_id);
            !(in_scope && s.expires_at < now)
        });
        Ok((before - inner.sessions.len()) as u64)
    }
}
