//! Typed HTTP client for the API, with the read-through caches a UI needs.
//!
//! Each cache is invalidated by the writes that can change it, so a caller never
//! has to reason about which listing is stale after a mutation.

pub mod cache;
pub mod selection;

use chrono::NaiveDate;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::models::{
    admin::LoginResponse,
    booking::{BookingMap, CommitResponse},
    imam::{Imam, ImamProfile},
    schedule::Schedule,
    settings::{SettingsMap, START_DATE_KEY},
};

use cache::ReadThroughCache;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{status}: {message}")]
    Api { status: StatusCode, message: String },
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Http(e) => e.status(),
        }
    }
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    admin_token: RwLock<Option<String>>,
    settings: ReadThroughCache<SettingsMap>,
    imams: ReadThroughCache<Vec<ImamProfile>>,
    bookings: ReadThroughCache<BookingMap>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            admin_token: RwLock::new(None),
            settings: ReadThroughCache::new(),
            imams: ReadThroughCache::new(),
            bookings: ReadThroughCache::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.admin_token.read().await.as_deref() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let response = self.http.get(self.url(path)).send().await?;
        decode(response).await
    }

    async fn send<B: Serialize, T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        body: Option<&B>,
    ) -> Result<T, ClientError> {
        let mut request = self.authorized(request).await;
        if let Some(body) = body {
            request = request.json(body);
        }
        decode(request.send().await?).await
    }

    /// Drops every cached listing.
    pub async fn refresh(&self) {
        self.settings.invalidate().await;
        self.imams.invalidate().await;
        self.bookings.invalidate().await;
    }

    // ── Admin session ─────────────────────────────────────────────────────

    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ClientError> {
        let body = json!({ "username": username, "password": password });
        let response: LoginResponse = self
            .send(self.http.post(self.url("/api/admin/login")), Some(&body))
            .await?;
        *self.admin_token.write().await = Some(response.token.clone());
        Ok(response)
    }

    pub async fn logout(&self) -> Result<(), ClientError> {
        let _: Value = self
            .send::<(), _>(self.http.post(self.url("/api/admin/logout")), None)
            .await?;
        *self.admin_token.write().await = None;
        Ok(())
    }

    // ── Settings ──────────────────────────────────────────────────────────

    pub async fn settings(&self) -> Result<SettingsMap, ClientError> {
        self.settings.get_or_load(|| self.get("/api/settings")).await
    }

    pub async fn start_date(&self) -> Result<Option<NaiveDate>, ClientError> {
        let settings = self.settings().await?;
        Ok(settings
            .get(START_DATE_KEY)
            .and_then(|raw| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()))
    }

    pub async fn set_start_date(&self, date: NaiveDate) -> Result<(), ClientError> {
        let body = json!({ "date": date });
        let _: Value = self
            .send(self.http.put(self.url("/api/settings/ramadhan-start")), Some(&body))
            .await?;
        self.settings.invalidate().await;
        Ok(())
    }

    // ── Imams ─────────────────────────────────────────────────────────────

    pub async fn imams(&self) -> Result<Vec<ImamProfile>, ClientError> {
        self.imams.get_or_load(|| self.get("/api/imams")).await
    }

    pub async fn create_imam(&self, name: &str, quota: i32) -> Result<Imam, ClientError> {
        let body = json!({ "name": name, "quota": quota });
        let imam = self
            .send(self.http.post(self.url("/api/imams")), Some(&body))
            .await?;
        self.imams.invalidate().await;
        Ok(imam)
    }

    pub async fn delete_imam(&self, id: i64) -> Result<(), ClientError> {
        let _: Value = self
            .send::<(), _>(self.http.delete(self.url(&format!("/api/imams/{id}"))), None)
            .await?;
        self.imams.invalidate().await;
        self.bookings.invalidate().await;
        Ok(())
    }

    pub async fn verify_access_code(&self, access_code: &str) -> Result<ImamProfile, ClientError> {
        let body = json!({ "accessCode": access_code });
        self.send(self.http.post(self.url("/api/auth/verify")), Some(&body))
            .await
    }

    // ── Bookings ──────────────────────────────────────────────────────────

    pub async fn bookings(&self) -> Result<BookingMap, ClientError> {
        self.bookings.get_or_load(|| self.get("/api/bookings")).await
    }

    /// Commits a batch for `imam_id`. Without an admin login, `access_code` must be the imam's.
    pub async fn commit_bookings(
        &self,
        imam_id: i64,
        dates: &[String],
        access_code: Option<&str>,
    ) -> Result<CommitResponse, ClientError> {
        let body = json!({ "imamId": imam_id, "dates": dates, "accessCode": access_code });
        let result = self
            .send(self.http.post(self.url("/api/bookings")), Some(&body))
            .await;
        // A rejected batch may mean our view was stale; refetch either way.
        self.bookings.invalidate().await;
        self.imams.invalidate().await;
        result
    }

    pub async fn assign_day(&self, date_key: &str, imam_id: i64) -> Result<CommitResponse, ClientError> {
        let body = json!({ "imamId": imam_id });
        let result = self
            .send(self.http.put(self.url(&format!("/api/bookings/{date_key}"))), Some(&body))
            .await;
        self.bookings.invalidate().await;
        self.imams.invalidate().await;
        result
    }

    pub async fn remove_booking(&self, date_key: &str) -> Result<(), ClientError> {
        let _: Value = self
            .send::<(), _>(self.http.delete(self.url(&format!("/api/bookings/{date_key}"))), None)
            .await?;
        self.bookings.invalidate().await;
        self.imams.invalidate().await;
        Ok(())
    }

    pub async fn schedule(&self) -> Result<Schedule, ClientError> {
        self.get("/api/schedule").await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }
    let message = response
        .json::<Value>()
        .await
        .ok()
        .and_then(|body| body.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| status.to_string());
    Err(ClientError::Api { status, message })
}
