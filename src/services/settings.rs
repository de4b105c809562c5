use chrono::{Datelike, Duration, NaiveDate};

use crate::{
    db::Store,
    error::AppError,
    models::settings::{SettingsMap, START_DATE_KEY},
    services::calendar::{day_key, parse_day_key, WINDOW_DAYS},
};

pub struct SettingsService;

impl SettingsService {
    pub async fn all(store: &dyn Store) -> Result<SettingsMap, AppError> {
        store.settings().await
    }

    /// The configured window start, `None` until an admin sets one.
    pub async fn start_date(store: &dyn Store) -> Result<Option<NaiveDate>, AppError> {
        let settings = store.settings().await?;
        Ok(settings.get(START_DATE_KEY).and_then(|raw| match parse_day_key(raw) {
            Ok(date) => Some(date),
            Err(_) => {
                tracing::warn!("ignoring malformed {START_DATE_KEY} setting: {raw:?}");
                None
            }
        }))
    }

    pub async fn set_start_date(store: &dyn Store, date: Option<&str>) -> Result<NaiveDate, AppError> {
        let raw = date
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .ok_or_else(|| AppError::validation("Date is required"))?;
        let date = parse_day_key(raw)?;
        // Every day of the window must itself be a valid day-key.
        let last = date.checked_add_signed(Duration::days(i64::from(WINDOW_DAYS) - 1));
        if !last.is_some_and(|d| d.year() <= 9999) {
            return Err(AppError::validation("Date is too far in the future"));
        }
        store.put_setting(START_DATE_KEY, &day_key(date)).await?;
        tracing::info!("window start date set to {date}");
        Ok(date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    #[tokio::test]
    async fn start_date_round_trips_through_settings() {
        let store = MemoryStore::new();
        assert_eq!(SettingsService::start_date(&store).await.unwrap(), None);

        SettingsService::set_start_date(&store, Some("2025-03-01")).await.unwrap();

        let settings = SettingsService::all(&store).await.unwrap();
        assert_eq!(settings.get(START_DATE_KEY).map(String::as_str), Some("2025-03-01"));
        assert_eq!(
            SettingsService::start_date(&store).await.unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 1)
        );
    }

    #[tokio::test]
    async fn rejects_missing_or_malformed_dates() {
        let store = MemoryStore::new();
        assert!(matches!(
            SettingsService::set_start_date(&store, None).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            SettingsService::set_start_date(&store, Some("first of march")).await,
            Err(AppError::Validation(_))
        ));
        assert!(store.settings().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn wide_year_start_dates_are_refused() {
        let store = MemoryStore::new();
        assert!(matches!(
            SettingsService::set_start_date(&store, Some("+262142-12-20")).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            SettingsService::set_start_date(&store, Some("9999-12-31")).await,
            Err(AppError::Validation(_))
        ));
        SettingsService::set_start_date(&store, Some("9999-12-02")).await.unwrap();
    }
}
