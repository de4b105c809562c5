use crate::{
    db::Store,
    error::AppError,
    models::booking::{BookingMap, CommitOutcome},
    services::{
        calendar::{day_key, in_window, parse_day_key},
        metrics::{status_label, BOOKING_COMMITS_COUNTER, DAYS_BOOKED_COUNTER, DAYS_FREED_COUNTER},
        quota::normalize_keys,
        settings::SettingsService,
    },
};

pub struct BookingService;

impl BookingService {
    pub async fn list(store: &dyn Store) -> Result<BookingMap, AppError> {
        store.bookings().await
    }

    /// Assigns `dates` to the imam as one all-or-nothing batch.
    ///
    /// Every date must fall inside the configured window. Days the imam already owns
    /// are accepted without counting twice. Days owned by someone else move to this
    /// imam; the last writer wins.
    pub async fn commit(
        store: &dyn Store,
        imam_id: i64,
        dates: &[String],
    ) -> Result<CommitOutcome, AppError> {
        let result = match Self::window_keys(store, dates).await {
            Ok(keys) => store.commit_bookings(imam_id, &keys).await,
            Err(e) => Err(e),
        };
        BOOKING_COMMITS_COUNTER
            .with_label_values(&[status_label(&result)])
            .inc();

        match &result {
            Ok(outcome) => {
                DAYS_BOOKED_COUNTER.inc_by(outcome.added.len() as f64);
                tracing::info!(
                    imam_id,
                    added = outcome.added.len(),
                    booked = outcome.booked,
                    quota = outcome.quota,
                    "bookings committed"
                );
                if !outcome.transferred.is_empty() {
                    tracing::warn!(imam_id, days = ?outcome.transferred, "days taken over from another imam");
                }
            }
            Err(AppError::QuotaExceeded { requested, quota }) => {
                tracing::info!(imam_id, requested, quota, "booking batch rejected: quota exceeded");
            }
            Err(_) => {}
        }
        result
    }

    /// Canonical keys of `dates`, provided every one is a day of the current window.
    async fn window_keys(store: &dyn Store, dates: &[String]) -> Result<Vec<String>, AppError> {
        let keys = normalize_keys(dates)?;
        let start = SettingsService::start_date(store)
            .await?
            .ok_or_else(|| AppError::validation("Start date has not been configured"))?;

        for key in &keys {
            let date = parse_day_key(key)?;
            if !in_window(start, date) {
                tracing::info!(date_key = %key, %start, "booking outside the window rejected");
                return Err(AppError::NotFound("Day"));
            }
        }
        Ok(keys.into_iter().collect())
    }

    /// Admin reassignment of a single day, under the same quota rule.
    pub async fn assign_day(
        store: &dyn Store,
        date_key: &str,
        imam_id: i64,
    ) -> Result<CommitOutcome, AppError> {
        Self::commit(store, imam_id, &[date_key.to_string()]).await
    }

    /// Frees a day. Returns the imam who held it.
    pub async fn remove(store: &dyn Store, date_key: &str) -> Result<i64, AppError> {
        let key = day_key(parse_day_key(date_key)?);
        let owner = store
            .delete_booking(&key)
            .await?
            .ok_or(AppError::NotFound("Booking"))?;
        DAYS_FREED_COUNTER.inc();
        tracing::info!(imam_id = owner, date_key = %key, "booking removed");
        Ok(owner)
    }

    /// Checks that `access_code` belongs to `imam_id`.
    pub async fn authorize_imam(
        store: &dyn Store,
        imam_id: i64,
        access_code: Option<&str>,
    ) -> Result<(), AppError> {
        let code = access_code
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or(AppError::InvalidCredentials)?;
        let imam = store
            .find_imam_by_code(code)
            .await?
            .ok_or(AppError::InvalidCredentials)?;
        if imam.id != imam_id {
            tracing::warn!(imam_id, code_owner = imam.id, "access code used for another imam");
            return Err(AppError::Forbidden);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::MemoryStore,
        models::imam::CreateImamRequest,
        services::imams::ImamService,
    };

    fn days(keys: &[&str]) -> Vec<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    /// A store whose window runs from 2025-03-01 to 2025-03-30.
    async fn store() -> MemoryStore {
        let store = MemoryStore::new();
        SettingsService::set_start_date(&store, Some("2025-03-01")).await.unwrap();
        store
    }

    async fn imam(store: &MemoryStore, quota: i64) -> crate::models::imam::Imam {
        ImamService::create(
            store,
            &CreateImamRequest {
                name: Some("Ali".into()),
                quota: Some(quota),
            },
        )
        .await
        .unwrap()
    }

    async fn booked(store: &MemoryStore, imam_id: i64) -> usize {
        store
            .bookings()
            .await
            .unwrap()
            .values()
            .filter(|owner| **owner == imam_id)
            .count()
    }

    #[tokio::test]
    async fn count_never_exceeds_quota_across_batches() {
        let store = store().await;
        let ali = imam(&store, 3).await;

        BookingService::commit(&store, ali.id, &days(&["2025-03-01", "2025-03-02"])).await.unwrap();
        assert!(BookingService::commit(&store, ali.id, &days(&["2025-03-03", "2025-03-04"]))
            .await
            .is_err());
        BookingService::commit(&store, ali.id, &days(&["2025-03-03"])).await.unwrap();
        assert!(BookingService::commit(&store, ali.id, &days(&["2025-03-04"])).await.is_err());

        assert_eq!(booked(&store, ali.id).await, 3);
    }

    #[tokio::test]
    async fn resubmitting_owned_days_keeps_count() {
        let store = store().await;
        let ali = imam(&store, 2).await;
        BookingService::commit(&store, ali.id, &days(&["2025-03-01", "2025-03-02"])).await.unwrap();

        let outcome = BookingService::commit(&store, ali.id, &days(&["2025-03-02", "2025-03-01"]))
            .await
            .unwrap();

        assert!(outcome.added.is_empty());
        assert_eq!(outcome.booked, 2);
        assert_eq!(booked(&store, ali.id).await, 2);
    }

    #[tokio::test]
    async fn over_quota_batch_is_all_or_nothing() {
        let store = store().await;
        let ali = imam(&store, 3).await;
        let five = days(&["2025-03-01", "2025-03-02", "2025-03-03", "2025-03-04", "2025-03-05"]);

        let err = BookingService::commit(&store, ali.id, &five).await.unwrap_err();

        assert!(matches!(err, AppError::QuotaExceeded { requested: 5, quota: 3 }));
        assert_eq!(booked(&store, ali.id).await, 0);
    }

    // Concurrent claims are last-writer-wins by design: no version check.
    #[tokio::test]
    async fn commit_transfers_day_owned_by_other_imam() {
        let store = store().await;
        let ali = imam(&store, 3).await;
        let umar = imam(&store, 3).await;
        BookingService::commit(&store, ali.id, &days(&["2025-03-10"])).await.unwrap();

        let outcome = BookingService::commit(&store, umar.id, &days(&["2025-03-10"])).await.unwrap();

        assert_eq!(outcome.transferred, days(&["2025-03-10"]));
        assert_eq!(store.bookings().await.unwrap().get("2025-03-10"), Some(&umar.id));
        assert_eq!(booked(&store, ali.id).await, 0);
    }

    #[tokio::test]
    async fn deleted_imam_cannot_book() {
        let store = store().await;
        let ali = imam(&store, 3).await;
        BookingService::commit(&store, ali.id, &days(&["2025-03-01"])).await.unwrap();

        ImamService::delete(&store, ali.id).await.unwrap();

        assert!(store.bookings().await.unwrap().is_empty());
        assert!(matches!(
            BookingService::commit(&store, ali.id, &days(&["2025-03-02"])).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn admin_assignment_obeys_quota() {
        let store = store().await;
        let ali = imam(&store, 1).await;
        BookingService::assign_day(&store, "2025-03-01", ali.id).await.unwrap();
        assert!(matches!(
            BookingService::assign_day(&store, "2025-03-02", ali.id).await,
            Err(AppError::QuotaExceeded { .. })
        ));
    }

    #[tokio::test]
    async fn removing_free_day_is_not_found() {
        let store = store().await;
        let ali = imam(&store, 3).await;
        BookingService::commit(&store, ali.id, &days(&["2025-03-01"])).await.unwrap();

        assert_eq!(BookingService::remove(&store, "2025-03-01").await.unwrap(), ali.id);
        assert!(matches!(
            BookingService::remove(&store, "2025-03-01").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn access_code_must_match_imam() {
        let store = store().await;
        let ali = imam(&store, 3).await;
        let umar = imam(&store, 3).await;

        BookingService::authorize_imam(&store, ali.id, Some(&ali.access_code)).await.unwrap();
        assert!(matches!(
            BookingService::authorize_imam(&store, ali.id, Some(&umar.access_code)).await,
            Err(AppError::Forbidden)
        ));
        assert!(matches!(
            BookingService::authorize_imam(&store, ali.id, None).await,
            Err(AppError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn days_outside_the_window_are_not_found() {
        let store = store().await;
        let ali = imam(&store, 3).await;

        let err = BookingService::commit(&store, ali.id, &days(&["2099-01-01", "1900-06-01", "2025-03-05"]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound("Day")));
        assert_eq!(booked(&store, ali.id).await, 0);

        // Rejected keys must not have used up any quota.
        BookingService::commit(&store, ali.id, &days(&["2025-03-01", "2025-03-02", "2025-03-30"]))
            .await
            .unwrap();
        assert!(matches!(
            BookingService::assign_day(&store, "2025-03-31", ali.id).await,
            Err(AppError::NotFound("Day"))
        ));
        assert_eq!(booked(&store, ali.id).await, 3);
    }

    #[tokio::test]
    async fn booking_needs_a_configured_window() {
        let store = MemoryStore::new();
        let ali = imam(&store, 3).await;

        assert!(matches!(
            BookingService::commit(&store, ali.id, &days(&["2025-03-01"])).await,
            Err(AppError::Validation(_))
        ));
        assert!(store.bookings().await.unwrap().is_empty());
    }
}
