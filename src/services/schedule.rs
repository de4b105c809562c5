use std::collections::HashMap;

use crate::{
    db::Store,
    error::AppError,
    models::schedule::{AssignedImam, Schedule, ScheduleDay},
    services::{calendar, settings::SettingsService},
};

pub struct ScheduleService;

impl ScheduleService {
    /// The window joined with the current bookings. Empty until a start date is set.
    pub async fn build(store: &dyn Store) -> Result<Schedule, AppError> {
        let start = SettingsService::start_date(store).await?;
        let bookings = store.bookings().await?;
        let names: HashMap<i64, String> = store
            .list_imams()
            .await?
            .into_iter()
            .map(|imam| (imam.id, imam.name))
            .collect();

        let days = calendar::days(start)
            .map(|day| {
                let imam = bookings.get(&day.date_key).map(|id| AssignedImam {
                    id: *id,
                    name: names.get(id).cloned().unwrap_or_default(),
                });
                ScheduleDay { day, imam }
            })
            .collect();

        Ok(Schedule {
            configured: start.is_some(),
            start_date: start,
            days,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::MemoryStore,
        models::imam::CreateImamRequest,
        services::{bookings::BookingService, imams::ImamService},
    };

    #[tokio::test]
    async fn unconfigured_schedule_is_empty() {
        let store = MemoryStore::new();
        let schedule = ScheduleService::build(&store).await.unwrap();
        assert!(!schedule.configured);
        assert!(schedule.days.is_empty());
    }

    #[tokio::test]
    async fn stored_start_near_the_calendar_end_does_not_panic() {
        let store = MemoryStore::new();
        store
            .put_setting(crate::models::settings::START_DATE_KEY, "+262142-12-20")
            .await
            .unwrap();
        let schedule = ScheduleService::build(&store).await.unwrap();
        assert!(!schedule.configured);

        SettingsService::set_start_date(&store, Some("9999-12-01")).await.unwrap();
        let schedule = ScheduleService::build(&store).await.unwrap();
        assert_eq!(schedule.days.len(), 30);
        assert_eq!(schedule.days[29].day.date_key, "9999-12-30");
    }

    #[tokio::test]
    async fn joins_bookings_onto_days() {
        let store = MemoryStore::new();
        SettingsService::set_start_date(&store, Some("2025-03-01")).await.unwrap();
        let ali = ImamService::create(
            &store,
            &CreateImamRequest {
                name: Some("Ali".into()),
                quota: Some(3),
            },
        )
        .await
        .unwrap();
        BookingService::commit(&store, ali.id, &["2025-03-02".to_string()]).await.unwrap();

        let schedule = ScheduleService::build(&store).await.unwrap();

        assert_eq!(schedule.days.len(), 30);
        assert!(schedule.days[0].imam.is_none());
        let second = schedule.days[1].imam.as_ref().unwrap();
        assert_eq!(second.id, ali.id);
        assert_eq!(second.name, "Ali");
    }
}
