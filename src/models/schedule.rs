use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::services::calendar::CalendarDay;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssignedImam {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleDay {
    #[serde(flatten)]
    pub day: CalendarDay,
    pub imam: Option<AssignedImam>,
}

/// The 30-day window joined with bookings, read by every view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub configured: bool,
    pub start_date: Option<NaiveDate>,
    pub days: Vec<ScheduleDay>,
}
