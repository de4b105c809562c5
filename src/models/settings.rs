use std::collections::BTreeMap;

use serde::Deserialize;

/// The only persisted setting: first day of the 30-day window.
pub const START_DATE_KEY: &str = "ramadhanStartDate";

pub type SettingsMap = BTreeMap<String, String>;

#[derive(Debug, Deserialize)]
pub struct UpdateStartDateRequest {
    pub date: Option<String>,
}
