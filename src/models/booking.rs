use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Day-key (ISO date) to imam id, ordered by date.
pub type BookingMap = BTreeMap<String, i64>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitBookingsRequest {
    pub imam_id: Option<i64>,
    pub dates: Option<Vec<String>>,
    /// Lets an imam book for themself without an admin session.
    pub access_code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignDayRequest {
    pub imam_id: Option<i64>,
}

/// What a committed batch changed, so clients can reconcile their caches.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommitOutcome {
    /// Keys that were not owned by the imam before this batch.
    pub added: Vec<String>,
    /// Keys the imam already owned; re-submitting them is a no-op.
    pub already_owned: Vec<String>,
    /// Subset of `added` taken over from another imam.
    pub transferred: Vec<String>,
    /// Days owned by the imam after the batch.
    pub booked: usize,
    pub quota: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommitResponse {
    pub success: bool,
    pub bookings_added: usize,
    #[serde(flatten)]
    pub outcome: CommitOutcome,
}

impl From<CommitOutcome> for CommitResponse {
    fn from(outcome: CommitOutcome) -> Self {
        Self {
            success: true,
            bookings_added: outcome.added.len(),
            outcome,
        }
    }
}
