//! Quota planning for a booking batch.
//!
//! Stores call [`plan_commit`] inside their write transaction with the rows that
//! matter (everything the imam owns plus every proposed key), then apply the plan.

use std::collections::BTreeSet;

use crate::{
    error::AppError,
    models::booking::{BookingMap, CommitOutcome},
    services::calendar::{day_key, parse_day_key},
};

pub const MIN_QUOTA: i64 = 1;
pub const MAX_QUOTA: i64 = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct CommitPlan {
    /// Keys to upsert for the imam, deduplicated and sorted.
    pub writes: Vec<String>,
    pub outcome: CommitOutcome,
}

/// Normalises the proposed keys, rejecting empty batches and malformed dates.
pub fn normalize_keys(proposed: &[String]) -> Result<BTreeSet<String>, AppError> {
    if proposed.is_empty() {
        return Err(AppError::validation("At least one date is required"));
    }
    proposed
        .iter()
        .map(|k| parse_day_key(k).map(day_key))
        .collect()
}

/// Decides whether `imam_id` may own `proposed` on top of what `current` says it owns.
///
/// `current` must contain at least every booking of the imam and every booking
/// whose key is proposed; extra rows are ignored.
pub fn plan_commit(
    imam_id: i64,
    quota: i32,
    current: &BookingMap,
    proposed: &[String],
) -> Result<CommitPlan, AppError> {
    let keys = normalize_keys(proposed)?;

    let owned = current.values().filter(|owner| **owner == imam_id).count();

    let mut outcome = CommitOutcome {
        quota,
        ..CommitOutcome::default()
    };
    for key in &keys {
        match current.get(key) {
            Some(owner) if *owner == imam_id => outcome.already_owned.push(key.clone()),
            Some(_) => {
                outcome.transferred.push(key.clone());
                outcome.added.push(key.clone());
            }
            None => outcome.added.push(key.clone()),
        }
    }

    let requested = owned + outcome.added.len();
    if requested > usize::try_from(quota).unwrap_or(0) {
        return Err(AppError::QuotaExceeded { requested, quota });
    }
    outcome.booked = requested;

    Ok(CommitPlan {
        writes: keys.into_iter().collect(),
        outcome,
    })
}

pub fn validate_quota(quota: Option<i64>) -> Result<i32, AppError> {
    match quota {
        Some(q) if (MIN_QUOTA..=MAX_QUOTA).contains(&q) => Ok(q as i32),
        Some(_) => Err(AppError::validation("Quota must be between 1 and 30")),
        None => Err(AppError::validation("Name and quota are required")),
    }
}
