//! An imam's pending day selection, checked against the last known booking map.
//!
//! The server remains authoritative: a draft only avoids sending batches that are
//! bound to fail, and [`SelectionDraft::reconcile`] realigns it after a refresh.

use std::collections::BTreeSet;

use crate::models::{booking::BookingMap, imam::ImamProfile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Selected,
    Deselected,
    /// The day is already the imam's; nothing to select.
    AlreadyOwned,
    TakenByOther,
    QuotaReached,
}

#[derive(Debug, Clone)]
pub struct SelectionDraft {
    imam_id: i64,
    quota: usize,
    selected: BTreeSet<String>,
}

impl SelectionDraft {
    pub fn new(profile: &ImamProfile) -> Self {
        Self {
            imam_id: profile.id,
            quota: usize::try_from(profile.quota).unwrap_or(0),
            selected: BTreeSet::new(),
        }
    }

    pub fn owned(&self, bookings: &BookingMap) -> usize {
        bookings.values().filter(|owner| **owner == self.imam_id).count()
    }

    pub fn toggle(&mut self, date_key: &str, bookings: &BookingMap) -> Toggle {
        if self.selected.remove(date_key) {
            return Toggle::Deselected;
        }
        match bookings.get(date_key) {
            Some(owner) if *owner == self.imam_id => return Toggle::AlreadyOwned,
            Some(_) => return Toggle::TakenByOther,
            None => {}
        }
        if self.total(bookings) >= self.quota {
            return Toggle::QuotaReached;
        }
        self.selected.insert(date_key.to_string());
        Toggle::Selected
    }

    /// Owned days plus pending selections.
    pub fn total(&self, bookings: &BookingMap) -> usize {
        self.owned(bookings) + self.selected.len()
    }

    pub fn is_complete(&self, bookings: &BookingMap) -> bool {
        self.total(bookings) == self.quota
    }

    /// Drops selections the fresh `bookings` show as no longer free.
    /// Returns the dropped day-keys.
    pub fn reconcile(&mut self, bookings: &BookingMap) -> Vec<String> {
        let stale: Vec<String> = self
            .selected
            .iter()
            .filter(|key| bookings.contains_key(*key))
            .cloned()
            .collect();
        for key in &stale {
            self.selected.remove(key);
        }
        stale
    }

    pub fn selected(&self) -> Vec<String> {
        self.selected.iter().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }
}
