use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::Money;

/// A contiguous interval during which a single monthly earnings cap applies.
///
/// `valid_until == None` marks the period open-ended; the timeline permits
/// at most one such period, and only in last position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapPeriod {
    pub id: i64,
    /// Monthly earnings cap in effect throughout the interval.
    pub limit: Money,
    /// Inclusive first day.
    pub valid_from: NaiveDate,
    /// Inclusive last day; `None` for open-ended.
    pub valid_until: Option<NaiveDate>,
    /// Administrator that defined the period; opaque to the engine.
    pub created_by: i64,
    /// Whether the period contains the current date. Maintained by
    /// [`crate::timeline::CapTimeline::set_active_flags`].
    #[serde(default)]
    pub is_active: bool,
}

impl CapPeriod {
    /// Whether `date` falls inside the period.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.valid_from && self.valid_until.map_or(true, |until| date <= until)
    }

    /// Whether the ranges of `self` and `other` share at least one day.
    pub fn overlaps(&self, other: &CapPeriod) -> bool {
        self.valid_from <= other.end_or_max() && other.valid_from <= self.end_or_max()
    }

    pub fn is_open_ended(&self) -> bool {
        self.valid_until.is_none()
    }

    /// Whether the period is in effect or already over as of `today`.
    pub fn has_started(&self, today: NaiveDate) -> bool {
        self.valid_from <= today
    }

    pub(crate) fn end_or_max(&self) -> NaiveDate {
        self.valid_until.unwrap_or(NaiveDate::MAX)
    }
}

/// A cap period that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCapPeriod {
    pub limit: Money,
    pub valid_from: NaiveDate,
    pub valid_until: Option<NaiveDate>,
    pub created_by: i64,
}
