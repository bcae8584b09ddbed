//! The cap timeline: an ordered, non-overlapping set of [`CapPeriod`]s.
//!
//! Administrators append cap settings over time ("538 € from January 2024",
//! "556 € from January 2025") and the timeline keeps them tiled: inserting
//! in front of an open-ended period truncates that period, deleting a
//! future period re-links its neighbours, and a full recalculation repairs
//! drift left behind by manual edits. Ambiguous overlap is never resolved
//! by guesswork — the conflicting ids are surfaced and nothing is mutated.
//!
//! Every mutation has a `plan_*` twin that computes the same outcome
//! without touching the in-memory state. Plans feed a [`TimelineChange`],
//! the command object a repository applies as one atomic batch.
//!
//! ```
//! use chrono::NaiveDate;
//! use minijob_core::models::{CapPeriod, Money};
//! use minijob_core::timeline::CapTimeline;
//!
//! let ymd = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();
//! let timeline = CapTimeline::new(vec![
//!     CapPeriod {
//!         id: 1,
//!         limit: Money::from_cents(53_800),
//!         valid_from: ymd(2024, 1, 1),
//!         valid_until: Some(ymd(2024, 12, 31)),
//!         created_by: 1,
//!         is_active: false,
//!     },
//!     CapPeriod {
//!         id: 2,
//!         limit: Money::from_cents(55_600),
//!         valid_from: ymd(2025, 1, 1),
//!         valid_until: None,
//!         created_by: 1,
//!         is_active: false,
//!     },
//! ])
//! .unwrap();
//!
//! let cap = timeline.find_applicable(ymd(2025, 3, 10)).unwrap();
//! assert_eq!(cap.limit, Money::from_cents(55_600));
//! ```

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::models::{CapPeriod, NewCapPeriod};

/// Errors raised by timeline validation and mutation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimelineError {
    /// Malformed or logically impossible dates: an inverted range, or a new
    /// period starting in the past.
    #[error("invalid date range: {0}")]
    InvalidDateRange(String),

    /// The timeline cannot decide how to fit the period in; the caller must
    /// resolve the conflict explicitly.
    #[error("period overlaps existing cap periods {conflicting:?}")]
    OverlappingPeriods { conflicting: Vec<i64> },

    /// Active and past periods are immutable to deletion.
    #[error("cap period {id} started {valid_from}; only future periods can be deleted")]
    PeriodNotDeletable { id: i64, valid_from: NaiveDate },

    #[error("cap period {id} not found")]
    PeriodNotFound { id: i64 },
}

/// An in-place `valid_until` adjustment applied to a neighbouring period
/// during insert, delete, or recalculation. Always reported to the caller
/// so the change can be surfaced to the administrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Adjustment {
    pub period_id: i64,
    pub previous_valid_until: Option<NaiveDate>,
    pub new_valid_until: Option<NaiveDate>,
}

/// One atomic batch of timeline mutations.
///
/// Produced by [`crate::service::PayrollService`] from a plan; the
/// repository must apply the whole batch inside a single transaction so no
/// reader observes a half-adjusted timeline.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TimelineChange {
    pub insert: Option<NewCapPeriod>,
    /// `(period id, new valid_until)` pairs: neighbour truncations and
    /// re-tiling.
    pub set_valid_until: Vec<(i64, Option<NaiveDate>)>,
    /// `(period id, active)` pairs from refreshing active flags.
    pub set_active: Vec<(i64, bool)>,
    pub delete: Option<i64>,
    /// Full-row update from an admin edit.
    pub update: Option<CapPeriod>,
}

impl TimelineChange {
    pub fn is_empty(&self) -> bool {
        self.insert.is_none()
            && self.set_valid_until.is_empty()
            && self.set_active.is_empty()
            && self.delete.is_none()
            && self.update.is_none()
    }
}

/// Holder of the no-overlap invariant.
///
/// Construction validates the whole set; every mutating operation either
/// leaves the invariant intact or fails without touching anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapTimeline {
    /// Ascending by `valid_from`.
    periods: Vec<CapPeriod>,
}

impl CapTimeline {
    /// Build a timeline from raw rows, validating that every range is
    /// well-formed and no two periods share a day. An open-ended period
    /// anywhere but last position shows up as an overlap with its
    /// successor, so a single pairwise sweep covers all placement rules.
    pub fn new(mut periods: Vec<CapPeriod>) -> Result<Self, TimelineError> {
        periods.sort_by_key(|p| p.valid_from);
        for period in &periods {
            if let Some(until) = period.valid_until {
                if until < period.valid_from {
                    return Err(TimelineError::InvalidDateRange(format!(
                        "cap period {} ends {} before it starts {}",
                        period.id, until, period.valid_from
                    )));
                }
            }
        }
        if let Some(pair) = periods.windows(2).find(|pair| pair[0].overlaps(&pair[1])) {
            return Err(TimelineError::OverlappingPeriods {
                conflicting: vec![pair[0].id, pair[1].id],
            });
        }
        Ok(Self { periods })
    }

    /// Repair a drifted set of raw rows: sort ascending and force-set every
    /// `valid_until` to the day before its successor's `valid_from`, the
    /// last period staying open-ended. Returns the repaired timeline and
    /// the adjustments it took; repairing an already-tiled timeline takes
    /// none.
    pub fn recalculated(
        mut periods: Vec<CapPeriod>,
    ) -> Result<(Self, Vec<Adjustment>), TimelineError> {
        periods.sort_by_key(|p| p.valid_from);
        if let Some(pair) = periods
            .windows(2)
            .find(|pair| pair[0].valid_from == pair[1].valid_from)
        {
            // Two periods starting the same day cannot be tiled.
            return Err(TimelineError::OverlappingPeriods {
                conflicting: vec![pair[0].id, pair[1].id],
            });
        }
        let mut timeline = Self { periods };
        let adjustments = timeline.recalculate();
        Ok((timeline, adjustments))
    }

    pub fn periods(&self) -> &[CapPeriod] {
        &self.periods
    }

    /// The unique period containing `date`, if any.
    pub fn find_applicable(&self, date: NaiveDate) -> Option<&CapPeriod> {
        self.periods.iter().find(|p| p.contains(date))
    }

    /// Decide how `new` commits, without mutating.
    ///
    /// Zero overlaps commit as-is. Exactly one overlap commits when the
    /// conflicting period is open-ended and starts strictly before the new
    /// one: the predecessor is truncated to the day before `valid_from` and
    /// the truncation is reported. Every other overlap is rejected with the
    /// conflicting ids.
    pub fn plan_insert(
        &self,
        new: &NewCapPeriod,
        today: NaiveDate,
    ) -> Result<Option<Adjustment>, TimelineError> {
        if new.valid_from < today {
            return Err(TimelineError::InvalidDateRange(format!(
                "new cap periods must start today or later, got {} (today is {})",
                new.valid_from, today
            )));
        }
        if let Some(until) = new.valid_until {
            if until < new.valid_from {
                return Err(TimelineError::InvalidDateRange(format!(
                    "cap period ends {} before it starts {}",
                    until, new.valid_from
                )));
            }
        }

        let end = new.valid_until.unwrap_or(NaiveDate::MAX);
        let overlapping: Vec<&CapPeriod> = self
            .periods
            .iter()
            .filter(|p| p.valid_from <= end && new.valid_from <= p.end_or_max())
            .collect();

        match overlapping.as_slice() {
            [] => Ok(None),
            [predecessor]
                if predecessor.is_open_ended() && predecessor.valid_from < new.valid_from =>
            {
                Ok(Some(Adjustment {
                    period_id: predecessor.id,
                    previous_valid_until: None,
                    new_valid_until: Some(day_before(new.valid_from)),
                }))
            }
            conflicts => Err(TimelineError::OverlappingPeriods {
                conflicting: conflicts.iter().map(|p| p.id).collect(),
            }),
        }
    }

    /// Commit `period`, auto-truncating an open-ended predecessor when
    /// [`CapTimeline::plan_insert`] allows it.
    pub fn insert(
        &mut self,
        period: CapPeriod,
        today: NaiveDate,
    ) -> Result<Option<Adjustment>, TimelineError> {
        let new = NewCapPeriod {
            limit: period.limit,
            valid_from: period.valid_from,
            valid_until: period.valid_until,
            created_by: period.created_by,
        };
        let adjustment = self.plan_insert(&new, today)?;
        if let Some(adjustment) = adjustment {
            self.set_valid_until(adjustment.period_id, adjustment.new_valid_until);
        }
        self.periods.push(period);
        self.periods.sort_by_key(|p| p.valid_from);
        Ok(adjustment)
    }

    /// Decide the neighbour re-link that keeps the timeline contiguous
    /// after removing `id`, without mutating.
    ///
    /// The preceding period takes over: its `valid_until` becomes the day
    /// before the following period's `valid_from`, or `None` when nothing
    /// follows. Periods that are in effect or over are not deletable.
    pub fn plan_delete(
        &self,
        id: i64,
        today: NaiveDate,
    ) -> Result<Option<Adjustment>, TimelineError> {
        let index = self.index_of(id)?;
        let period = &self.periods[index];
        if period.has_started(today) {
            return Err(TimelineError::PeriodNotDeletable {
                id,
                valid_from: period.valid_from,
            });
        }
        let Some(previous) = index.checked_sub(1).map(|i| &self.periods[i]) else {
            return Ok(None);
        };
        let new_valid_until = self
            .periods
            .get(index + 1)
            .map(|next| day_before(next.valid_from));
        Ok(Some(Adjustment {
            period_id: previous.id,
            previous_valid_until: previous.valid_until,
            new_valid_until,
        }))
    }

    /// Remove a strictly-future period and re-link its neighbours.
    pub fn delete(
        &mut self,
        id: i64,
        today: NaiveDate,
    ) -> Result<(CapPeriod, Option<Adjustment>), TimelineError> {
        let adjustment = self.plan_delete(id, today)?;
        if let Some(adjustment) = adjustment {
            self.set_valid_until(adjustment.period_id, adjustment.new_valid_until);
        }
        let index = self.index_of(id)?;
        let removed = self.periods.remove(index);
        Ok((removed, adjustment))
    }

    /// Adjustments that would re-tile the timeline, without mutating.
    pub fn plan_recalculate(&self) -> Vec<Adjustment> {
        let mut adjustments = Vec::new();
        for (i, period) in self.periods.iter().enumerate() {
            let target = self
                .periods
                .get(i + 1)
                .map(|next| day_before(next.valid_from));
            if period.valid_until != target {
                adjustments.push(Adjustment {
                    period_id: period.id,
                    previous_valid_until: period.valid_until,
                    new_valid_until: target,
                });
            }
        }
        adjustments
    }

    /// Force-set every `valid_until` to the day before the next period's
    /// `valid_from` (the last period staying open-ended) and report what
    /// changed. Running it twice reports nothing the second time.
    pub fn recalculate(&mut self) -> Vec<Adjustment> {
        let adjustments = self.plan_recalculate();
        for adjustment in &adjustments {
            self.set_valid_until(adjustment.period_id, adjustment.new_valid_until);
        }
        adjustments
    }

    /// Flag exactly the period containing `today` as active. Returns the
    /// ids whose flag changed.
    pub fn set_active_flags(&mut self, today: NaiveDate) -> Vec<i64> {
        let mut changed = Vec::new();
        for period in &mut self.periods {
            let active = period.contains(today);
            if period.is_active != active {
                period.is_active = active;
                changed.push(period.id);
            }
        }
        changed
    }

    pub fn is_active(&self, id: i64) -> Option<bool> {
        self.periods.iter().find(|p| p.id == id).map(|p| p.is_active)
    }

    fn index_of(&self, id: i64) -> Result<usize, TimelineError> {
        self.periods
            .iter()
            .position(|p| p.id == id)
            .ok_or(TimelineError::PeriodNotFound { id })
    }

    fn set_valid_until(&mut self, id: i64, valid_until: Option<NaiveDate>) {
        if let Some(period) = self.periods.iter_mut().find(|p| p.id == id) {
            period.valid_until = valid_until;
        }
    }
}

fn day_before(date: NaiveDate) -> NaiveDate {
    date.pred_opt().expect("cap periods never start at the calendar origin")
}
