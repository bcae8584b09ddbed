//! Orchestration over the storage boundary.
//!
//! [`PayrollService`] is the engine's only stateful mutation path. Each
//! call loads a consistent snapshot, plans against the pure
//! [`CapTimeline`], and hands the resulting [`TimelineChange`] to the
//! repository as one atomic batch — so the next `find_applicable_cap`
//! already sees the new timeline. The service itself holds no clock; the
//! caller supplies `today` where an operation depends on it.

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::calculations::carryover::CarryLedger;
use crate::calculations::period::billing_period;
use crate::db::{PayrollRepository, RepositoryError};
use crate::models::{CapPeriod, Money, NewCapPeriod, PeriodSummary};
use crate::timeline::{Adjustment, CapTimeline, TimelineChange, TimelineError};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error(transparent)]
    Timeline(#[from] TimelineError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("cap limit must be positive, got {0}")]
    InvalidLimit(Money),
}

pub struct PayrollService {
    repo: Box<dyn PayrollRepository>,
}

impl PayrollService {
    pub fn new(repo: Box<dyn PayrollRepository>) -> Self {
        Self { repo }
    }

    async fn timeline(&self) -> Result<CapTimeline, ServiceError> {
        let periods = self.repo.list_cap_periods().await?;
        debug!(count = periods.len(), "loaded cap timeline");
        Ok(CapTimeline::new(periods)?)
    }

    /// The cap period containing `date`, if any.
    pub async fn find_applicable_cap(
        &self,
        date: NaiveDate,
    ) -> Result<Option<CapPeriod>, ServiceError> {
        Ok(self.timeline().await?.find_applicable(date).cloned())
    }

    /// Insert a new cap period, auto-truncating an open-ended predecessor
    /// when that is the only conflict. Returns the committed row and the
    /// truncation, when one was applied.
    pub async fn insert_cap_period(
        &self,
        new: NewCapPeriod,
        today: NaiveDate,
    ) -> Result<(CapPeriod, Option<Adjustment>), ServiceError> {
        if new.limit <= Money::ZERO {
            return Err(ServiceError::InvalidLimit(new.limit));
        }
        let timeline = self.timeline().await?;
        let adjustment = timeline.plan_insert(&new, today)?;

        let mut change = TimelineChange { insert: Some(new), ..Default::default() };
        if let Some(adjustment) = adjustment {
            warn!(
                period_id = adjustment.period_id,
                new_valid_until = ?adjustment.new_valid_until,
                "truncating open-ended cap period to fit the new one"
            );
            change
                .set_valid_until
                .push((adjustment.period_id, adjustment.new_valid_until));
        }

        let inserted = self.repo.apply_timeline_change(&change).await?.ok_or_else(|| {
            RepositoryError::Database("Insert did not return the new cap period".to_string())
        })?;
        info!(id = inserted.id, valid_from = %inserted.valid_from, "cap period inserted");
        Ok((inserted, adjustment))
    }

    /// Delete a strictly-future cap period and re-link its neighbours.
    pub async fn delete_cap_period(
        &self,
        id: i64,
        today: NaiveDate,
    ) -> Result<Option<Adjustment>, ServiceError> {
        let timeline = self.timeline().await?;
        let adjustment = timeline.plan_delete(id, today)?;

        let mut change = TimelineChange { delete: Some(id), ..Default::default() };
        if let Some(adjustment) = adjustment {
            change
                .set_valid_until
                .push((adjustment.period_id, adjustment.new_valid_until));
        }

        self.repo.apply_timeline_change(&change).await?;
        info!(id, "cap period deleted");
        Ok(adjustment)
    }

    /// Edit a cap period's limit and, while it is still strictly future,
    /// its dates. The edited timeline must re-validate cleanly.
    pub async fn update_cap_period(
        &self,
        updated: CapPeriod,
        today: NaiveDate,
    ) -> Result<CapPeriod, ServiceError> {
        if updated.limit <= Money::ZERO {
            return Err(ServiceError::InvalidLimit(updated.limit));
        }
        let current = self.repo.get_cap_period(updated.id).await?;
        let dates_changed = current.valid_from != updated.valid_from
            || current.valid_until != updated.valid_until;
        if dates_changed && current.has_started(today) {
            return Err(TimelineError::InvalidDateRange(format!(
                "cap period {} already started {}; only its limit can be edited",
                current.id, current.valid_from
            ))
            .into());
        }

        let mut periods = self.repo.list_cap_periods().await?;
        if let Some(row) = periods.iter_mut().find(|p| p.id == updated.id) {
            *row = updated.clone();
        }
        CapTimeline::new(periods)?;

        let change = TimelineChange { update: Some(updated.clone()), ..Default::default() };
        self.repo.apply_timeline_change(&change).await?;
        info!(id = updated.id, "cap period updated");
        Ok(updated)
    }

    /// Force-retile the whole timeline, repairing drift from manual edits.
    /// Idempotent: a second run returns no adjustments.
    pub async fn recalculate_timeline(&self) -> Result<Vec<Adjustment>, ServiceError> {
        let periods = self.repo.list_cap_periods().await?;
        let (_, adjustments) = CapTimeline::recalculated(periods)?;
        if adjustments.is_empty() {
            return Ok(adjustments);
        }

        let change = TimelineChange {
            set_valid_until: adjustments
                .iter()
                .map(|a| (a.period_id, a.new_valid_until))
                .collect(),
            ..Default::default()
        };
        self.repo.apply_timeline_change(&change).await?;
        info!(adjusted = adjustments.len(), "cap timeline recalculated");
        Ok(adjustments)
    }

    /// Re-derive which period is active as of `today`. Returns the ids
    /// whose flag changed.
    pub async fn refresh_active_flags(&self, today: NaiveDate) -> Result<Vec<i64>, ServiceError> {
        let mut timeline = self.timeline().await?;
        let changed = timeline.set_active_flags(today);
        if changed.is_empty() {
            return Ok(changed);
        }

        let change = TimelineChange {
            set_active: changed
                .iter()
                .map(|&id| (id, timeline.is_active(id).unwrap_or(false)))
                .collect(),
            ..Default::default()
        };
        self.repo.apply_timeline_change(&change).await?;
        debug!(changed = changed.len(), "active flags refreshed");
        Ok(changed)
    }

    /// Excess rolled into the billing period anchored on the reference
    /// date's month, replayed from the employee's first recorded entry.
    pub async fn carry_in(
        &self,
        employee_id: i64,
        reference: NaiveDate,
    ) -> Result<Money, ServiceError> {
        Ok(self.period_summary(employee_id, reference).await?.carry_in)
    }

    /// Full settlement of the billing period anchored on the reference
    /// date's month: carry-in, payable amount, carry-out.
    pub async fn period_summary(
        &self,
        employee_id: i64,
        reference: NaiveDate,
    ) -> Result<PeriodSummary, ServiceError> {
        let employee = self.repo.get_employee(employee_id).await?;
        let target = billing_period(&employee.billing, reference);
        let timeline = self.timeline().await?;
        let first = self.repo.first_entry_date(employee_id).await?;
        let from = first.unwrap_or(target.start).min(target.start);
        let entries = self.repo.list_entries(employee_id, from, target.end).await?;

        let ledger = CarryLedger::new(&employee.billing, &timeline);
        Ok(ledger.summarize(&entries, &target))
    }
}
