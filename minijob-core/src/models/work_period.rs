use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// A concrete `[start, end]` range produced by evaluating a billing
/// configuration against a reference month. Derived on demand, never
/// persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkPeriod {
    /// Inclusive first day.
    pub start: NaiveDate,
    /// Inclusive last day.
    pub end: NaiveDate,
    /// Whether the period runs into the month after the reference month.
    pub crosses_month: bool,
}

impl WorkPeriod {
    /// Whether `date` falls inside the period.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Year and month the period is reported under.
    ///
    /// Same-month periods are named after the month they lie in; a
    /// cross-month range like 22 July – 21 August reads naturally as
    /// "August", so those take the *end* month.
    pub fn label_month(&self) -> (i32, u32) {
        let date = if self.crosses_month { self.end } else { self.start };
        (date.year(), date.month())
    }

    /// Human-readable period name, e.g. `"August 2025"`.
    pub fn label(&self) -> String {
        let date = if self.crosses_month { self.end } else { self.start };
        date.format("%B %Y").to_string()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn contains_is_inclusive() {
        let period = WorkPeriod { start: ymd(2025, 7, 22), end: ymd(2025, 8, 21), crosses_month: true };

        assert!(period.contains(ymd(2025, 7, 22)));
        assert!(period.contains(ymd(2025, 8, 21)));
        assert!(!period.contains(ymd(2025, 7, 21)));
        assert!(!period.contains(ymd(2025, 8, 22)));
    }

    #[test]
    fn same_month_period_is_named_after_its_month() {
        let period = WorkPeriod { start: ymd(2025, 7, 1), end: ymd(2025, 7, 31), crosses_month: false };

        assert_eq!(period.label(), "July 2025");
        assert_eq!(period.label_month(), (2025, 7));
    }

    #[test]
    fn cross_month_period_is_named_after_its_end_month() {
        let period = WorkPeriod { start: ymd(2025, 7, 22), end: ymd(2025, 8, 21), crosses_month: true };

        assert_eq!(period.label(), "August 2025");
        assert_eq!(period.label_month(), (2025, 8));
    }
}
