//! Billing-period date arithmetic.
//!
//! Converts a per-employee [`BillingPeriodConfig`] into concrete calendar
//! ranges. All arithmetic runs on [`chrono::NaiveDate`] — a plain
//! proleptic-Gregorian date with no timezone attached — so month and day
//! boundaries cannot drift with the host clock's zone.
//!
//! # Example
//!
//! ```
//! use chrono::NaiveDate;
//! use minijob_core::calculations::period::billing_period;
//! use minijob_core::models::BillingPeriodConfig;
//!
//! let config = BillingPeriodConfig::new(22, 21).unwrap();
//! let reference = NaiveDate::from_ymd_opt(2025, 7, 15).unwrap();
//!
//! let period = billing_period(&config, reference);
//!
//! assert_eq!(period.start, NaiveDate::from_ymd_opt(2025, 7, 22).unwrap());
//! assert_eq!(period.end, NaiveDate::from_ymd_opt(2025, 8, 21).unwrap());
//! assert_eq!(period.label(), "August 2025");
//! ```

use chrono::{Datelike, NaiveDate};

use crate::models::{BillingPeriodConfig, WorkPeriod};

/// Number of days in `month` of `year`.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        _ => 28,
    }
}

fn is_leap_year(year: i32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month == 12 { (year + 1, 1) } else { (year, month + 1) }
}

fn previous_month(year: i32, month: u32) -> (i32, u32) {
    if month == 1 { (year - 1, 12) } else { (year, month - 1) }
}

/// `day` within the given month, clamped to the month's last real day.
fn clamped_date(year: i32, month: u32, day: u32) -> NaiveDate {
    let day = day.min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day).expect("clamped day is valid for its month")
}

/// The 15th: the conventional reference day, far from both month edges.
fn mid_month(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 15).expect("day 15 exists in every month")
}

/// Materialize the billing period anchored on the reference date's month.
///
/// Same-month configurations produce `[start_day, end_day]` inside the
/// reference month. Cross-month configurations start in the reference month
/// and end in the following one, rolling December into January of the next
/// year. A configured day that does not exist in its month (29–31) clamps
/// to the month's last day.
pub fn billing_period(config: &BillingPeriodConfig, reference: NaiveDate) -> WorkPeriod {
    let (year, month) = (reference.year(), reference.month());
    let start = clamped_date(year, month, config.start_day());
    if config.crosses_month() {
        let (end_year, end_month) = next_month(year, month);
        WorkPeriod {
            start,
            end: clamped_date(end_year, end_month, config.end_day()),
            crosses_month: true,
        }
    } else {
        WorkPeriod {
            start,
            end: clamped_date(year, month, config.end_day()),
            crosses_month: false,
        }
    }
}

/// The period directly after `period` under the same configuration.
pub fn following_period(config: &BillingPeriodConfig, period: &WorkPeriod) -> WorkPeriod {
    let (year, month) = next_month(period.start.year(), period.start.month());
    billing_period(config, mid_month(year, month))
}

/// The chronological run of periods from the one covering `from` up to and
/// including `target`, stepping one reference month at a time.
///
/// When `from` sits in the gap between two configured windows the run
/// starts with the window anchored on `from`'s month. Empty when `target`
/// starts before the first period of the run.
pub fn periods_through(
    config: &BillingPeriodConfig,
    from: NaiveDate,
    target: &WorkPeriod,
) -> Vec<WorkPeriod> {
    let mut current = billing_period(config, from);
    if config.crosses_month() && current.start > from {
        // `from` lies before this month's start day, inside the window
        // anchored on the previous month.
        let (year, month) = previous_month(from.year(), from.month());
        current = billing_period(config, mid_month(year, month));
    }

    let mut run = Vec::new();
    while current.start <= target.start {
        run.push(current);
        current = following_period(config, &current);
    }
    run
}
