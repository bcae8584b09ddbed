//! Billing-period and earnings carry-over engine for capped part-time
//! ("Minijob") employment.
//!
//! Three cooperating pieces:
//!
//! * [`calculations::period`] turns a per-employee billing window
//!   (`start_day`, `end_day`) into concrete calendar ranges, clamping
//!   days 29–31 to real month ends.
//! * [`timeline::CapTimeline`] owns the ordered, non-overlapping history
//!   of earnings-cap settings and the neighbour adjustments that keep it
//!   tiled across inserts, deletes, and recalculation.
//! * [`calculations::carryover`] replays an employee's history to split
//!   each period's earnings into the payable part and the excess carried
//!   into the next period.
//!
//! Storage is behind the async [`db::PayrollRepository`] boundary; the
//! computations themselves are pure and clock-free.

pub mod calculations;
pub mod db;
pub mod models;
pub mod service;
pub mod timeline;

pub use db::{DbConfig, PayrollRepository, RepositoryError, RepositoryFactory, RepositoryRegistry};
pub use models::{
    BillingPeriodConfig, CapPeriod, ConfigError, Employee, Entry, Money, MoneyError, NewCapPeriod,
    PeriodSummary, WorkPeriod,
};
pub use service::{PayrollService, ServiceError};
pub use timeline::{Adjustment, CapTimeline, TimelineChange, TimelineError};
