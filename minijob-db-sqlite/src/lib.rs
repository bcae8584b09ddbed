//! SQLite implementation of the payroll storage boundary.
//!
//! Monetary columns are INTEGER cents, dates are TEXT ISO-8601, and a
//! [`minijob_core::timeline::TimelineChange`] batch runs inside a single
//! transaction — a reader sees the cap timeline before or after a
//! mutation, never in between.

mod columns;
mod factory;
mod repository;

pub use factory::SqliteRepositoryFactory;
pub use repository::SqliteRepository;
