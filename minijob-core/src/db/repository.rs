use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{CapPeriod, Employee, Entry};
use crate::timeline::TimelineChange;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Storage boundary of the engine.
///
/// The engine computes over consistent snapshots and expresses every
/// multi-record timeline mutation as one [`TimelineChange`]; the backend
/// must apply that change atomically, so a concurrent reader sees the
/// timeline either before or after the batch, never in between. Entry and
/// employee data is read-only here — recording work and managing staff
/// belong to other collaborators.
#[async_trait]
pub trait PayrollRepository: Send + Sync {
    // Cap periods
    async fn list_cap_periods(&self) -> Result<Vec<CapPeriod>, RepositoryError>;

    async fn get_cap_period(&self, id: i64) -> Result<CapPeriod, RepositoryError>;

    /// Apply the whole batch in a single transaction. Returns the inserted
    /// period, when the change carries one, with its assigned id.
    async fn apply_timeline_change(
        &self,
        change: &TimelineChange,
    ) -> Result<Option<CapPeriod>, RepositoryError>;

    // Entries
    async fn list_entries(
        &self,
        employee_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Entry>, RepositoryError>;

    async fn first_entry_date(
        &self,
        employee_id: i64,
    ) -> Result<Option<NaiveDate>, RepositoryError>;

    // Employees
    async fn get_employee(&self, id: i64) -> Result<Employee, RepositoryError>;
}

impl std::fmt::Debug for dyn PayrollRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn PayrollRepository")
    }
}
