use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::Money;

/// An atomic unit of recorded work.
///
/// `earnings` arrives precomputed from the time-entry collaborator (hours
/// times hourly rate or similar); the engine only requires it to be
/// non-negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: i64,
    pub employee_id: i64,
    pub worked_on: NaiveDate,
    pub earnings: Money,
}
