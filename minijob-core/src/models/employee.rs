use serde::{Deserialize, Serialize};

use super::BillingPeriodConfig;

/// Identity plus billing window, as supplied by the employee configuration
/// collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: i64,
    pub name: String,
    pub billing: BillingPeriodConfig,
}
