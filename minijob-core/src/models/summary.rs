use serde::{Deserialize, Serialize};

use super::{Money, WorkPeriod};

/// Settlement of one work period: what is payable under the cap and what
/// rolls into the next period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodSummary {
    pub period: WorkPeriod,
    /// Sum of entry earnings recorded inside the period.
    pub period_earnings: Money,
    /// Excess rolled in from earlier periods.
    pub carry_in: Money,
    /// `period_earnings + carry_in`.
    pub total: Money,
    /// Cap applicable to the period; `None` when no cap period covers it.
    pub cap: Option<Money>,
    /// Amount payable within the period.
    pub paid: Money,
    /// Excess rolled into the following period.
    pub carry_out: Money,
    /// Whether the period's total exceeded its cap.
    pub exceeds_limit: bool,
}
