mod billing;
mod cap_period;
mod employee;
mod entry;
mod money;
mod summary;
mod work_period;

pub use billing::{BillingPeriodConfig, ConfigError};
pub use cap_period::{CapPeriod, NewCapPeriod};
pub use employee::Employee;
pub use entry::Entry;
pub use money::{Money, MoneyError};
pub use summary::PeriodSummary;
pub use work_period::WorkPeriod;
