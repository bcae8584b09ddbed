//! Pure, I/O-free computation: billing-period date arithmetic and the
//! carry-forward settlement that applies the cap history to it.

pub mod carryover;
pub mod period;

pub use carryover::{CarryCache, CarryLedger};
pub use period::{billing_period, days_in_month, following_period, periods_through};
