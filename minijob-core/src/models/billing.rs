use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors validating a billing configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("billing day must be between 1 and 31, got {0}")]
    DayOutOfRange(u32),
}

/// Per-employee billing window: the day of month the period starts and the
/// day it ends on.
///
/// With `start_day <= end_day` the period stays inside one calendar month;
/// otherwise it runs from `start_day` to `end_day` of the following month
/// (a window like 22nd–21st). Days 29–31 clamp to the last real day of
/// their month when materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingPeriodConfig {
    start_day: u32,
    end_day: u32,
}

impl BillingPeriodConfig {
    pub fn new(start_day: u32, end_day: u32) -> Result<Self, ConfigError> {
        for day in [start_day, end_day] {
            if !(1..=31).contains(&day) {
                return Err(ConfigError::DayOutOfRange(day));
            }
        }
        Ok(Self { start_day, end_day })
    }

    /// The 1st-through-31st window: whole calendar months.
    pub fn full_month() -> Self {
        Self { start_day: 1, end_day: 31 }
    }

    pub fn start_day(&self) -> u32 {
        self.start_day
    }

    pub fn end_day(&self) -> u32 {
        self.end_day
    }

    /// Whether configured periods span a month boundary.
    pub fn crosses_month(&self) -> bool {
        self.start_day > self.end_day
    }
}

impl Default for BillingPeriodConfig {
    fn default() -> Self {
        Self::full_month()
    }
}
