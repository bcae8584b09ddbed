//! Carry-forward settlement across billing periods.
//!
//! An employee may earn more in a billing period than the cap allows to be
//! paid out; the excess is not lost but rolls into the next period, where
//! it competes with that period's own earnings for the payable amount.
//! Replaying the full history from the first recorded entry is the
//! correctness baseline. [`CarryCache`] memoizes per-period carry-outs so
//! repeated queries stay cheap without changing a single result.
//!
//! Each period settles as `carry_out = max(0, earnings + carry_in - cap)`;
//! the cap is resolved on the period's final day, the day it is paid out.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::calculations::period::periods_through;
use crate::models::{BillingPeriodConfig, Entry, Money, PeriodSummary, WorkPeriod};
use crate::timeline::CapTimeline;

/// Pure carry-over computation over a snapshot of entries and caps.
pub struct CarryLedger<'a> {
    billing: &'a BillingPeriodConfig,
    caps: &'a CapTimeline,
}

impl<'a> CarryLedger<'a> {
    pub fn new(billing: &'a BillingPeriodConfig, caps: &'a CapTimeline) -> Self {
        Self { billing, caps }
    }

    /// Cap applicable to a period, resolved on its final day.
    fn applicable_cap(&self, period: &WorkPeriod) -> Option<Money> {
        self.caps.find_applicable(period.end).map(|p| p.limit)
    }

    /// Earnings recorded inside `period`.
    fn period_earnings(entries: &[Entry], period: &WorkPeriod) -> Money {
        entries
            .iter()
            .filter(|e| period.contains(e.worked_on))
            .map(|e| e.earnings)
            .sum()
    }

    /// Carry-out of one period given the carry rolled into it. A period no
    /// cap covers pays everything out, draining the carry to zero.
    fn roll(&self, period: &WorkPeriod, entries: &[Entry], carry: Money) -> Money {
        let total = Self::period_earnings(entries, period) + carry;
        match self.applicable_cap(period) {
            Some(cap) => total.excess_over(cap),
            None => Money::ZERO,
        }
    }

    /// Excess rolled into `target` from every earlier period, replayed from
    /// the first recorded entry. Zero when there are no entries before the
    /// target.
    pub fn carry_in(&self, entries: &[Entry], target: &WorkPeriod) -> Money {
        let Some(first) = entries.iter().map(|e| e.worked_on).min() else {
            return Money::ZERO;
        };
        let mut carry = Money::ZERO;
        for period in periods_through(self.billing, first, target) {
            if period.start >= target.start {
                break;
            }
            carry = self.roll(&period, entries, carry);
        }
        carry
    }

    /// Like [`CarryLedger::carry_in`], reusing and filling `cache`.
    ///
    /// The cache fills front-to-back, so a hit means every predecessor was
    /// already settled with the same data; results are identical to the
    /// uncached replay.
    pub fn carry_in_cached(
        &self,
        cache: &mut CarryCache,
        entries: &[Entry],
        target: &WorkPeriod,
    ) -> Money {
        let Some(first) = entries.iter().map(|e| e.worked_on).min() else {
            return Money::ZERO;
        };
        let mut carry = Money::ZERO;
        for period in periods_through(self.billing, first, target) {
            if period.start >= target.start {
                break;
            }
            carry = match cache.get(period.start) {
                Some(cached) => cached,
                None => {
                    let rolled = self.roll(&period, entries, carry);
                    cache.put(period.start, rolled);
                    rolled
                }
            };
        }
        carry
    }

    /// Settle `target`: split its total into the payable part and the
    /// excess carried forward.
    pub fn summarize(&self, entries: &[Entry], target: &WorkPeriod) -> PeriodSummary {
        let carry_in = self.carry_in(entries, target);
        let period_earnings = Self::period_earnings(entries, target);
        let total = period_earnings + carry_in;
        let cap = self.applicable_cap(target);
        let (paid, carry_out) = match cap {
            Some(cap) => (total.min(cap), total.excess_over(cap)),
            None => (total, Money::ZERO),
        };
        PeriodSummary {
            period: *target,
            period_earnings,
            carry_in,
            total,
            cap,
            paid,
            carry_out,
            exceeds_limit: !carry_out.is_zero(),
        }
    }
}

/// Memoized per-period carry-outs, keyed by period start date.
///
/// A cached value is only correct while every entry in or before its period
/// and every cap covering it stay unchanged; call
/// [`CarryCache::invalidate_on_or_after`] with the affected date whenever
/// such a change happens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CarryCache {
    carry_out: BTreeMap<NaiveDate, Money>,
}

impl CarryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, period_start: NaiveDate) -> Option<Money> {
        self.carry_out.get(&period_start).copied()
    }

    fn put(&mut self, period_start: NaiveDate, carry: Money) {
        self.carry_out.insert(period_start, carry);
    }

    pub fn len(&self) -> usize {
        self.carry_out.len()
    }

    pub fn is_empty(&self) -> bool {
        self.carry_out.is_empty()
    }

    /// Drop the cached period containing `date` and everything after it.
    pub fn invalidate_on_or_after(&mut self, date: NaiveDate) {
        let from = self
            .carry_out
            .range(..=date)
            .next_back()
            .map(|(start, _)| *start)
            .unwrap_or(date);
        self.carry_out.split_off(&from);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::calculations::period::billing_period;
    use crate::models::CapPeriod;

    use super::*;

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn entry(id: i64, worked_on: NaiveDate, cents: i64) -> Entry {
        Entry {
            id,
            employee_id: 1,
            worked_on,
            earnings: Money::from_cents(cents),
        }
    }

    fn cap_from(id: i64, from: NaiveDate, until: Option<NaiveDate>, cents: i64) -> CapPeriod {
        CapPeriod {
            id,
            limit: Money::from_cents(cents),
            valid_from: from,
            valid_until: until,
            created_by: 1,
            is_active: false,
        }
    }

    /// A single open-ended 500.00 cap from 2024-01-01, as in the canonical
    /// carry-over example.
    fn flat_cap() -> CapTimeline {
        CapTimeline::new(vec![cap_from(1, ymd(2024, 1, 1), None, 50_000)]).unwrap()
    }

    #[test]
    fn excess_from_january_carries_into_february() {
        let billing = BillingPeriodConfig::full_month();
        let caps = flat_cap();
        let ledger = CarryLedger::new(&billing, &caps);
        let entries = vec![
            entry(1, ymd(2024, 1, 10), 35_000),
            entry(2, ymd(2024, 1, 24), 25_000),
        ];

        let january = billing_period(&billing, ymd(2024, 1, 15));
        let february = billing_period(&billing, ymd(2024, 2, 15));

        let jan = ledger.summarize(&entries, &january);
        assert_eq!(jan.period_earnings, Money::from_cents(60_000));
        assert_eq!(jan.paid, Money::from_cents(50_000));
        assert_eq!(jan.carry_out, Money::from_cents(10_000));
        assert!(jan.exceeds_limit);

        let feb = ledger.summarize(&entries, &february);
        assert_eq!(feb.carry_in, Money::from_cents(10_000));
        assert_eq!(feb.period_earnings, Money::ZERO);
        assert_eq!(feb.paid, Money::from_cents(10_000));
        assert_eq!(feb.carry_out, Money::ZERO);
        assert!(!feb.exceeds_limit);
    }

    #[test]
    fn carry_in_is_zero_without_entries() {
        let billing = BillingPeriodConfig::full_month();
        let caps = flat_cap();
        let ledger = CarryLedger::new(&billing, &caps);

        let target = billing_period(&billing, ymd(2024, 3, 15));

        assert_eq!(ledger.carry_in(&[], &target), Money::ZERO);
    }

    #[test]
    fn carry_accumulates_across_several_overflowing_periods() {
        let billing = BillingPeriodConfig::full_month();
        let caps = flat_cap();
        let ledger = CarryLedger::new(&billing, &caps);
        // 700 in January, 600 in February, nothing in March.
        let entries = vec![
            entry(1, ymd(2024, 1, 5), 70_000),
            entry(2, ymd(2024, 2, 5), 60_000),
        ];

        let march = billing_period(&billing, ymd(2024, 3, 15));

        // Jan: 700 -> carry 200. Feb: 600 + 200 -> carry 300.
        assert_eq!(ledger.carry_in(&entries, &march), Money::from_cents(30_000));
    }

    #[test]
    fn paid_amounts_plus_final_carry_conserve_total_earnings() {
        let billing = BillingPeriodConfig::full_month();
        let caps = flat_cap();
        let ledger = CarryLedger::new(&billing, &caps);
        let monthly_cents = [60_000, 20_000, 90_000, 0, 10_000];
        let entries: Vec<Entry> = monthly_cents
            .iter()
            .enumerate()
            .map(|(i, &cents)| entry(i as i64, ymd(2024, i as u32 + 1, 10), cents))
            .collect();

        let mut paid_total = Money::ZERO;
        let mut final_carry = Money::ZERO;
        for month in 1..=5 {
            let target = billing_period(&billing, ymd(2024, month, 15));
            let summary = ledger.summarize(&entries, &target);
            paid_total += summary.paid;
            final_carry = summary.carry_out;
        }

        let earned: Money = entries.iter().map(|e| e.earnings).sum();
        assert_eq!(paid_total + final_carry, earned);
    }

    #[test]
    fn a_cap_change_mid_history_changes_the_accumulated_carry() {
        let billing = BillingPeriodConfig::full_month();
        // 500.00 through February, 520.00 from March.
        let caps = CapTimeline::new(vec![
            cap_from(1, ymd(2024, 1, 1), Some(ymd(2024, 2, 29)), 50_000),
            cap_from(2, ymd(2024, 3, 1), None, 52_000),
        ])
        .unwrap();
        let ledger = CarryLedger::new(&billing, &caps);
        let entries = vec![
            entry(1, ymd(2024, 1, 5), 60_000),
            entry(2, ymd(2024, 2, 5), 50_000),
            entry(3, ymd(2024, 3, 5), 51_000),
        ];

        let april = billing_period(&billing, ymd(2024, 4, 15));

        // Jan: 600 -> carry 100. Feb: 500 + 100 -> carry 100 under the old
        // cap. Mar: 510 + 100 = 610 against 520 -> carry 90.
        assert_eq!(ledger.carry_in(&entries, &april), Money::from_cents(9_000));
    }

    #[test]
    fn an_uncapped_period_drains_the_carry() {
        let billing = BillingPeriodConfig::full_month();
        // The cap history only begins in March.
        let caps = CapTimeline::new(vec![cap_from(1, ymd(2024, 3, 1), None, 50_000)]).unwrap();
        let ledger = CarryLedger::new(&billing, &caps);
        let entries = vec![entry(1, ymd(2024, 1, 5), 80_000)];

        let february = billing_period(&billing, ymd(2024, 2, 15));
        let jan = ledger.summarize(&entries, &billing_period(&billing, ymd(2024, 1, 15)));

        assert_eq!(jan.cap, None);
        assert_eq!(jan.paid, Money::from_cents(80_000));
        assert_eq!(ledger.carry_in(&entries, &february), Money::ZERO);
    }

    #[test]
    fn cross_month_windows_settle_on_their_end_month_cap() {
        let billing = BillingPeriodConfig::new(22, 21).unwrap();
        // Cap rises with the new year; the Dec 22 – Jan 21 window settles
        // against the January value.
        let caps = CapTimeline::new(vec![
            cap_from(1, ymd(2024, 1, 1), Some(ymd(2024, 12, 31)), 53_800),
            cap_from(2, ymd(2025, 1, 1), None, 55_600),
        ])
        .unwrap();
        let ledger = CarryLedger::new(&billing, &caps);
        let entries = vec![entry(1, ymd(2024, 12, 23), 60_000)];

        let window = billing_period(&billing, ymd(2024, 12, 15));
        let summary = ledger.summarize(&entries, &window);

        assert_eq!(summary.cap, Some(Money::from_cents(55_600)));
        assert_eq!(summary.carry_out, Money::from_cents(4_400));
    }

    // ── cache ────────────────────────────────────────────────────────────

    #[test]
    fn cached_replay_matches_the_uncached_one() {
        let billing = BillingPeriodConfig::full_month();
        let caps = flat_cap();
        let ledger = CarryLedger::new(&billing, &caps);
        let entries = vec![
            entry(1, ymd(2024, 1, 5), 70_000),
            entry(2, ymd(2024, 2, 5), 60_000),
            entry(3, ymd(2024, 4, 5), 20_000),
        ];
        let target = billing_period(&billing, ymd(2024, 6, 15));
        let mut cache = CarryCache::new();

        let cold = ledger.carry_in_cached(&mut cache, &entries, &target);
        let warm = ledger.carry_in_cached(&mut cache, &entries, &target);

        assert_eq!(cold, ledger.carry_in(&entries, &target));
        assert_eq!(warm, cold);
        assert_eq!(cache.len(), 5);
    }

    #[test]
    fn invalidation_recomputes_after_an_entry_change() {
        let billing = BillingPeriodConfig::full_month();
        let caps = flat_cap();
        let ledger = CarryLedger::new(&billing, &caps);
        let mut entries = vec![
            entry(1, ymd(2024, 1, 5), 70_000),
            entry(2, ymd(2024, 2, 5), 60_000),
        ];
        let target = billing_period(&billing, ymd(2024, 4, 15));
        let mut cache = CarryCache::new();
        ledger.carry_in_cached(&mut cache, &entries, &target);

        // A February entry changes: February and everything after it must
        // be resettled.
        entries[1].earnings = Money::from_cents(40_000);
        cache.invalidate_on_or_after(ymd(2024, 2, 5));

        let recomputed = ledger.carry_in_cached(&mut cache, &entries, &target);
        assert_eq!(recomputed, ledger.carry_in(&entries, &target));
        assert_eq!(recomputed, Money::ZERO);
    }

    #[test]
    fn invalidation_keeps_untouched_prefix_periods() {
        let billing = BillingPeriodConfig::full_month();
        let caps = flat_cap();
        let ledger = CarryLedger::new(&billing, &caps);
        let entries = vec![
            entry(1, ymd(2024, 1, 5), 70_000),
            entry(2, ymd(2024, 2, 5), 60_000),
            entry(3, ymd(2024, 3, 5), 10_000),
        ];
        let target = billing_period(&billing, ymd(2024, 5, 15));
        let mut cache = CarryCache::new();
        ledger.carry_in_cached(&mut cache, &entries, &target);
        assert_eq!(cache.len(), 4);

        cache.invalidate_on_or_after(ymd(2024, 3, 10));

        // January and February survive.
        assert_eq!(cache.len(), 2);
    }
}
