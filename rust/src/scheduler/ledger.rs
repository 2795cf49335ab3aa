//! Run-scoped record of hours allocated per date.

use chrono::NaiveDate;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::models::DailyAllocation;

/// Capacity values below this are treated as zero.
pub const HOURS_EPSILON: f64 = 1e-9;

/// Rejected ledger mutation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("hours must be positive, got {0}")]
    NonPositiveHours(f64),
    #[error("{requested}h requested on {date} but only {remaining}h remain")]
    CapacityExceeded {
        date: NaiveDate,
        requested: f64,
        remaining: f64,
    },
}

/// Tracks aggregate allocated hours per date against a daily cap.
///
/// Invariant: every hour added through [`AllocationLedger::add`] keeps
/// `allocated(date) <= max_hours_per_day`. Seeded context hours are recorded
/// as-is; a date seeded beyond the cap simply has no remaining capacity.
#[derive(Clone, Debug)]
pub struct AllocationLedger {
    max_hours_per_day: f64,
    allocated: FxHashMap<NaiveDate, f64>,
}

impl AllocationLedger {
    pub fn new(max_hours_per_day: f64) -> Self {
        Self {
            max_hours_per_day,
            allocated: FxHashMap::default(),
        }
    }

    /// Create a ledger pre-loaded with already committed hours.
    pub fn seeded<'a, I>(max_hours_per_day: f64, committed: I) -> Self
    where
        I: IntoIterator<Item = (&'a NaiveDate, &'a f64)>,
    {
        let mut ledger = Self::new(max_hours_per_day);
        for (date, hours) in committed {
            ledger.seed(*date, *hours);
        }
        ledger
    }

    /// Record committed hours without enforcing the cap.
    ///
    /// Non-positive amounts are ignored.
    pub fn seed(&mut self, date: NaiveDate, hours: f64) {
        if hours > 0.0 {
            *self.allocated.entry(date).or_insert(0.0) += hours;
        }
    }

    pub fn max_hours_per_day(&self) -> f64 {
        self.max_hours_per_day
    }

    pub fn allocated(&self, date: NaiveDate) -> f64 {
        self.allocated.get(&date).copied().unwrap_or(0.0)
    }

    /// Hours still available on `date`, never negative.
    pub fn remaining_capacity(&self, date: NaiveDate) -> f64 {
        let remaining = self.max_hours_per_day - self.allocated(date);
        if remaining < HOURS_EPSILON {
            0.0
        } else {
            remaining
        }
    }

    /// Allocate `hours` on `date`.
    pub fn add(&mut self, date: NaiveDate, hours: f64) -> Result<(), LedgerError> {
        if hours.is_nan() || hours <= 0.0 {
            return Err(LedgerError::NonPositiveHours(hours));
        }
        let remaining = self.remaining_capacity(date);
        if hours > remaining + HOURS_EPSILON {
            return Err(LedgerError::CapacityExceeded {
                date,
                requested: hours,
                remaining,
            });
        }
        *self.allocated.entry(date).or_insert(0.0) += hours;
        Ok(())
    }

    /// Allocate every entry of a per-task allocation.
    ///
    /// Either all entries are committed or, on error, none are.
    pub fn commit(&mut self, allocation: &DailyAllocation) -> Result<(), LedgerError> {
        for (date, hours) in allocation {
            if hours.is_nan() || *hours <= 0.0 {
                return Err(LedgerError::NonPositiveHours(*hours));
            }
            let remaining = self.remaining_capacity(*date);
            if *hours > remaining + HOURS_EPSILON {
                return Err(LedgerError::CapacityExceeded {
                    date: *date,
                    requested: *hours,
                    remaining,
                });
            }
        }
        for (date, hours) in allocation {
            *self.allocated.entry(*date).or_insert(0.0) += *hours;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.allocated.is_empty()
    }

    /// Allocated hours per date (dates with zero hours omitted).
    pub fn snapshot(&self) -> DailyAllocation {
        self.allocated
            .iter()
            .filter(|(_, hours)| **hours > 0.0)
            .map(|(date, hours)| (*date, *hours))
            .collect()
    }

    /// Iterate allocated hours of every touched date, unordered.
    pub fn hours(&self) -> impl Iterator<Item = f64> + '_ {
        self.allocated.values().copied().filter(|h| *h > 0.0)
    }
}
