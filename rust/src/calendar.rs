//! Working-day calendar policies.
//!
//! A calendar decides which dates are eligible for work. The optimizer uses
//! [`WeekdayOnly`] (or [`AllDays`] when weekend work is allowed) and never
//! consults holidays. [`ActualSchedule`] additionally skips holidays and is only
//! used for display-side workload projection.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use rustc_hash::FxHashSet;
use std::collections::{BTreeSet, HashSet};

/// Capability that flags a date as a public holiday.
pub trait HolidayLookup {
    fn is_holiday(&self, date: NaiveDate) -> bool;
}

impl HolidayLookup for FxHashSet<NaiveDate> {
    fn is_holiday(&self, date: NaiveDate) -> bool {
        self.contains(&date)
    }
}

impl HolidayLookup for HashSet<NaiveDate> {
    fn is_holiday(&self, date: NaiveDate) -> bool {
        self.contains(&date)
    }
}

impl HolidayLookup for BTreeSet<NaiveDate> {
    fn is_holiday(&self, date: NaiveDate) -> bool {
        self.contains(&date)
    }
}

impl<F> HolidayLookup for F
where
    F: Fn(NaiveDate) -> bool,
{
    fn is_holiday(&self, date: NaiveDate) -> bool {
        self(date)
    }
}

/// Policy deciding which calendar dates are eligible for work.
pub trait WorkingDayCalendar {
    fn is_working_day(&self, date: NaiveDate) -> bool;

    /// Number of working days in the inclusive range `[start, end]`.
    ///
    /// Returns 0 when `end < start`.
    fn count_working_days(&self, start: NaiveDate, end: NaiveDate) -> usize {
        days_between(start, end)
            .filter(|date| self.is_working_day(*date))
            .count()
    }
}

fn is_weekday(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Iterate every date in the inclusive range `[start, end]`.
pub fn days_between(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    let mut current = Some(start);
    std::iter::from_fn(move || {
        let date = current.filter(|d| *d <= end)?;
        current = date.checked_add_days(Days::new(1));
        Some(date)
    })
}

/// Monday through Friday, regardless of holidays.
#[derive(Clone, Copy, Debug, Default)]
pub struct WeekdayOnly;

impl WorkingDayCalendar for WeekdayOnly {
    fn is_working_day(&self, date: NaiveDate) -> bool {
        is_weekday(date)
    }
}

/// Every date is a working day.
#[derive(Clone, Copy, Debug, Default)]
pub struct AllDays;

impl WorkingDayCalendar for AllDays {
    fn is_working_day(&self, _date: NaiveDate) -> bool {
        true
    }
}

/// Weekdays that are not holidays.
///
/// Without a holiday lookup this behaves exactly like [`WeekdayOnly`].
#[derive(Clone, Debug)]
pub struct ActualSchedule<H> {
    holidays: Option<H>,
}

impl<H: HolidayLookup> ActualSchedule<H> {
    pub fn new(holidays: Option<H>) -> Self {
        Self { holidays }
    }

    pub fn with_holidays(holidays: H) -> Self {
        Self::new(Some(holidays))
    }
}

impl ActualSchedule<FxHashSet<NaiveDate>> {
    /// Calendar with no holiday source.
    pub fn without_holidays() -> Self {
        Self { holidays: None }
    }
}

impl<H: HolidayLookup> WorkingDayCalendar for ActualSchedule<H> {
    fn is_working_day(&self, date: NaiveDate) -> bool {
        if !is_weekday(date) {
            return false;
        }
        match &self.holidays {
            Some(lookup) => !lookup.is_holiday(date),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_weekday_only() {
        let cal = WeekdayOnly;
        assert!(cal.is_working_day(d(2025, 1, 3))); // Friday
        assert!(!cal.is_working_day(d(2025, 1, 4))); // Saturday
        assert!(!cal.is_working_day(d(2025, 1, 5))); // Sunday
        assert!(cal.is_working_day(d(2025, 1, 6))); // Monday
    }

    #[test]
    fn test_weekday_only_ignores_holidays() {
        // New Year's Day is a Wednesday in 2025
        assert!(WeekdayOnly.is_working_day(d(2025, 1, 1)));
    }

    #[test]
    fn test_count_working_days() {
        // Wed Jan 1 .. Tue Jan 7: Wed, Thu, Fri, Mon, Tue
        assert_eq!(WeekdayOnly.count_working_days(d(2025, 1, 1), d(2025, 1, 7)), 5);
        assert_eq!(AllDays.count_working_days(d(2025, 1, 1), d(2025, 1, 7)), 7);
        assert_eq!(WeekdayOnly.count_working_days(d(2025, 1, 4), d(2025, 1, 5)), 0);
        assert_eq!(WeekdayOnly.count_working_days(d(2025, 1, 7), d(2025, 1, 1)), 0);
    }

    #[test]
    fn test_actual_schedule_with_holidays() {
        let holidays: FxHashSet<NaiveDate> = [d(2025, 1, 1)].into_iter().collect();
        let cal = ActualSchedule::with_holidays(holidays);
        assert!(!cal.is_working_day(d(2025, 1, 1)));
        assert!(cal.is_working_day(d(2025, 1, 2)));
        assert!(!cal.is_working_day(d(2025, 1, 4)));
        assert_eq!(cal.count_working_days(d(2025, 1, 1), d(2025, 1, 7)), 4);
    }

    #[test]
    fn test_actual_schedule_without_lookup() {
        let cal = ActualSchedule::without_holidays();
        assert!(cal.is_working_day(d(2025, 1, 1)));
        assert!(!cal.is_working_day(d(2025, 1, 4)));
    }

    #[test]
    fn test_closure_lookup() {
        let cal = ActualSchedule::with_holidays(|date: NaiveDate| date.day() == 2);
        assert!(!cal.is_working_day(d(2025, 1, 2)));
        assert!(cal.is_working_day(d(2025, 1, 3)));
    }

    #[test]
    fn test_days_between() {
        let days: Vec<_> = days_between(d(2025, 1, 30), d(2025, 2, 2)).collect();
        assert_eq!(days.len(), 4);
        assert_eq!(days[3], d(2025, 2, 2));
        assert_eq!(days_between(d(2025, 1, 2), d(2025, 1, 1)).count(), 0);
    }
}
