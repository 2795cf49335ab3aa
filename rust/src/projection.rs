//! Display-side workload projection.
//!
//! Estimates a daily-hours distribution for tasks that have a manually set
//! planned window but no optimizer-produced allocation. Never feeds back into
//! the optimizer.

use chrono::NaiveDate;
use rustc_hash::FxHashSet;

use crate::calendar::{days_between, ActualSchedule, HolidayLookup, WeekdayOnly, WorkingDayCalendar};
use crate::models::{DailyAllocation, TaskSnapshot};

/// Spreads a task's estimate evenly across the working days of its window.
pub struct WorkloadProjector {
    calendar: Box<dyn WorkingDayCalendar>,
    /// Spread across every day of the window when it has no working day
    fallback_to_all_days: bool,
}

impl WorkloadProjector {
    /// Weekdays only; a window without weekdays projects to nothing.
    pub fn weekday_only() -> Self {
        Self {
            calendar: Box::new(WeekdayOnly),
            fallback_to_all_days: false,
        }
    }

    /// Weekdays minus holidays, falling back to all days of the window.
    pub fn actual_schedule<H>(holidays: Option<H>) -> Self
    where
        H: HolidayLookup + 'static,
    {
        Self {
            calendar: Box::new(ActualSchedule::new(holidays)),
            fallback_to_all_days: true,
        }
    }

    /// Actual-schedule projection without any holiday source.
    pub fn actual_schedule_without_holidays() -> Self {
        Self::actual_schedule::<FxHashSet<NaiveDate>>(None)
    }

    /// Projected hours per date for one task.
    ///
    /// An existing allocation is returned unchanged. Tasks without a planned
    /// window or a positive estimate project to an empty map.
    pub fn project(&self, task: &TaskSnapshot) -> DailyAllocation {
        if !task.daily_allocation.is_empty() {
            return task.daily_allocation.clone();
        }
        match (task.planned, task.positive_duration()) {
            (Some(window), Some(hours)) => {
                self.distribute(hours, window.start_date(), window.end_date())
            }
            _ => DailyAllocation::new(),
        }
    }

    /// Spread `hours` evenly over `[start, end]`.
    pub fn distribute(&self, hours: f64, start: NaiveDate, end: NaiveDate) -> DailyAllocation {
        let working: Vec<NaiveDate> = days_between(start, end)
            .filter(|date| self.calendar.is_working_day(*date))
            .collect();

        let days = if working.is_empty() && self.fallback_to_all_days {
            days_between(start, end).collect()
        } else {
            working
        };

        if days.is_empty() {
            return DailyAllocation::new();
        }
        let per_day = hours / days.len() as f64;
        days.into_iter().map(|date| (date, per_day)).collect()
    }

    /// Sum of projected hours per date across `tasks`.
    pub fn project_total<'a, I>(&self, tasks: I) -> DailyAllocation
    where
        I: IntoIterator<Item = &'a TaskSnapshot>,
    {
        let mut total = DailyAllocation::new();
        for task in tasks {
            for (date, hours) in self.project(task) {
                *total.entry(date).or_insert(0.0) += hours;
            }
        }
        total
    }
}
