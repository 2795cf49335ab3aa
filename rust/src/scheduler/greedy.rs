//! Deterministic single-pass hour allocator.
//!
//! Walks forward day by day from the start date and fills each working day up
//! to its remaining capacity until a task's estimate is consumed. Also serves
//! as the decoder for the genetic search.

use chrono::{Days, NaiveDate, NaiveTime};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::calendar::{days_between, AllDays, WeekdayOnly, WorkingDayCalendar};
use crate::config::OptimizeParams;
use crate::logging::VERBOSITY_SILENT;
use crate::models::{DailyAllocation, FailureReason, ScheduledTask, TaskFailure, TaskSnapshot};
use crate::sorting::dependency_order;
use crate::{log_changes, log_checks, log_debug};

use super::ledger::{AllocationLedger, HOURS_EPSILON};

/// Successes and failures of one allocation pass, in processing order.
#[derive(Clone, Debug, Default)]
pub struct GreedyOutcome {
    pub scheduled: Vec<ScheduledTask>,
    pub failures: Vec<TaskFailure>,
}

/// Greedy allocator over an ordered task list.
pub struct GreedyScheduler {
    calendar: Box<dyn WorkingDayCalendar>,
    start_date: NaiveDate,
    horizon_days: u32,
    force_override: bool,
    work_day_start: NaiveTime,
    work_day_end: NaiveTime,
    /// Last scheduled date of dependencies that are not part of the batch
    external_ends: FxHashMap<String, NaiveDate>,
    verbosity: u8,
}

impl GreedyScheduler {
    /// Create a scheduler using the weekday-only calendar and default limits.
    pub fn new(start_date: NaiveDate) -> Self {
        let defaults = OptimizeParams::default();
        Self {
            calendar: Box::new(WeekdayOnly),
            start_date,
            horizon_days: defaults.horizon_days,
            force_override: false,
            work_day_start: defaults.work_day_start,
            work_day_end: defaults.work_day_end,
            external_ends: FxHashMap::default(),
            verbosity: VERBOSITY_SILENT,
        }
    }

    pub fn from_params(params: &OptimizeParams) -> Self {
        let calendar: Box<dyn WorkingDayCalendar> = if params.include_all_days {
            Box::new(AllDays)
        } else {
            Box::new(WeekdayOnly)
        };
        Self {
            calendar,
            start_date: params.start_date,
            horizon_days: params.horizon_days,
            force_override: params.force_override,
            work_day_start: params.work_day_start,
            work_day_end: params.work_day_end,
            external_ends: FxHashMap::default(),
            verbosity: params.verbosity,
        }
    }

    pub fn with_calendar(mut self, calendar: Box<dyn WorkingDayCalendar>) -> Self {
        self.calendar = calendar;
        self
    }

    pub fn with_horizon_days(mut self, horizon_days: u32) -> Self {
        self.horizon_days = horizon_days;
        self
    }

    pub fn with_force_override(mut self, force_override: bool) -> Self {
        self.force_override = force_override;
        self
    }

    pub fn with_external_ends(mut self, external_ends: FxHashMap<String, NaiveDate>) -> Self {
        self.external_ends = external_ends;
        self
    }

    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    /// Schedule `tasks` in slice order.
    pub fn schedule(&self, tasks: &[TaskSnapshot], ledger: &mut AllocationLedger) -> GreedyOutcome {
        let order: Vec<usize> = (0..tasks.len()).collect();
        self.schedule_order(tasks, &order, ledger)
    }

    /// Schedule the tasks at the given indices, in that order.
    ///
    /// The order is first adjusted so tasks follow their in-batch
    /// dependencies. Successful placements are committed to `ledger`.
    pub fn schedule_order(
        &self,
        tasks: &[TaskSnapshot],
        order: &[usize],
        ledger: &mut AllocationLedger,
    ) -> GreedyOutcome {
        let order = dependency_order(tasks, order);
        let batch_ids: FxHashSet<&str> = order.iter().map(|&i| tasks[i].id.as_str()).collect();
        let mut placed_ends: FxHashMap<&str, NaiveDate> = FxHashMap::default();
        let mut outcome = GreedyOutcome::default();

        for &idx in &order {
            let task = &tasks[idx];

            if let (true, Some(window), false) = (task.is_fixed, task.planned, self.force_override) {
                log_checks!(self.verbosity, "Skipping fixed task {}", task.id);
                placed_ends.insert(task.id.as_str(), window.end_date());
                continue;
            }
            let Some(hours) = task.positive_duration() else {
                log_checks!(self.verbosity, "Skipping {}: no estimated duration", task.id);
                continue;
            };

            let earliest = match self.dependency_gate(task, &batch_ids, &placed_ends) {
                Ok(date) => date,
                Err(reason) => {
                    log_changes!(self.verbosity, "Task {} failed: {}", task.id, reason);
                    outcome
                        .failures
                        .push(TaskFailure::new(&task.id, reason).with_priority(task.priority));
                    continue;
                }
            };

            let Some(allocation) = self.allocate(&task.id, hours, earliest, ledger) else {
                let reason = FailureReason::HorizonExhausted {
                    horizon_days: self.horizon_days,
                };
                log_changes!(self.verbosity, "Task {} failed: {}", task.id, reason);
                outcome
                    .failures
                    .push(TaskFailure::new(&task.id, reason).with_priority(task.priority));
                continue;
            };

            if let Err(err) = ledger.commit(&allocation) {
                log_changes!(self.verbosity, "Task {} rejected by ledger: {}", task.id, err);
                outcome
                    .failures
                    .push(TaskFailure::new(&task.id, err.into()).with_priority(task.priority));
                continue;
            }

            let (Some((&first, _)), Some((&last, _))) =
                (allocation.first_key_value(), allocation.last_key_value())
            else {
                continue;
            };
            log_changes!(
                self.verbosity,
                "Scheduled {} ({:.2}h) {} -> {}",
                task.id,
                hours,
                first,
                last
            );
            placed_ends.insert(task.id.as_str(), last);
            outcome.scheduled.push(ScheduledTask {
                task_id: task.id.clone(),
                priority: task.priority,
                deadline: task.deadline,
                estimated_duration: hours,
                planned_start: first.and_time(self.work_day_start),
                planned_end: last.and_time(self.work_day_end),
                daily_allocation: allocation,
            });
        }

        outcome
    }

    /// Earliest date the task may start given its dependencies.
    fn dependency_gate(
        &self,
        task: &TaskSnapshot,
        batch_ids: &FxHashSet<&str>,
        placed_ends: &FxHashMap<&str, NaiveDate>,
    ) -> Result<NaiveDate, FailureReason> {
        let mut earliest = self.start_date;
        for dep in task.depends_on.iter().filter(|dep| **dep != task.id) {
            if let Some(&end) = placed_ends.get(dep.as_str()) {
                earliest = earliest.max(end);
            } else if batch_ids.contains(dep.as_str()) {
                return Err(FailureReason::UnresolvedDependency {
                    dependency_id: dep.clone(),
                });
            } else if let Some(&end) = self.external_ends.get(dep) {
                earliest = earliest.max(end);
            }
        }
        if earliest > self.start_date {
            log_checks!(self.verbosity, "Task {} gated until {}", task.id, earliest);
        }
        Ok(earliest)
    }

    /// Plan `hours` forward from `from` without touching the ledger.
    ///
    /// Returns `None` when the horizon is exhausted first.
    fn allocate(
        &self,
        task_id: &str,
        hours: f64,
        from: NaiveDate,
        ledger: &AllocationLedger,
    ) -> Option<DailyAllocation> {
        let last_day = from
            .checked_add_days(Days::new(u64::from(self.horizon_days.saturating_sub(1))))
            .unwrap_or(NaiveDate::MAX);
        let mut needed = hours;
        let mut allocation = DailyAllocation::new();

        for date in days_between(from, last_day) {
            if !self.calendar.is_working_day(date) {
                continue;
            }
            let available = ledger.remaining_capacity(date);
            if available <= HOURS_EPSILON {
                continue;
            }
            let take = available.min(needed);
            log_debug!(self.verbosity, "{}: {:.2}h on {}", task_id, take, date);
            allocation.insert(date, take);
            needed -= take;
            if needed <= HOURS_EPSILON {
                return Some(allocation);
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn wednesday() -> NaiveDate {
        d(2025, 1, 1)
    }

    fn total(task: &ScheduledTask) -> f64 {
        task.daily_allocation.values().sum()
    }

    #[test]
    fn test_single_task_fits_one_day() {
        let tasks = vec![TaskSnapshot::new("a", 100).with_duration(4.0)];
        let mut ledger = AllocationLedger::new(6.0);
        let outcome = GreedyScheduler::new(wednesday()).schedule(&tasks, &mut ledger);

        assert_eq!(outcome.scheduled.len(), 1);
        let task = &outcome.scheduled[0];
        assert_eq!(task.daily_allocation.len(), 1);
        assert_eq!(task.daily_allocation[&wednesday()], 4.0);
        assert_eq!(task.start_date(), wednesday());
        assert_eq!(task.end_date(), wednesday());
    }

    #[test]
    fn test_second_task_spills_into_next_day() {
        let tasks = vec![
            TaskSnapshot::new("task1", 200).with_duration(5.0),
            TaskSnapshot::new("task2", 100).with_duration(5.0),
        ];
        let mut ledger = AllocationLedger::new(6.0);
        let outcome = GreedyScheduler::new(wednesday()).schedule(&tasks, &mut ledger);

        let task1 = &outcome.scheduled[0];
        let task2 = &outcome.scheduled[1];
        assert_eq!(task1.daily_allocation[&wednesday()], 5.0);
        assert!((task2.daily_allocation[&wednesday()] - 1.0).abs() < 1e-9);
        assert!((task2.daily_allocation[&d(2025, 1, 2)] - 4.0).abs() < 1e-9);
        assert_eq!(task2.end_date(), d(2025, 1, 2));
        assert!((ledger.allocated(wednesday()) - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_friday_task_stays_off_weekend() {
        let tasks = vec![TaskSnapshot::new("a", 1).with_duration(5.0)];
        let mut ledger = AllocationLedger::new(6.0);
        let outcome = GreedyScheduler::new(d(2025, 1, 3)).schedule(&tasks, &mut ledger);

        let task = &outcome.scheduled[0];
        assert_eq!(task.daily_allocation.len(), 1);
        assert_eq!(task.daily_allocation[&d(2025, 1, 3)], 5.0);
    }

    #[test]
    fn test_long_task_skips_weekend() {
        let tasks = vec![TaskSnapshot::new("a", 1).with_duration(10.0)];
        let mut ledger = AllocationLedger::new(6.0);
        let outcome = GreedyScheduler::new(d(2025, 1, 3)).schedule(&tasks, &mut ledger);

        let task = &outcome.scheduled[0];
        assert_eq!(task.start_date(), d(2025, 1, 3));
        assert_eq!(task.end_date(), d(2025, 1, 6));
        assert!(!task.daily_allocation.contains_key(&d(2025, 1, 4)));
        assert!(!task.daily_allocation.contains_key(&d(2025, 1, 5)));
        assert!((total(task) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_all_days_calendar_uses_weekend() {
        let tasks = vec![TaskSnapshot::new("a", 1).with_duration(10.0)];
        let mut ledger = AllocationLedger::new(6.0);
        let outcome = GreedyScheduler::new(d(2025, 1, 3))
            .with_calendar(Box::new(AllDays))
            .schedule(&tasks, &mut ledger);
        assert_eq!(outcome.scheduled[0].end_date(), d(2025, 1, 4));
    }

    #[test]
    fn test_weekend_start_moves_to_monday() {
        let tasks = vec![TaskSnapshot::new("a", 1).with_duration(2.0)];
        let mut ledger = AllocationLedger::new(6.0);
        let outcome = GreedyScheduler::new(d(2025, 1, 4))
            .with_calendar(Box::new(WeekdayOnly))
            .schedule(&tasks, &mut ledger);
        assert_eq!(outcome.scheduled[0].start_date(), d(2025, 1, 6));
    }

    #[test]
    fn test_horizon_exhausted_commits_nothing() {
        let tasks = vec![
            TaskSnapshot::new("big", 2).with_duration(100.0),
            TaskSnapshot::new("small", 1).with_duration(2.0),
        ];
        let mut ledger = AllocationLedger::new(6.0);
        let outcome = GreedyScheduler::new(wednesday())
            .with_horizon_days(7)
            .schedule(&tasks, &mut ledger);

        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].task_id, "big");
        assert!(matches!(
            outcome.failures[0].reason,
            FailureReason::HorizonExhausted { horizon_days: 7 }
        ));
        // Failure must not consume capacity needed by later tasks
        assert_eq!(outcome.scheduled[0].task_id, "small");
        assert_eq!(outcome.scheduled[0].start_date(), wednesday());
        assert!((ledger.allocated(wednesday()) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_respects_seeded_ledger() {
        let tasks = vec![TaskSnapshot::new("a", 1).with_duration(3.0)];
        let mut ledger = AllocationLedger::new(6.0);
        ledger.seed(wednesday(), 6.0);
        ledger.seed(d(2025, 1, 2), 4.0);
        let outcome = GreedyScheduler::new(wednesday()).schedule(&tasks, &mut ledger);

        let task = &outcome.scheduled[0];
        assert!(!task.daily_allocation.contains_key(&wednesday()));
        assert_eq!(task.daily_allocation[&d(2025, 1, 2)], 2.0);
        assert_eq!(task.daily_allocation[&d(2025, 1, 3)], 1.0);
    }

    #[test]
    fn test_daily_cap_never_exceeded() {
        let tasks: Vec<TaskSnapshot> = (0..12)
            .map(|i| TaskSnapshot::new(format!("t{}", i), i).with_duration(1.5 + i as f64 * 0.7))
            .collect();
        let mut ledger = AllocationLedger::new(5.5);
        let outcome = GreedyScheduler::new(wednesday()).schedule(&tasks, &mut ledger);

        assert!(outcome.failures.is_empty());
        for hours in ledger.hours() {
            assert!(hours <= 5.5 + 1e-9);
        }
        for (task, scheduled) in tasks.iter().zip(&outcome.scheduled) {
            assert!((total(scheduled) - task.estimated_duration.unwrap()).abs() < 1e-9);
        }
    }

    #[test]
    fn test_fixed_task_skipped_unless_forced() {
        let start = wednesday().and_hms_opt(9, 0, 0).unwrap();
        let end = wednesday().and_hms_opt(18, 0, 0).unwrap();
        let tasks = vec![TaskSnapshot::new("fixed", 1)
            .with_duration(2.0)
            .with_planned(start, end)
            .fixed()];

        let mut ledger = AllocationLedger::new(6.0);
        let outcome = GreedyScheduler::new(wednesday()).schedule(&tasks, &mut ledger);
        assert!(outcome.scheduled.is_empty());
        assert!(outcome.failures.is_empty());

        let mut ledger = AllocationLedger::new(6.0);
        let outcome = GreedyScheduler::new(wednesday())
            .with_force_override(true)
            .schedule(&tasks, &mut ledger);
        assert_eq!(outcome.scheduled.len(), 1);
    }

    #[test]
    fn test_dependency_scheduled_first() {
        let tasks = vec![
            TaskSnapshot::new("child", 200)
                .with_duration(2.0)
                .with_dependency("parent"),
            TaskSnapshot::new("parent", 100).with_duration(8.0),
        ];
        let mut ledger = AllocationLedger::new(6.0);
        let outcome = GreedyScheduler::new(wednesday()).schedule(&tasks, &mut ledger);

        assert_eq!(outcome.scheduled[0].task_id, "parent");
        let child = &outcome.scheduled[1];
        // parent ends Thursday with 2h used, child starts there
        assert_eq!(child.start_date(), d(2025, 1, 2));
    }

    #[test]
    fn test_failed_dependency_fails_dependent() {
        let tasks = vec![
            TaskSnapshot::new("parent", 2).with_duration(500.0),
            TaskSnapshot::new("child", 1)
                .with_duration(1.0)
                .with_dependency("parent"),
        ];
        let mut ledger = AllocationLedger::new(6.0);
        let outcome = GreedyScheduler::new(wednesday())
            .with_horizon_days(30)
            .schedule(&tasks, &mut ledger);

        assert!(outcome.scheduled.is_empty());
        assert_eq!(outcome.failures.len(), 2);
        assert!(matches!(
            &outcome.failures[1].reason,
            FailureReason::UnresolvedDependency { dependency_id } if dependency_id == "parent"
        ));
    }

    #[test]
    fn test_self_dependency_is_ignored() {
        let tasks = vec![TaskSnapshot::new("a", 1)
            .with_duration(2.0)
            .with_dependency("a")];
        let mut ledger = AllocationLedger::new(6.0);
        let outcome = GreedyScheduler::new(wednesday()).schedule(&tasks, &mut ledger);
        assert!(outcome.failures.is_empty());
        assert_eq!(outcome.scheduled[0].start_date(), wednesday());
    }

    #[test]
    fn test_failure_carries_priority() {
        let tasks = vec![TaskSnapshot::new("big", 42).with_duration(100.0)];
        let mut ledger = AllocationLedger::new(6.0);
        let outcome = GreedyScheduler::new(wednesday())
            .with_horizon_days(5)
            .schedule(&tasks, &mut ledger);
        assert_eq!(outcome.failures[0].priority, 42);
    }

    #[test]
    fn test_external_dependency_end_gates_start() {
        let tasks = vec![TaskSnapshot::new("a", 1)
            .with_duration(1.0)
            .with_dependency("ctx")];
        let mut ends = FxHashMap::default();
        ends.insert("ctx".to_string(), d(2025, 1, 7));
        let mut ledger = AllocationLedger::new(6.0);
        let outcome = GreedyScheduler::new(wednesday())
            .with_external_ends(ends)
            .schedule(&tasks, &mut ledger);
        assert_eq!(outcome.scheduled[0].start_date(), d(2025, 1, 7));
    }

    #[test]
    fn test_resolved_window_times() {
        let tasks = vec![TaskSnapshot::new("a", 1).with_duration(1.0)];
        let mut ledger = AllocationLedger::new(6.0);
        let outcome = GreedyScheduler::new(wednesday()).schedule(&tasks, &mut ledger);
        let task = &outcome.scheduled[0];
        assert_eq!(task.planned_start, wednesday().and_hms_opt(9, 0, 0).unwrap());
        assert_eq!(task.planned_end, wednesday().and_hms_opt(18, 0, 0).unwrap());
    }
}
