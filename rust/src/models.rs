//! Core data types for the optimization engine.

use chrono::{NaiveDate, NaiveDateTime};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

#[cfg(feature = "python")]
use pyo3::prelude::*;

use crate::scheduler::LedgerError;

/// Hours allocated per calendar date, ordered by date.
pub type DailyAllocation = BTreeMap<NaiveDate, f64>;

/// Lifecycle status of a task.
#[cfg_attr(feature = "python", pyclass(eq, eq_int))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Canceled,
}

impl TaskStatus {
    /// Whether the task has reached a terminal state.
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Completed | Self::Canceled)
    }
}

/// A planned start/end window.
#[cfg_attr(feature = "python", pyclass(get_all, set_all))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlannedWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl PlannedWindow {
    pub fn start_date(&self) -> NaiveDate {
        self.start.date()
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end.date()
    }
}

/// Immutable view of a task for one optimization run.
#[cfg_attr(feature = "python", pyclass(get_all, set_all))]
#[derive(Clone, Debug, Default)]
pub struct TaskSnapshot {
    pub id: String,
    /// Higher is more urgent.
    pub priority: i32,
    pub deadline: Option<NaiveDateTime>,
    /// Estimated effort in hours.
    pub estimated_duration: Option<f64>,
    pub planned: Option<PlannedWindow>,
    /// Already committed hours per date (optimizer output from an earlier run).
    pub daily_allocation: DailyAllocation,
    /// Exempt from re-optimization unless the caller forces an override.
    pub is_fixed: bool,
    pub is_archived: bool,
    pub depends_on: BTreeSet<String>,
    pub status: TaskStatus,
}

impl TaskSnapshot {
    pub fn new(id: impl Into<String>, priority: i32) -> Self {
        Self {
            id: id.into(),
            priority,
            ..Self::default()
        }
    }

    pub fn with_duration(mut self, hours: f64) -> Self {
        self.estimated_duration = Some(hours);
        self
    }

    pub fn with_deadline(mut self, deadline: NaiveDateTime) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_planned(mut self, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        self.planned = Some(PlannedWindow { start, end });
        self
    }

    pub fn with_allocation(mut self, allocation: DailyAllocation) -> Self {
        self.daily_allocation = allocation;
        self
    }

    pub fn with_dependency(mut self, task_id: impl Into<String>) -> Self {
        self.depends_on.insert(task_id.into());
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn fixed(mut self) -> Self {
        self.is_fixed = true;
        self
    }

    pub fn archived(mut self) -> Self {
        self.is_archived = true;
        self
    }

    /// Estimated hours, if set and positive.
    pub fn positive_duration(&self) -> Option<f64> {
        self.estimated_duration.filter(|hours| *hours > 0.0)
    }

    pub fn has_schedule(&self) -> bool {
        self.planned.is_some()
    }
}

/// A task that received a concrete allocation.
#[cfg_attr(feature = "python", pyclass(get_all))]
#[derive(Clone, Debug)]
pub struct ScheduledTask {
    pub task_id: String,
    pub priority: i32,
    pub deadline: Option<NaiveDateTime>,
    pub estimated_duration: f64,
    pub planned_start: NaiveDateTime,
    pub planned_end: NaiveDateTime,
    pub daily_allocation: DailyAllocation,
}

impl ScheduledTask {
    pub fn start_date(&self) -> NaiveDate {
        self.planned_start.date()
    }

    pub fn end_date(&self) -> NaiveDate {
        self.planned_end.date()
    }

    pub fn allocated_hours(&self) -> f64 {
        self.daily_allocation.values().sum()
    }
}

/// Why a task could not be placed.
#[derive(Error, Clone, Debug, PartialEq)]
pub enum FailureReason {
    #[error("no available time within {horizon_days}-day horizon")]
    HorizonExhausted { horizon_days: u32 },
    #[error("dependency {dependency_id} is not scheduled")]
    UnresolvedDependency { dependency_id: String },
    #[error("allocation rejected: {0}")]
    Ledger(#[from] LedgerError),
}

/// A task that could not be placed. Failed tasks carry no allocation.
#[derive(Clone, Debug)]
pub struct TaskFailure {
    pub task_id: String,
    pub priority: i32,
    pub reason: FailureReason,
}

impl TaskFailure {
    pub fn new(task_id: impl Into<String>, reason: FailureReason) -> Self {
        Self {
            task_id: task_id.into(),
            priority: 0,
            reason,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Human-readable reason.
    pub fn message(&self) -> String {
        self.reason.to_string()
    }
}

/// Aggregate figures reported after a run.
#[cfg_attr(feature = "python", pyclass(get_all))]
#[derive(Clone, Debug, Default)]
pub struct OptimizationSummary {
    pub scheduled_count: usize,
    pub failed_count: usize,
    pub total_hours: f64,
    pub date_span: Option<(NaiveDate, NaiveDate)>,
    pub algorithm: String,
}

/// Complete outcome of one optimization call.
#[derive(Clone, Debug, Default)]
pub struct OptimizationResult {
    pub scheduled: Vec<ScheduledTask>,
    pub failures: Vec<TaskFailure>,
    /// Context allocations merged with the new placements.
    pub daily_allocation: DailyAllocation,
    pub summary: OptimizationSummary,
}

impl OptimizationResult {
    /// Assemble a result and compute its summary.
    pub fn new(
        scheduled: Vec<ScheduledTask>,
        failures: Vec<TaskFailure>,
        daily_allocation: DailyAllocation,
        algorithm: &str,
    ) -> Self {
        let total_hours = scheduled.iter().map(ScheduledTask::allocated_hours).sum();
        let first = scheduled.iter().map(ScheduledTask::start_date).min();
        let last = scheduled.iter().map(ScheduledTask::end_date).max();
        let summary = OptimizationSummary {
            scheduled_count: scheduled.len(),
            failed_count: failures.len(),
            total_hours,
            date_span: first.zip(last),
            algorithm: algorithm.to_string(),
        };
        Self {
            scheduled,
            failures,
            daily_allocation,
            summary,
        }
    }

    pub fn find(&self, task_id: &str) -> Option<&ScheduledTask> {
        self.scheduled.iter().find(|t| t.task_id == task_id)
    }

    pub fn failure(&self, task_id: &str) -> Option<&TaskFailure> {
        self.failures.iter().find(|f| f.task_id == task_id)
    }
}
