//! Rust implementation of the workplan schedule optimizer.
//!
//! Places work tasks onto calendar days under a per-day hour cap, either with
//! a priority-ordered greedy allocator or with a genetic search over task
//! orderings that uses the greedy allocator as its decoder. Context tasks that
//! already hold allocations reduce the remaining capacity but are never moved.
//!
//! Python bindings are available behind the `python` feature.

// Allow clippy warning triggered by PyO3 macro expansion
#![cfg_attr(feature = "python", allow(clippy::useless_conversion))]

pub mod calendar;
mod config;
pub mod coordinator;
pub mod logging;
pub mod models;
pub mod projection;
pub mod scheduler;
pub mod sorting;

#[cfg(feature = "python")]
mod python;

pub use calendar::{
    days_between, ActualSchedule, AllDays, HolidayLookup, WeekdayOnly, WorkingDayCalendar,
};
pub use config::{Algorithm, FitnessWeights, GeneticConfig, OptimizeParams};
pub use coordinator::{is_schedulable, optimize, OptimizationCoordinator, OptimizeError};
pub use models::{
    DailyAllocation, FailureReason, OptimizationResult, OptimizationSummary, PlannedWindow,
    ScheduledTask, TaskFailure, TaskSnapshot, TaskStatus,
};
pub use projection::WorkloadProjector;
pub use scheduler::{
    AllocationLedger, FitnessCalculator, GeneticOutcome, GeneticScheduler, GreedyOutcome,
    GreedyScheduler, LedgerError,
};
pub use sorting::{dependency_order, priority_order, SortKey};
