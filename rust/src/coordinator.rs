//! Optimization entry point.
//!
//! Splits the task set into schedulable tasks and context, seeds a ledger
//! with the context's committed hours, dispatches to the configured algorithm
//! and assembles the result.

use chrono::NaiveDate;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::config::{Algorithm, OptimizeParams};
use crate::models::{DailyAllocation, OptimizationResult, TaskSnapshot};
use crate::scheduler::{AllocationLedger, GeneticScheduler, GreedyOutcome, GreedyScheduler};
use crate::sorting::priority_order;
use crate::{log_changes, log_checks};

/// Pre-flight failures. Raised before any task is examined.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptimizeError {
    #[error("max_hours_per_day must be a positive number, got {0}")]
    InvalidMaxHours(f64),
    #[error("Unknown optimization algorithm: {0}")]
    UnknownAlgorithm(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Whether a task may be (re-)optimized in this run.
pub fn is_schedulable(task: &TaskSnapshot, force_override: bool) -> bool {
    !task.status.is_finished()
        && !task.is_archived
        && task.positive_duration().is_some()
        && (!task.has_schedule() || force_override)
}

/// Orchestrates one optimization call.
#[derive(Clone, Debug)]
pub struct OptimizationCoordinator {
    params: OptimizeParams,
    algorithm: Algorithm,
}

impl OptimizationCoordinator {
    /// Validate `params` and build a coordinator.
    pub fn new(params: OptimizeParams) -> Result<Self, OptimizeError> {
        let algorithm = params.validate()?;
        Ok(Self { params, algorithm })
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn params(&self) -> &OptimizeParams {
        &self.params
    }

    /// Split `tasks` into schedulable tasks (priority ordered) and context.
    pub fn partition<'t>(
        &self,
        tasks: &'t [TaskSnapshot],
    ) -> (Vec<TaskSnapshot>, Vec<&'t TaskSnapshot>) {
        let mut schedulable = Vec::new();
        let mut context = Vec::new();
        for task in tasks {
            if is_schedulable(task, self.params.force_override) {
                schedulable.push(task.clone());
            } else {
                context.push(task);
            }
        }
        priority_order(&mut schedulable);
        (schedulable, context)
    }

    /// Ledger holding the committed hours of context tasks from the start date on.
    pub fn seed_ledger(&self, context: &[&TaskSnapshot]) -> AllocationLedger {
        let start = self.params.start_date;
        let mut ledger = AllocationLedger::new(self.params.max_hours_per_day);
        for task in context {
            for (date, hours) in task.daily_allocation.range(start..) {
                ledger.seed(*date, *hours);
            }
        }
        for (date, hours) in ledger.snapshot() {
            if hours > self.params.max_hours_per_day {
                log_checks!(
                    self.params.verbosity,
                    "Context already over capacity on {}: {:.2}h",
                    date,
                    hours
                );
            }
        }
        ledger
    }

    /// End dates of unfinished context tasks, for dependency gating.
    fn context_ends(context: &[&TaskSnapshot]) -> FxHashMap<String, NaiveDate> {
        context
            .iter()
            .filter(|task| !task.status.is_finished())
            .filter_map(|task| {
                let end = task
                    .planned
                    .map(|window| window.end_date())
                    .or_else(|| task.daily_allocation.keys().next_back().copied())?;
                Some((task.id.clone(), end))
            })
            .collect()
    }

    /// Optimize `tasks` around the already committed `context_tasks`.
    ///
    /// Tasks in `tasks` that are not schedulable join the context. Never
    /// fails: unplaceable tasks are reported as failures in the result.
    pub fn optimize(
        &self,
        tasks: &[TaskSnapshot],
        context_tasks: &[TaskSnapshot],
    ) -> OptimizationResult {
        let verbosity = self.params.verbosity;
        let (schedulable, mut context) = self.partition(tasks);
        context.extend(context_tasks.iter());
        log_changes!(
            verbosity,
            "Optimizing {} tasks with {} ({} context tasks)",
            schedulable.len(),
            self.algorithm,
            context.len()
        );

        let greedy =
            GreedyScheduler::from_params(&self.params).with_external_ends(Self::context_ends(&context));
        let mut ledger = self.seed_ledger(&context);

        let (outcome, merged) = match self.algorithm {
            Algorithm::Greedy => {
                let outcome = greedy.schedule(&schedulable, &mut ledger);
                (outcome, ledger.snapshot())
            }
            Algorithm::Genetic => self.run_genetic(&greedy, &schedulable, ledger),
        };

        let result = OptimizationResult::new(
            outcome.scheduled,
            outcome.failures,
            merged,
            self.algorithm.name(),
        );
        log_changes!(
            verbosity,
            "Scheduled {} tasks ({:.2}h), {} failed",
            result.summary.scheduled_count,
            result.summary.total_hours,
            result.summary.failed_count
        );
        result
    }

    fn run_genetic(
        &self,
        greedy: &GreedyScheduler,
        schedulable: &[TaskSnapshot],
        mut ledger: AllocationLedger,
    ) -> (GreedyOutcome, DailyAllocation) {
        let search = GeneticScheduler::new(
            greedy,
            self.params.max_hours_per_day,
            self.params.genetic.clone(),
            self.params.fitness.clone(),
        )
        .with_verbosity(self.params.verbosity);
        let found = search.run(schedulable);
        log_changes!(
            self.params.verbosity,
            "GA finished after {} generations (best fitness {:.4})",
            found.generations_run,
            found.best.fitness
        );

        if ledger.is_empty() {
            // Decoded against an empty ledger already; identical to a live run
            return (found.best.outcome, found.best.allocation);
        }
        let outcome = greedy.schedule_order(schedulable, &found.best_order, &mut ledger);
        (outcome, ledger.snapshot())
    }
}

/// Optimize `tasks` around `context_tasks` with `params`.
///
/// Fails only on invalid parameters; per-task problems are reported in the
/// returned result.
pub fn optimize(
    tasks: &[TaskSnapshot],
    context_tasks: &[TaskSnapshot],
    params: &OptimizeParams,
) -> Result<OptimizationResult, OptimizeError> {
    let coordinator = OptimizationCoordinator::new(params.clone())?;
    Ok(coordinator.optimize(tasks, context_tasks))
}
