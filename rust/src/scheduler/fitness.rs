//! Schedule quality scoring.
//!
//! Formula: `reward - deadline_penalty - variance_penalty - unplaced_penalty`,
//! higher is better.
//! - reward: `Σ (schedule_reward + priority_reward * priority)` over scheduled
//!   tasks, only when enabled
//! - deadline penalty: `deadline_penalty * late_days` per task ending after
//!   its deadline date
//! - variance penalty: `variance_penalty * Var(hours per allocated date)`
//! - unplaced penalty: `unplaced_penalty * (1 + priority / 100)` per failed
//!   task, so dropping a task always costs more than finishing it late

use crate::config::FitnessWeights;
use crate::models::{ScheduledTask, TaskFailure};

use super::ledger::AllocationLedger;

/// Scores a decoded schedule. Pure; holds no mutable state.
#[derive(Clone, Debug, Default)]
pub struct FitnessCalculator {
    weights: FitnessWeights,
    include_schedule_reward: bool,
}

impl FitnessCalculator {
    pub fn new(weights: FitnessWeights) -> Self {
        Self {
            weights,
            include_schedule_reward: true,
        }
    }

    /// Toggle the scheduled-task reward.
    ///
    /// Disable it when every compared schedule covers the same task set.
    pub fn with_schedule_reward(mut self, enabled: bool) -> Self {
        self.include_schedule_reward = enabled;
        self
    }

    pub fn evaluate(
        &self,
        scheduled: &[ScheduledTask],
        failures: &[TaskFailure],
        ledger: &AllocationLedger,
    ) -> f64 {
        let reward = if self.include_schedule_reward {
            self.schedule_reward(scheduled)
        } else {
            0.0
        };
        reward
            - self.deadline_penalty(scheduled)
            - self.variance_penalty(ledger)
            - self.unplaced_penalty(failures)
    }

    pub fn schedule_reward(&self, scheduled: &[ScheduledTask]) -> f64 {
        scheduled
            .iter()
            .map(|task| {
                self.weights.schedule_reward + self.weights.priority_reward * task.priority as f64
            })
            .sum()
    }

    pub fn deadline_penalty(&self, scheduled: &[ScheduledTask]) -> f64 {
        scheduled
            .iter()
            .map(|task| self.weights.deadline_penalty * late_days(task) as f64)
            .sum()
    }

    pub fn variance_penalty(&self, ledger: &AllocationLedger) -> f64 {
        self.weights.variance_penalty * workload_variance(ledger)
    }

    /// Negative priorities weigh like priority 0.
    pub fn unplaced_penalty(&self, failures: &[TaskFailure]) -> f64 {
        failures
            .iter()
            .map(|failure| {
                let scale = 1.0 + f64::from(failure.priority.max(0)) / 100.0;
                self.weights.unplaced_penalty * scale
            })
            .sum()
    }
}

/// Calendar days between the deadline date and the planned end date, if late.
pub fn late_days(task: &ScheduledTask) -> i64 {
    match task.deadline {
        Some(deadline) => (task.end_date() - deadline.date()).num_days().max(0),
        None => 0,
    }
}

/// Population variance of allocated hours across touched dates.
pub fn workload_variance(ledger: &AllocationLedger) -> f64 {
    let hours: Vec<f64> = ledger.hours().collect();
    if hours.len() < 2 {
        return 0.0;
    }
    let n = hours.len() as f64;
    let mean = hours.iter().sum::<f64>() / n;
    hours.iter().map(|h| (h - mean).powi(2)).sum::<f64>() / n
}
