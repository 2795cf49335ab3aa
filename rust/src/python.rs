//! Python bindings (enabled with the `python` feature).

use chrono::{NaiveDate, NaiveDateTime};
use pyo3::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::config::{GeneticConfig, OptimizeParams};
use crate::coordinator::optimize;
use crate::models::{
    DailyAllocation, OptimizationResult, OptimizationSummary, PlannedWindow, ScheduledTask,
    TaskSnapshot, TaskStatus,
};
use crate::projection::WorkloadProjector;

#[pymethods]
impl PlannedWindow {
    #[new]
    fn py_new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    fn __repr__(&self) -> String {
        format!("PlannedWindow(start={}, end={})", self.start, self.end)
    }
}

#[pymethods]
impl TaskSnapshot {
    #[new]
    #[pyo3(signature = (
        id,
        priority,
        estimated_duration=None,
        deadline=None,
        planned=None,
        daily_allocation=None,
        is_fixed=false,
        is_archived=false,
        depends_on=None,
        status=TaskStatus::Pending
    ))]
    #[allow(clippy::too_many_arguments)]
    fn py_new(
        id: String,
        priority: i32,
        estimated_duration: Option<f64>,
        deadline: Option<NaiveDateTime>,
        planned: Option<PlannedWindow>,
        daily_allocation: Option<BTreeMap<NaiveDate, f64>>,
        is_fixed: bool,
        is_archived: bool,
        depends_on: Option<BTreeSet<String>>,
        status: TaskStatus,
    ) -> Self {
        Self {
            id,
            priority,
            deadline,
            estimated_duration,
            planned,
            daily_allocation: daily_allocation.unwrap_or_default(),
            is_fixed,
            is_archived,
            depends_on: depends_on.unwrap_or_default(),
            status,
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "TaskSnapshot(id={:?}, priority={}, estimated_duration={:?}, deps={})",
            self.id,
            self.priority,
            self.estimated_duration,
            self.depends_on.len()
        )
    }
}

#[pymethods]
impl ScheduledTask {
    fn __repr__(&self) -> String {
        format!(
            "ScheduledTask(task_id={:?}, start={}, end={})",
            self.task_id, self.planned_start, self.planned_end
        )
    }
}

/// Result of `optimize` as seen from Python.
#[pyclass(name = "OptimizationResult", get_all)]
#[derive(Clone, Debug)]
pub struct PyOptimizationResult {
    pub scheduled: Vec<ScheduledTask>,
    /// (task_id, reason) pairs
    pub failures: Vec<(String, String)>,
    pub daily_allocation: DailyAllocation,
    pub summary: OptimizationSummary,
}

impl From<OptimizationResult> for PyOptimizationResult {
    fn from(result: OptimizationResult) -> Self {
        Self {
            failures: result
                .failures
                .iter()
                .map(|failure| (failure.task_id.clone(), failure.message()))
                .collect(),
            scheduled: result.scheduled,
            daily_allocation: result.daily_allocation,
            summary: result.summary,
        }
    }
}

#[pymethods]
impl PyOptimizationResult {
    fn __repr__(&self) -> String {
        format!(
            "OptimizationResult(algorithm={:?}, scheduled={}, failed={})",
            self.summary.algorithm,
            self.scheduled.len(),
            self.failures.len()
        )
    }
}

/// Optimize `tasks` around `context_tasks`.
///
/// Raises ValueError on invalid parameters.
#[pyfunction]
#[pyo3(name = "optimize", signature = (
    tasks,
    context_tasks,
    start_date,
    max_hours_per_day=6.0,
    force_override=false,
    algorithm_name="greedy".to_string(),
    include_all_days=false,
    seed=None,
    verbosity=0
))]
#[allow(clippy::too_many_arguments)]
fn py_optimize(
    tasks: Vec<TaskSnapshot>,
    context_tasks: Vec<TaskSnapshot>,
    start_date: NaiveDate,
    max_hours_per_day: f64,
    force_override: bool,
    algorithm_name: String,
    include_all_days: bool,
    seed: Option<u64>,
    verbosity: u8,
) -> PyResult<PyOptimizationResult> {
    let genetic = GeneticConfig {
        seed,
        ..GeneticConfig::default()
    };
    let params = OptimizeParams {
        force_override,
        include_all_days,
        algorithm: algorithm_name,
        genetic,
        verbosity,
        ..OptimizeParams::new(start_date, max_hours_per_day)
    };

    match optimize(&tasks, &context_tasks, &params) {
        Ok(result) => Ok(result.into()),
        Err(e) => Err(pyo3::exceptions::PyValueError::new_err(e.to_string())),
    }
}

/// Project display workload for a task.
///
/// `mode` is "weekday_only" or "actual_schedule"; `holidays` only applies to
/// the latter.
#[pyfunction]
#[pyo3(signature = (task, mode="actual_schedule", holidays=None))]
fn project_workload(
    task: TaskSnapshot,
    mode: &str,
    holidays: Option<HashSet<NaiveDate>>,
) -> PyResult<DailyAllocation> {
    let projector = match mode {
        "weekday_only" => WorkloadProjector::weekday_only(),
        "actual_schedule" => WorkloadProjector::actual_schedule(holidays),
        other => {
            return Err(pyo3::exceptions::PyValueError::new_err(format!(
                "Unknown projection mode: {}",
                other
            )))
        }
    };
    Ok(projector.project(&task))
}

/// The workplan.rust Python module.
#[pymodule]
fn rust(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<TaskStatus>()?;
    m.add_class::<PlannedWindow>()?;
    m.add_class::<TaskSnapshot>()?;
    m.add_class::<ScheduledTask>()?;
    m.add_class::<OptimizationSummary>()?;
    m.add_class::<PyOptimizationResult>()?;

    m.add_function(wrap_pyfunction!(py_optimize, m)?)?;
    m.add_function(wrap_pyfunction!(project_workload, m)?)?;

    Ok(())
}
