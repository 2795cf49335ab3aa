//! Task ordering used before allocation.
//!
//! - [`priority_order`]: priority descending, then deadline ascending (unset
//!   deadlines last), then task id ascending.
//! - [`dependency_order`]: stable reordering so every task follows the tasks
//!   it depends on within the same batch.

use chrono::NaiveDateTime;
use rustc_hash::FxHashMap;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use crate::models::TaskSnapshot;

/// Sort key for priority ordering (lower = scheduled first).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey<'a> {
    pub priority: i32,
    pub deadline: Option<NaiveDateTime>,
    pub task_id: &'a str,
}

impl<'a> SortKey<'a> {
    pub fn of(task: &'a TaskSnapshot) -> Self {
        Self {
            priority: task.priority,
            deadline: task.deadline,
            task_id: &task.id,
        }
    }
}

/// Compare deadlines with `None` sorting after every set deadline.
fn cmp_deadline(a: Option<NaiveDateTime>, b: Option<NaiveDateTime>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl Ord for SortKey<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then(cmp_deadline(self.deadline, other.deadline))
            .then(self.task_id.cmp(other.task_id))
    }
}

impl PartialOrd for SortKey<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Sort tasks most urgent first.
pub fn priority_order(tasks: &mut [TaskSnapshot]) {
    tasks.sort_by(|a, b| SortKey::of(a).cmp(&SortKey::of(b)));
}

/// Reorder `order` (indices into `tasks`) so dependencies come first.
///
/// Kahn's algorithm where the ready set is drained by original position, so
/// the incoming order is kept wherever dependencies allow. Only dependencies
/// inside the ordered batch constrain the result. Tasks caught in a cycle are
/// appended at the end in their incoming relative order.
pub fn dependency_order(tasks: &[TaskSnapshot], order: &[usize]) -> Vec<usize> {
    let position: FxHashMap<&str, usize> = order
        .iter()
        .enumerate()
        .map(|(pos, &idx)| (tasks[idx].id.as_str(), pos))
        .collect();

    // in_degree[pos] = number of in-batch dependencies not yet emitted
    let mut in_degree = vec![0usize; order.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); order.len()];
    for (pos, &idx) in order.iter().enumerate() {
        for dep in &tasks[idx].depends_on {
            if let Some(&dep_pos) = position.get(dep.as_str()) {
                if dep_pos != pos {
                    in_degree[pos] += 1;
                    dependents[dep_pos].push(pos);
                }
            }
        }
    }

    let mut ready: BinaryHeap<Reverse<usize>> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, &degree)| degree == 0)
        .map(|(pos, _)| Reverse(pos))
        .collect();

    let mut emitted = vec![false; order.len()];
    let mut result = Vec::with_capacity(order.len());
    while let Some(Reverse(pos)) = ready.pop() {
        emitted[pos] = true;
        result.push(order[pos]);
        for &dependent in &dependents[pos] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                ready.push(Reverse(dependent));
            }
        }
    }

    if result.len() != order.len() {
        result.extend(
            order
                .iter()
                .enumerate()
                .filter(|(pos, _)| !emitted[*pos])
                .map(|(_, &idx)| idx),
        );
    }

    result
}
