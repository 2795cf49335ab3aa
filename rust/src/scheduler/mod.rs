//! Allocation engine: capacity ledger, greedy allocator, fitness scoring and
//! the genetic search that drives the allocator over task orderings.

pub mod fitness;
pub mod genetic;
mod greedy;
mod ledger;

pub use fitness::FitnessCalculator;
pub use genetic::{GeneticOutcome, GeneticScheduler};
pub use greedy::{GreedyOutcome, GreedyScheduler};
pub use ledger::{AllocationLedger, LedgerError, HOURS_EPSILON};
