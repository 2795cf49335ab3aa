//! Genetic search over task orderings.
//!
//! Individuals are permutations of the task batch. Each is decoded by the
//! greedy allocator against a fresh, empty ledger and scored by the fitness
//! calculator, so only the ordering influences the score. Decodes are
//! memoized per run.
//!
//! Generation loop:
//! 1. Evaluate every individual (cached decode)
//! 2. Track best-ever; stop after `stagnation_limit` generations without
//!    improvement, at the generation cap, or when the time limit runs out
//! 3. Tournament-select a parent pool
//! 4. Next generation = best-ever individual + children from order crossover
//!    and swap mutation

mod cache;
pub mod operators;

pub use cache::{DecodeCache, DecodedCandidate};
pub use operators::{
    order_crossover, order_crossover_at, random_permutation, swap_mutation, tournament_select,
    Candidate,
};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::time::Instant;

use crate::config::{FitnessWeights, GeneticConfig};
use crate::logging::VERBOSITY_SILENT;
use crate::models::TaskSnapshot;
use crate::{log_changes, log_checks, log_debug};

use super::fitness::FitnessCalculator;
use super::greedy::GreedyScheduler;
use super::ledger::AllocationLedger;

/// Minimum fitness gain that counts as an improvement.
const IMPROVEMENT_EPSILON: f64 = 1e-9;

/// Result of one genetic search run.
#[derive(Clone, Debug)]
pub struct GeneticOutcome {
    /// Winning ordering (indices into the task slice)
    pub best_order: Candidate,
    /// Decode of the winning ordering against an empty ledger
    pub best: DecodedCandidate,
    pub generations_run: usize,
    /// Stopped by stagnation or time limit rather than the generation cap
    pub stopped_early: bool,
    /// Best-ever fitness after each generation
    pub best_fitness_history: Vec<f64>,
    /// Fittest individual of each evaluated generation
    pub generation_best: Vec<f64>,
    pub cache_hits: usize,
    pub cache_misses: usize,
}

/// Evolves task orderings, decoding each with a [`GreedyScheduler`].
pub struct GeneticScheduler<'a> {
    greedy: &'a GreedyScheduler,
    fitness: FitnessCalculator,
    config: GeneticConfig,
    max_hours_per_day: f64,
    verbosity: u8,
}

impl<'a> GeneticScheduler<'a> {
    pub fn new(
        greedy: &'a GreedyScheduler,
        max_hours_per_day: f64,
        config: GeneticConfig,
        weights: FitnessWeights,
    ) -> Self {
        let fitness = FitnessCalculator::new(weights).with_schedule_reward(config.reward_scheduled);
        Self {
            greedy,
            fitness,
            config,
            max_hours_per_day,
            verbosity: VERBOSITY_SILENT,
        }
    }

    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Run with a random stream seeded from the config (or the OS).
    pub fn run(&self, tasks: &[TaskSnapshot]) -> GeneticOutcome {
        let mut rng = match self.config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };
        self.run_with_rng(tasks, &mut rng)
    }

    /// Decode one ordering against a fresh empty ledger.
    pub fn decode(&self, tasks: &[TaskSnapshot], order: &[usize]) -> DecodedCandidate {
        let mut ledger = AllocationLedger::new(self.max_hours_per_day);
        let outcome = self.greedy.schedule_order(tasks, order, &mut ledger);
        let fitness = self
            .fitness
            .evaluate(&outcome.scheduled, &outcome.failures, &ledger);
        DecodedCandidate {
            fitness,
            outcome,
            allocation: ledger.snapshot(),
        }
    }

    pub fn run_with_rng<R: Rng>(&self, tasks: &[TaskSnapshot], rng: &mut R) -> GeneticOutcome {
        let n = tasks.len();
        let mut cache = DecodeCache::new();

        if n < 2 {
            let order: Candidate = (0..n).collect();
            let best = self.decode(tasks, &order);
            return GeneticOutcome {
                best_fitness_history: vec![best.fitness],
                generation_best: vec![best.fitness],
                best_order: order,
                best,
                generations_run: 0,
                stopped_early: false,
                cache_hits: 0,
                cache_misses: 1,
            };
        }

        let population_size = self.config.population_size.max(1);
        let mut population: Vec<Candidate> = (0..population_size)
            .map(|_| random_permutation(n, rng))
            .collect();

        let mut best_order: Candidate = population[0].clone();
        let mut best_fitness = f64::NEG_INFINITY;
        let mut stagnant = 0usize;
        let mut stopped_early = false;
        let mut generations_run = 0usize;
        let mut best_fitness_history = Vec::new();
        let mut generation_best = Vec::new();
        let started = Instant::now();

        for generation in 0..self.config.generations {
            if let Some(limit) = self.config.time_limit {
                if started.elapsed() >= limit {
                    log_changes!(self.verbosity, "GA time limit reached at generation {}", generation);
                    stopped_early = true;
                    break;
                }
            }

            let fitness: Vec<f64> = population
                .iter()
                .map(|individual| {
                    cache
                        .get_or_decode(individual, || self.decode(tasks, individual))
                        .fitness
                })
                .collect();
            generations_run += 1;

            let (leader, leader_fitness) = fitness
                .iter()
                .copied()
                .enumerate()
                .fold((0, f64::NEG_INFINITY), |acc, (idx, f)| {
                    if f > acc.1 {
                        (idx, f)
                    } else {
                        acc
                    }
                });
            generation_best.push(leader_fitness);

            if leader_fitness > best_fitness + IMPROVEMENT_EPSILON {
                best_fitness = leader_fitness;
                best_order = population[leader].clone();
                stagnant = 0;
            } else {
                stagnant += 1;
            }
            best_fitness_history.push(best_fitness);
            log_checks!(
                self.verbosity,
                "Generation {}: best {:.4} (stagnant {})",
                generation,
                best_fitness,
                stagnant
            );

            if self.config.stagnation_limit > 0 && stagnant >= self.config.stagnation_limit {
                log_changes!(
                    self.verbosity,
                    "GA stopped after {} generations without improvement",
                    stagnant
                );
                stopped_early = true;
                break;
            }
            if generation + 1 == self.config.generations {
                break;
            }

            population = self.breed(&population, &fitness, &best_order, rng);
        }

        log_debug!(
            self.verbosity,
            "Decode cache: {} hits, {} misses",
            cache.hits(),
            cache.misses()
        );
        let cache_hits = cache.hits();
        let cache_misses = cache.misses();
        let best = match cache.take(&best_order) {
            Some(decoded) => decoded,
            None => self.decode(tasks, &best_order),
        };

        GeneticOutcome {
            best_order,
            best,
            generations_run,
            stopped_early,
            best_fitness_history,
            generation_best,
            cache_hits,
            cache_misses,
        }
    }

    /// Build the next generation: elite first, then offspring.
    fn breed<R: Rng>(
        &self,
        population: &[Candidate],
        fitness: &[f64],
        elite: &Candidate,
        rng: &mut R,
    ) -> Vec<Candidate> {
        let size = population.len();
        let pool: Vec<usize> = (0..size)
            .map(|_| tournament_select(fitness, self.config.tournament_size, rng))
            .collect();

        let mut next = Vec::with_capacity(size);
        next.push(elite.clone());
        while next.len() < size {
            let parent1 = &population[pool[rng.random_range(0..pool.len())]];
            let parent2 = &population[pool[rng.random_range(0..pool.len())]];
            let mut child = if rng.random_bool(self.config.crossover_rate) {
                order_crossover(parent1, parent2, rng)
            } else {
                parent1.clone()
            };
            if rng.random_bool(self.config.mutation_rate) {
                swap_mutation(&mut child, rng);
            }
            next.push(child);
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn deadline(year: i32, month: u32, day: u32) -> chrono::NaiveDateTime {
        d(year, month, day).and_hms_opt(18, 0, 0).unwrap()
    }

    fn config() -> GeneticConfig {
        GeneticConfig::default()
            .with_seed(42)
            .with_population_size(16)
            .with_generations(30)
    }

    fn mixed_tasks() -> Vec<TaskSnapshot> {
        vec![
            TaskSnapshot::new("a", 100).with_duration(6.0),
            TaskSnapshot::new("b", 90).with_duration(4.0),
            TaskSnapshot::new("c", 80)
                .with_duration(3.0)
                .with_deadline(deadline(2025, 1, 1)),
            TaskSnapshot::new("d", 70).with_duration(5.0),
            TaskSnapshot::new("e", 60)
                .with_duration(2.0)
                .with_deadline(deadline(2025, 1, 2)),
            TaskSnapshot::new("f", 50).with_duration(7.0),
        ]
    }

    #[test]
    fn test_best_fitness_never_decreases() {
        let greedy = GreedyScheduler::new(d(2025, 1, 1));
        let ga = GeneticScheduler::new(&greedy, 6.0, config(), FitnessWeights::default());
        let outcome = ga.run(&mixed_tasks());

        assert!(outcome.generations_run > 0);
        for pair in outcome.best_fitness_history.windows(2) {
            assert!(pair[1] >= pair[0]);
        }
        // Elitism keeps the best individual in every generation
        for pair in outcome.generation_best.windows(2) {
            assert!(pair[1] >= pair[0] - 1e-9);
        }
    }

    #[test]
    fn test_result_matches_best_fitness() {
        let greedy = GreedyScheduler::new(d(2025, 1, 1));
        let ga = GeneticScheduler::new(&greedy, 6.0, config(), FitnessWeights::default());
        let outcome = ga.run(&mixed_tasks());

        let best_ever = *outcome.best_fitness_history.last().unwrap();
        assert!((outcome.best.fitness - best_ever).abs() < 1e-9);
        assert_eq!(outcome.best.outcome.scheduled.len(), 6);
        assert!(outcome.best.outcome.failures.is_empty());
    }

    #[test]
    fn test_finds_ordering_that_meets_deadlines() {
        // Priority order puts the big task first and makes both deadline tasks late
        let tasks = vec![
            TaskSnapshot::new("x", 100).with_duration(6.0),
            TaskSnapshot::new("y", 50)
                .with_duration(2.0)
                .with_deadline(deadline(2025, 1, 1)),
            TaskSnapshot::new("z", 40)
                .with_duration(2.0)
                .with_deadline(deadline(2025, 1, 1)),
        ];
        let config = GeneticConfig::default()
            .with_seed(3)
            .with_population_size(30)
            .with_generations(50)
            .with_stagnation_limit(20);
        let greedy = GreedyScheduler::new(d(2025, 1, 1));
        let ga = GeneticScheduler::new(&greedy, 6.0, config, FitnessWeights::default());

        let priority_order = ga.decode(&tasks, &[0, 1, 2]);
        let outcome = ga.run(&tasks);
        assert!(outcome.best.fitness > priority_order.fitness);
        assert_eq!(outcome.best_order[2], 0);
        for task in &outcome.best.outcome.scheduled {
            assert_eq!(crate::scheduler::fitness::late_days(task), 0);
        }
    }

    #[test]
    fn test_stagnation_stops_early() {
        let tasks: Vec<TaskSnapshot> = (0..4)
            .map(|i| TaskSnapshot::new(format!("t{}", i), 50).with_duration(3.0))
            .collect();
        let config = GeneticConfig::default()
            .with_seed(7)
            .with_population_size(10)
            .with_generations(50)
            .with_stagnation_limit(10);
        let greedy = GreedyScheduler::new(d(2025, 1, 1));
        let ga = GeneticScheduler::new(&greedy, 6.0, config, FitnessWeights::default());
        let outcome = ga.run(&tasks);

        assert!(outcome.stopped_early);
        assert_eq!(outcome.generations_run, 11);
        assert!(outcome.generations_run < 50);
    }

    #[test]
    fn test_same_seed_same_result() {
        let greedy = GreedyScheduler::new(d(2025, 1, 1));
        let ga = GeneticScheduler::new(&greedy, 6.0, config(), FitnessWeights::default());
        let tasks = mixed_tasks();
        let first = ga.run(&tasks);
        let second = ga.run(&tasks);
        assert_eq!(first.best_order, second.best_order);
        assert_eq!(first.best_fitness_history, second.best_fitness_history);
    }

    #[test]
    fn test_cache_is_used() {
        let greedy = GreedyScheduler::new(d(2025, 1, 1));
        let ga = GeneticScheduler::new(&greedy, 6.0, config(), FitnessWeights::default());
        let outcome = ga.run(&mixed_tasks());
        // The elite is re-evaluated every generation, so hits are guaranteed
        assert!(outcome.cache_hits > 0);
        assert!(outcome.cache_misses <= 16 * outcome.generations_run);
    }

    #[test]
    fn test_single_task_skips_search() {
        let greedy = GreedyScheduler::new(d(2025, 1, 1));
        let ga = GeneticScheduler::new(&greedy, 6.0, config(), FitnessWeights::default());
        let outcome = ga.run(&[TaskSnapshot::new("solo", 1).with_duration(4.0)]);
        assert_eq!(outcome.generations_run, 0);
        assert_eq!(outcome.best.outcome.scheduled.len(), 1);
        assert_eq!(outcome.best.outcome.scheduled[0].start_date(), d(2025, 1, 1));
    }

    #[test]
    fn test_decode_starts_from_empty_ledger() {
        let greedy = GreedyScheduler::new(d(2025, 1, 1));
        let ga = GeneticScheduler::new(&greedy, 6.0, config(), FitnessWeights::default());
        let tasks = mixed_tasks();
        let first = ga.decode(&tasks, &[5, 4, 3, 2, 1, 0]);
        let again = ga.decode(&tasks, &[5, 4, 3, 2, 1, 0]);
        assert_eq!(first.fitness, again.fitness);
        assert_eq!(first.allocation, again.allocation);
    }
}
