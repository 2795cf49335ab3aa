//! Configuration types for the optimization engine.

use chrono::{Local, NaiveDate, NaiveTime};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::coordinator::OptimizeError;
use crate::logging::VERBOSITY_SILENT;

/// Scheduling algorithm selected by name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Algorithm {
    Greedy,
    Genetic,
}

impl Algorithm {
    pub fn name(self) -> &'static str {
        match self {
            Self::Greedy => "greedy",
            Self::Genetic => "genetic",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = OptimizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "greedy" => Ok(Self::Greedy),
            "genetic" => Ok(Self::Genetic),
            _ => Err(OptimizeError::UnknownAlgorithm(s.to_string())),
        }
    }
}

/// Weights of the schedule fitness function (higher fitness = better).
#[derive(Clone, Debug)]
pub struct FitnessWeights {
    /// Reward per successfully scheduled task
    pub schedule_reward: f64,
    /// Additional reward per priority unit of a scheduled task
    pub priority_reward: f64,
    /// Penalty per calendar day a task ends after its deadline
    pub deadline_penalty: f64,
    /// Penalty multiplier for the variance of daily workload
    pub variance_penalty: f64,
    /// Penalty per task left unplaced, grown by 1% per priority unit
    pub unplaced_penalty: f64,
}

impl Default for FitnessWeights {
    fn default() -> Self {
        Self {
            schedule_reward: 100.0,
            priority_reward: 1.0,
            deadline_penalty: 50.0,
            variance_penalty: 10.0,
            unplaced_penalty: 1000.0,
        }
    }
}

/// Configuration of the genetic search.
#[derive(Clone, Debug)]
pub struct GeneticConfig {
    pub population_size: usize,
    /// Generation cap
    pub generations: usize,
    /// Stop after this many consecutive generations without improvement
    pub stagnation_limit: usize,
    pub tournament_size: usize,
    pub crossover_rate: f64,
    pub mutation_rate: f64,
    /// Seed for the random stream; `None` seeds from the OS
    pub seed: Option<u64>,
    /// Optional wall-clock budget checked before each generation
    pub time_limit: Option<Duration>,
    /// Include the scheduled-task reward when comparing candidates
    pub reward_scheduled: bool,
}

impl Default for GeneticConfig {
    fn default() -> Self {
        Self {
            population_size: 20,
            generations: 50,
            stagnation_limit: 10,
            tournament_size: 3,
            crossover_rate: 0.8,
            mutation_rate: 0.2,
            seed: None,
            time_limit: None,
            reward_scheduled: false,
        }
    }
}

impl GeneticConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_population_size(mut self, size: usize) -> Self {
        self.population_size = size;
        self
    }

    pub fn with_generations(mut self, generations: usize) -> Self {
        self.generations = generations;
        self
    }

    pub fn with_stagnation_limit(mut self, limit: usize) -> Self {
        self.stagnation_limit = limit;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), OptimizeError> {
        if self.population_size == 0 {
            return Err(OptimizeError::InvalidConfig(
                "population_size must be at least 1".to_string(),
            ));
        }
        if self.tournament_size == 0 {
            return Err(OptimizeError::InvalidConfig(
                "tournament_size must be at least 1".to_string(),
            ));
        }
        for (name, rate) in [
            ("crossover_rate", self.crossover_rate),
            ("mutation_rate", self.mutation_rate),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(OptimizeError::InvalidConfig(format!(
                    "{} must be within [0, 1], got {}",
                    name, rate
                )));
            }
        }
        Ok(())
    }
}

/// Parameters of one `optimize` call.
#[derive(Clone, Debug)]
pub struct OptimizeParams {
    pub start_date: NaiveDate,
    pub max_hours_per_day: f64,
    /// Re-optimize tasks that already have a schedule (fixed ones included)
    pub force_override: bool,
    /// "greedy" or "genetic"
    pub algorithm: String,
    /// Allow allocations on weekends
    pub include_all_days: bool,
    /// Calendar days searched forward from the start date per task
    pub horizon_days: u32,
    pub work_day_start: NaiveTime,
    pub work_day_end: NaiveTime,
    pub genetic: GeneticConfig,
    pub fitness: FitnessWeights,
    pub verbosity: u8,
}

impl Default for OptimizeParams {
    fn default() -> Self {
        Self {
            start_date: Local::now().date_naive(),
            max_hours_per_day: 6.0,
            force_override: false,
            algorithm: Algorithm::Greedy.name().to_string(),
            include_all_days: false,
            horizon_days: 365,
            work_day_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            work_day_end: NaiveTime::from_hms_opt(18, 0, 0).unwrap_or(NaiveTime::MIN),
            genetic: GeneticConfig::default(),
            fitness: FitnessWeights::default(),
            verbosity: VERBOSITY_SILENT,
        }
    }
}

impl OptimizeParams {
    pub fn new(start_date: NaiveDate, max_hours_per_day: f64) -> Self {
        Self {
            start_date,
            max_hours_per_day,
            ..Self::default()
        }
    }

    pub fn with_algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.algorithm = algorithm.into();
        self
    }

    pub fn with_genetic(mut self, genetic: GeneticConfig) -> Self {
        self.genetic = genetic;
        self
    }

    pub fn with_force_override(mut self, force_override: bool) -> Self {
        self.force_override = force_override;
        self
    }

    pub fn with_include_all_days(mut self, include_all_days: bool) -> Self {
        self.include_all_days = include_all_days;
        self
    }

    /// Validate the parameters and resolve the algorithm name.
    pub fn validate(&self) -> Result<Algorithm, OptimizeError> {
        if !self.max_hours_per_day.is_finite() || self.max_hours_per_day <= 0.0 {
            return Err(OptimizeError::InvalidMaxHours(self.max_hours_per_day));
        }
        let algorithm = self.algorithm.parse::<Algorithm>()?;
        if self.horizon_days == 0 {
            return Err(OptimizeError::InvalidConfig(
                "horizon_days must be at least 1".to_string(),
            ));
        }
        if algorithm == Algorithm::Genetic {
            self.genetic.validate()?;
        }
        Ok(algorithm)
    }
}
