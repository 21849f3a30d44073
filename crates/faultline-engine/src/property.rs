//! The property-test orchestrator.
//!
//! [`PropertyTest`] owns the single seeded stream, the configuration, the
//! statistics, and the host harness, and drives N iterations of
//! generate, execute, and (on a critical violation) shrink and report.
//! Per iteration the state machine is
//! Idle -> Generating -> Executing -> {Passed | ViolationDetected} ->
//! (Shrinking -> Reported); a passed iteration continues the loop, a
//! reported failure aborts the whole run.
//!
//! Configuration errors are rejected before any iteration runs.

use crate::distribution::OperationDistribution;
use crate::executor::{Executor, SequenceOutcome};
use crate::failure::{FailureConfig, FailureInjector};
use crate::generator::{KeyStrategy, SequenceGenerator, ValueStrategy};
use crate::harness::{HarnessError, SystemHarness};
use crate::invariant::Invariant;
use crate::op::OpKind;
use crate::report::{format_failure, FailureReport};
use crate::shrink::{ShrinkConfig, Shrinker};
use crate::stats::TestStatistics;
use log::{debug, error, info, warn};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::Instant;
use thiserror::Error;

/// Rejected configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("invalid sequence length range {min}..={max}")]
    InvalidSequenceLength { min: usize, max: usize },

    #[error("invalid key length range {min}..={max}")]
    InvalidKeyLength { min: usize, max: usize },

    #[error("invalid value size range {min}..={max}")]
    InvalidValueSize { min: usize, max: usize },

    #[error("invalid pad width {0}, expected 1..=19")]
    InvalidPadWidth(usize),

    #[error("probability for '{name}' out of range: {value}")]
    InvalidProbability { name: String, value: f64 },

    #[error("multiplier factor must be finite and non-negative, got {0}")]
    InvalidMultiplier(f64),

    #[error("operation distribution is empty")]
    EmptyDistribution,

    #[error("operation distribution has no positive weight")]
    NoPositiveWeight,

    #[error("operation weight must be finite and non-negative, got {0}")]
    InvalidWeight(f64),
}

/// Everything a run needs besides the harness and invariants.
#[derive(Debug, Clone)]
pub struct TestConfig<K: OpKind> {
    /// Seed for the run's single pseudorandom stream.
    pub seed: u64,
    /// Inclusive lower bound on generated sequence length.
    pub min_sequence_len: usize,
    /// Inclusive upper bound on generated sequence length.
    pub max_sequence_len: usize,
    /// Key synthesis strategy.
    pub key_strategy: KeyStrategy,
    /// Value synthesis strategy.
    pub value_strategy: ValueStrategy,
    /// Operation kinds and their selection weights.
    pub distribution: OperationDistribution<K>,
    /// Failure base rates and conditional multipliers.
    pub failure: FailureConfig,
    /// Shrinking limits.
    pub shrink: ShrinkConfig,
    /// Enable per-operation timing and frequency tables.
    pub detailed_stats: bool,
}

impl<K: OpKind> Default for TestConfig<K> {
    fn default() -> Self {
        Self {
            seed: 42,
            min_sequence_len: 8,
            max_sequence_len: 64,
            key_strategy: KeyStrategy::default(),
            value_strategy: ValueStrategy::default(),
            distribution: OperationDistribution::new(),
            failure: FailureConfig::default(),
            shrink: ShrinkConfig::default(),
            detailed_stats: false,
        }
    }
}

impl<K: OpKind> TestConfig<K> {
    /// Set the stream seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the inclusive sequence-length range.
    pub fn with_sequence_length(mut self, min: usize, max: usize) -> Self {
        self.min_sequence_len = min;
        self.max_sequence_len = max;
        self
    }

    /// Register an operation kind with a selection weight.
    pub fn with_operation(mut self, kind: K, weight: f64) -> Self {
        self.distribution.set_weight(kind, weight);
        self
    }

    /// Set the key strategy.
    pub fn with_key_strategy(mut self, strategy: KeyStrategy) -> Self {
        self.key_strategy = strategy;
        self
    }

    /// Set the value strategy.
    pub fn with_value_strategy(mut self, strategy: ValueStrategy) -> Self {
        self.value_strategy = strategy;
        self
    }

    /// Set failure base rates and multipliers.
    pub fn with_failure(mut self, failure: FailureConfig) -> Self {
        self.failure = failure;
        self
    }

    /// Set shrinking limits.
    pub fn with_shrink(mut self, shrink: ShrinkConfig) -> Self {
        self.shrink = shrink;
        self
    }

    /// Toggle the detailed statistics tables.
    pub fn with_detailed_stats(mut self, detailed: bool) -> Self {
        self.detailed_stats = detailed;
        self
    }

    /// Reject invalid configuration.  Called by the orchestrator before
    /// any iteration runs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_sequence_len == 0 || self.min_sequence_len > self.max_sequence_len {
            return Err(ConfigError::InvalidSequenceLength {
                min: self.min_sequence_len,
                max: self.max_sequence_len,
            });
        }

        match &self.key_strategy {
            KeyStrategy::UniformRandom {
                min_length,
                max_length,
            } => {
                if *min_length == 0 || min_length > max_length {
                    return Err(ConfigError::InvalidKeyLength {
                        min: *min_length,
                        max: *max_length,
                    });
                }
            }
            KeyStrategy::CollisionProne {
                collision_probability,
            } => {
                if !(0.0..=1.0).contains(collision_probability) {
                    return Err(ConfigError::InvalidProbability {
                        name: "collision".to_string(),
                        value: *collision_probability,
                    });
                }
            }
            KeyStrategy::Sequential { pad_width, .. } => {
                // u64 holds at most 19 full decimal digits.
                if *pad_width == 0 || *pad_width > 19 {
                    return Err(ConfigError::InvalidPadWidth(*pad_width));
                }
            }
        }

        if let ValueStrategy::VariableSize { min_size, max_size } = &self.value_strategy {
            if min_size > max_size {
                return Err(ConfigError::InvalidValueSize {
                    min: *min_size,
                    max: *max_size,
                });
            }
        }

        if self.distribution.is_empty() {
            return Err(ConfigError::EmptyDistribution);
        }
        for (_, weight) in self.distribution.entries() {
            if !weight.is_finite() || *weight < 0.0 {
                return Err(ConfigError::InvalidWeight(*weight));
            }
        }
        if self.distribution.total_weight() <= 0.0 {
            return Err(ConfigError::NoPositiveWeight);
        }

        for (name, probability) in [
            ("allocation", self.failure.allocation),
            ("filesystem", self.failure.filesystem),
            ("network", self.failure.network),
        ] {
            if !(0.0..=1.0).contains(&probability) {
                return Err(ConfigError::InvalidProbability {
                    name: name.to_string(),
                    value: probability,
                });
            }
        }
        for (name, probability) in &self.failure.custom {
            if !(0.0..=1.0).contains(probability) {
                return Err(ConfigError::InvalidProbability {
                    name: name.clone(),
                    value: *probability,
                });
            }
        }
        for multiplier in &self.failure.multipliers {
            if !multiplier.factor.is_finite() || multiplier.factor < 0.0 {
                return Err(ConfigError::InvalidMultiplier(multiplier.factor));
            }
        }

        Ok(())
    }
}

/// Why a run ended unsuccessfully.
#[derive(Error, Debug)]
pub enum PropertyError<K: OpKind> {
    #[error("configuration rejected: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Harness(#[from] HarnessError),

    /// A critical invariant violation survived shrinking.  The report is
    /// the minimal reproduction candidate.
    #[error("{0}")]
    Violated(FailureReport<K>),
}

/// The orchestrator.  Constructed once per test; `run` consumes it.
pub struct PropertyTest<H: SystemHarness> {
    config: TestConfig<H::Kind>,
    harness: H,
    invariants: Vec<Invariant<H::System>>,
}

impl<H: SystemHarness> PropertyTest<H> {
    /// Create a property test over a host harness.
    pub fn new(config: TestConfig<H::Kind>, harness: H) -> Self {
        Self {
            config,
            harness,
            invariants: Vec::new(),
        }
    }

    /// Register an invariant, builder style.
    pub fn with_invariant(mut self, invariant: Invariant<H::System>) -> Self {
        self.invariants.push(invariant);
        self
    }

    /// Register an invariant.
    pub fn add_invariant(&mut self, invariant: Invariant<H::System>) {
        self.invariants.push(invariant);
    }

    /// Run `iterations` iterations.  Success, or the first fatal error or
    /// reported violation.
    pub fn run(self, iterations: u64) -> Result<(), PropertyError<H::Kind>> {
        self.run_with_stats(iterations).map(|_| ())
    }

    /// Run `iterations` iterations and return the accumulated statistics.
    ///
    /// On a critical violation the typed error carries the shrunk
    /// reproduction instead.
    pub fn run_with_stats(
        mut self,
        iterations: u64,
    ) -> Result<TestStatistics<H::Kind>, PropertyError<H::Kind>> {
        self.config.validate()?;

        let started = Instant::now();
        let mut distribution = self.config.distribution.clone();
        distribution.normalize();

        let generator = SequenceGenerator::new(
            distribution.clone(),
            self.config.key_strategy.clone(),
            self.config.value_strategy.clone(),
            self.config.min_sequence_len,
            self.config.max_sequence_len,
        );
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        let mut injector = FailureInjector::new(self.config.failure.clone());
        let mut stats = TestStatistics::new(self.config.detailed_stats);
        stats.set_intended(distribution.entries());
        let shrinker = Shrinker::new(self.config.shrink.clone());

        info!(
            "starting property test: {iterations} iterations, seed {}",
            self.config.seed
        );

        for iteration in 0..iterations {
            debug!("iteration {iteration}: generating");
            let sequence = generator.generate(&mut rng);
            stats.sequences_tested += 1;

            debug!("iteration {iteration}: executing {} ops", sequence.len());
            let mut executor = Executor::new(
                &mut self.harness,
                &self.invariants,
                &mut injector,
                &mut stats,
            );
            match executor.execute(&mut rng, &sequence)? {
                SequenceOutcome::Passed => {}
                SequenceOutcome::CriticalViolation(violation) => {
                    warn!(
                        "iteration {iteration}: critical violation of '{}', shrinking",
                        violation.invariant
                    );
                    let shrunk = shrinker.shrink(&mut rng, &mut executor, &sequence)?;

                    stats.merge_tracker(injector.tracker());
                    stats.execution_time = started.elapsed();
                    let report = FailureReport {
                        seed: self.config.seed,
                        iteration,
                        violation,
                        original_len: sequence.len(),
                        shrink_iterations: stats.shrink_iterations,
                        shrunk,
                    };
                    error!("{}", format_failure(&report));
                    return Err(PropertyError::Violated(report));
                }
            }
        }

        stats.merge_tracker(injector.tracker());
        stats.execution_time = started.elapsed();
        info!(
            "property test passed: {} sequences, {} operations, {} injections",
            stats.sequences_tested,
            stats.operations_total,
            stats.total_injections()
        );
        Ok(stats)
    }
}
