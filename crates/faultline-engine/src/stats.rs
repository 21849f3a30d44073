//! Run statistics.
//!
//! [`TestStatistics`] accumulates counters across iterations: operations,
//! sequences, violations, shrink iterations, wall-clock time, and
//! per-category injection counts.  Per-operation timing and the
//! actual-vs-intended frequency distribution sit behind the detailed flag
//! so the common path pays nothing for them.
//!
//! Statistics-recording errors are never fatal: callers log them at
//! `warn!` and continue.

use crate::failure::FailureTracker;
use crate::op::OpKind;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

/// Cap on distinct kinds in the detailed tables.
pub const MAX_TRACKED_KINDS: usize = 64;

/// Non-fatal statistics-recording error.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum StatsError {
    #[error("detailed statistics are not enabled")]
    DetailDisabled,
    #[error("per-operation kind table is full")]
    KindTableFull,
}

/// Timing accumulator for one operation kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpTiming {
    /// Handler invocations timed.
    pub count: u64,
    /// Fastest invocation.
    pub min: Duration,
    /// Slowest invocation.
    pub max: Duration,
    /// Sum over all invocations.
    pub total: Duration,
}

impl OpTiming {
    fn record(&mut self, elapsed: Duration) {
        if self.count == 0 {
            self.min = elapsed;
            self.max = elapsed;
        } else {
            self.min = self.min.min(elapsed);
            self.max = self.max.max(elapsed);
        }
        self.count += 1;
        self.total += elapsed;
    }

    /// Mean invocation time; zero when nothing was recorded.
    pub fn mean(&self) -> Duration {
        if self.count == 0 {
            Duration::ZERO
        } else {
            self.total / self.count as u32
        }
    }
}

/// Detailed per-kind tables, populated only when enabled.
#[derive(Debug, Clone)]
pub struct DetailedStats<K: OpKind> {
    /// Timing per kind.
    pub timings: BTreeMap<K, OpTiming>,
    /// Executed-operation counts per kind.
    pub observed: BTreeMap<K, u64>,
    /// Normalized weights the distribution intended, captured at run
    /// start, in distribution order.
    pub intended: Vec<(K, f64)>,
}

impl<K: OpKind> Default for DetailedStats<K> {
    fn default() -> Self {
        Self {
            timings: BTreeMap::new(),
            observed: BTreeMap::new(),
            intended: Vec::new(),
        }
    }
}

impl<K: OpKind> DetailedStats<K> {
    /// Total operations recorded in the frequency table.
    pub fn total_observed(&self) -> u64 {
        self.observed.values().sum()
    }

    /// Observed share of a kind; 0.0 when nothing was recorded.
    pub fn observed_share(&self, kind: &K) -> f64 {
        let total = self.total_observed();
        if total == 0 {
            return 0.0;
        }
        self.observed.get(kind).copied().unwrap_or(0) as f64 / total as f64
    }
}

/// Counters accumulated across one run.
///
/// Mutated only by the executor, shrinker, and orchestrator; callers read
/// the value returned by `run_with_stats` after the run completes.
#[derive(Debug, Clone)]
pub struct TestStatistics<K: OpKind> {
    /// Operations processed by the executor, shrink re-runs included.
    pub operations_total: u64,
    /// Sequences generated and executed.
    pub sequences_tested: u64,
    /// Invariant violations of any severity.
    pub invariant_violations: u64,
    /// Successful shrink steps.
    pub shrink_iterations: u64,
    /// Wall-clock duration of the run.
    pub execution_time: Duration,
    /// Injection counts per failure-category name.
    pub injections: BTreeMap<String, u64>,
    detail: Option<DetailedStats<K>>,
}

impl<K: OpKind> TestStatistics<K> {
    /// Create statistics, optionally with the detailed tables enabled.
    pub fn new(detailed: bool) -> Self {
        Self {
            operations_total: 0,
            sequences_tested: 0,
            invariant_violations: 0,
            shrink_iterations: 0,
            execution_time: Duration::ZERO,
            injections: BTreeMap::new(),
            detail: detailed.then(DetailedStats::default),
        }
    }

    /// Whether the detailed tables are enabled.
    pub fn is_detailed(&self) -> bool {
        self.detail.is_some()
    }

    /// The detailed tables, when enabled.
    pub fn detail(&self) -> Option<&DetailedStats<K>> {
        self.detail.as_ref()
    }

    /// Record one executed operation's timing and frequency.
    ///
    /// The kind tables are bounded at [`MAX_TRACKED_KINDS`]; a full table
    /// yields an error the caller logs and ignores.
    pub fn record_detail(&mut self, kind: &K, elapsed: Duration) -> Result<(), StatsError> {
        let detail = self.detail.as_mut().ok_or(StatsError::DetailDisabled)?;
        if !detail.timings.contains_key(kind) && detail.timings.len() >= MAX_TRACKED_KINDS {
            return Err(StatsError::KindTableFull);
        }
        detail.timings.entry(kind.clone()).or_default().record(elapsed);
        *detail.observed.entry(kind.clone()).or_insert(0) += 1;
        Ok(())
    }

    /// Capture the intended frequency distribution.  No-op unless the
    /// detailed tables are enabled.
    pub fn set_intended(&mut self, entries: &[(K, f64)]) {
        if let Some(detail) = self.detail.as_mut() {
            detail.intended = entries.to_vec();
        }
    }

    /// Copy per-category injection counts out of the tracker.
    pub fn merge_tracker(&mut self, tracker: &FailureTracker) {
        self.injections = tracker
            .records()
            .iter()
            .map(|(name, record)| (name.clone(), record.injections))
            .collect();
    }

    /// Injections across all categories.
    pub fn total_injections(&self) -> u64 {
        self.injections.values().sum()
    }
}
