//! Probabilistic failure injection.
//!
//! The injector computes an effective probability for a named failure
//! category from a base rate, the ordered conditional multipliers, and the
//! system's currently declared operational condition, then decides
//! injection with a single uniform draw.  Every decision consumes exactly
//! one draw whether or not it injects, so the stream position is
//! independent of outcomes.
//!
//! Hosts never query ambient state: the executor hands their execute
//! handler a [`FaultContext`] carrying the injector and the stream.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Operational state the system-under-test may declare to scale failure
/// probabilities.  At most one condition is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SystemCondition {
    /// Replaying logs, rebuilding indexes, etc.
    Recovery,
    /// Allocation headroom is low.
    MemoryPressure,
    /// Sustained high request volume.
    HighLoad,
    /// Partial functionality, e.g. a background task has failed.
    Degraded,
}

/// A scaling factor applied to failure probabilities while a matching
/// condition is declared.  Only the first matching entry applies.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalMultiplier {
    /// Condition under which this multiplier matches.
    pub condition: SystemCondition,
    /// Scaling factor, >= 0.
    pub factor: f64,
    /// Optional validity window.
    ///
    /// Validated and exposed via [`is_active`](Self::is_active) but not
    /// consulted when computing effective probabilities; elapsed wall time
    /// is nondeterministic, so gating on it would break seed
    /// reproducibility.
    pub duration: Option<Duration>,
}

impl ConditionalMultiplier {
    /// Create a multiplier with no validity window.
    pub fn new(condition: SystemCondition, factor: f64) -> Self {
        Self {
            condition,
            factor,
            duration: None,
        }
    }

    /// Attach a validity window.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Whether the multiplier is still within its validity window.
    pub fn is_active(&self, elapsed: Duration) -> bool {
        match self.duration {
            Some(duration) => elapsed <= duration,
            None => true,
        }
    }
}

/// Base injection probabilities plus conditional multipliers.
#[derive(Debug, Clone, Default)]
pub struct FailureConfig {
    /// Base probability for the built-in allocation category.  Consulted
    /// by the executor before every operation.
    pub allocation: f64,
    /// Base probability for the built-in filesystem category.
    pub filesystem: f64,
    /// Base probability for the built-in network category.
    pub network: f64,
    /// Host-named categories with their base probabilities.  Unregistered
    /// names have probability 0.0.
    pub custom: BTreeMap<String, f64>,
    /// Ordered multipliers; the first entry matching the declared
    /// condition wins.
    pub multipliers: Vec<ConditionalMultiplier>,
}

impl FailureConfig {
    /// Register a custom failure category.
    pub fn with_custom(mut self, name: impl Into<String>, probability: f64) -> Self {
        self.custom.insert(name.into(), probability);
        self
    }

    /// Append a conditional multiplier.
    pub fn with_multiplier(mut self, multiplier: ConditionalMultiplier) -> Self {
        self.multipliers.push(multiplier);
        self
    }

    /// Base probability for a category before multipliers.
    pub fn base_probability(&self, category: FailureCategory<'_>) -> f64 {
        match category {
            FailureCategory::Allocation => self.allocation,
            FailureCategory::Filesystem => self.filesystem,
            FailureCategory::Network => self.network,
            FailureCategory::Custom(name) => self.custom.get(name).copied().unwrap_or(0.0),
        }
    }
}

/// A failure category: three built-ins with dedicated config fields, plus
/// open-ended host-named categories.  Both paths share the multiplier
/// logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory<'a> {
    Allocation,
    Filesystem,
    Network,
    Custom(&'a str),
}

impl FailureCategory<'_> {
    /// Stable name used for tracker and statistics keys.
    pub fn name(&self) -> &str {
        match self {
            Self::Allocation => "allocation",
            Self::Filesystem => "filesystem",
            Self::Network => "network",
            Self::Custom(name) => name,
        }
    }
}

/// Per-category decision and injection counters.
#[derive(Debug, Clone, Default)]
pub struct FailureTracker {
    records: BTreeMap<String, CategoryRecord>,
}

/// Counters for one category.
#[derive(Debug, Clone, Copy, Default)]
pub struct CategoryRecord {
    /// Injection decisions made, injecting or not.
    pub decisions: u64,
    /// Decisions that injected.
    pub injections: u64,
}

impl FailureTracker {
    fn record(&mut self, category: &str, injected: bool) {
        let record = self.records.entry(category.to_string()).or_default();
        record.decisions += 1;
        if injected {
            record.injections += 1;
        }
    }

    /// Observed injection rate for a category; 0.0 when no decisions have
    /// been recorded.
    pub fn injection_rate(&self, category: &str) -> f64 {
        match self.records.get(category) {
            Some(record) if record.decisions > 0 => {
                record.injections as f64 / record.decisions as f64
            }
            _ => 0.0,
        }
    }

    /// Injections recorded for a category.
    pub fn injections(&self, category: &str) -> u64 {
        self.records.get(category).map_or(0, |r| r.injections)
    }

    /// Decisions recorded for a category.
    pub fn decisions(&self, category: &str) -> u64 {
        self.records.get(category).map_or(0, |r| r.decisions)
    }

    /// Injections across all categories.
    pub fn total_injections(&self) -> u64 {
        self.records.values().map(|r| r.injections).sum()
    }

    /// Per-category counters, keyed by category name.
    pub fn records(&self) -> &BTreeMap<String, CategoryRecord> {
        &self.records
    }
}

/// Decides failure injection from base rates, multipliers, and the
/// declared condition.
#[derive(Debug, Clone)]
pub struct FailureInjector {
    config: FailureConfig,
    condition: Option<SystemCondition>,
    tracker: FailureTracker,
}

impl FailureInjector {
    /// Create an injector; no condition is declared initially.
    pub fn new(config: FailureConfig) -> Self {
        Self {
            config,
            condition: None,
            tracker: FailureTracker::default(),
        }
    }

    /// Effective probability for a category under the declared condition.
    ///
    /// Base rate times the factor of the first multiplier matching the
    /// condition (1.0 when none matches or no condition is declared),
    /// clamped to [0.0, 1.0].
    pub fn effective_probability(&self, category: FailureCategory<'_>) -> f64 {
        let base = self.config.base_probability(category);
        let factor = match self.condition {
            Some(condition) => self
                .config
                .multipliers
                .iter()
                .find(|m| m.condition == condition)
                .map_or(1.0, |m| m.factor),
            None => 1.0,
        };
        (base * factor).clamp(0.0, 1.0)
    }

    /// Decide injection for a category.
    ///
    /// Consumes exactly one uniform draw regardless of the outcome and
    /// records the decision in the tracker.
    pub fn should_inject(&mut self, rng: &mut ChaCha8Rng, category: FailureCategory<'_>) -> bool {
        let roll = rng.gen::<f64>();
        let injected = roll < self.effective_probability(category);
        self.tracker.record(category.name(), injected);
        injected
    }

    /// Declare the system's operational condition.
    pub fn set_condition(&mut self, condition: SystemCondition) {
        self.condition = Some(condition);
    }

    /// Clear the declared condition.
    pub fn clear_condition(&mut self) {
        self.condition = None;
    }

    /// The currently declared condition.
    pub fn condition(&self) -> Option<SystemCondition> {
        self.condition
    }

    /// Decision/injection counters accumulated so far.
    pub fn tracker(&self) -> &FailureTracker {
        &self.tracker
    }

    /// The injector's configuration.
    pub fn config(&self) -> &FailureConfig {
        &self.config
    }
}

/// Explicit injection context handed to the host's execute handler.
///
/// Carries the active injector and the shared stream so host code can ask
/// "should I fail now?" without any global or thread-local state.
pub struct FaultContext<'a> {
    injector: &'a mut FailureInjector,
    rng: &'a mut ChaCha8Rng,
}

impl<'a> FaultContext<'a> {
    /// Build a context around the injector and the shared stream.
    pub fn new(injector: &'a mut FailureInjector, rng: &'a mut ChaCha8Rng) -> Self {
        Self { injector, rng }
    }

    /// Decide injection for a category.  One stream draw per call.
    pub fn should_inject(&mut self, category: FailureCategory<'_>) -> bool {
        self.injector.should_inject(self.rng, category)
    }

    /// Effective probability for a category without drawing.
    pub fn effective_probability(&self, category: FailureCategory<'_>) -> f64 {
        self.injector.effective_probability(category)
    }

    /// Declare the system's operational condition.
    pub fn set_condition(&mut self, condition: SystemCondition) {
        self.injector.set_condition(condition);
    }

    /// Clear the declared condition.
    pub fn clear_condition(&mut self) {
        self.injector.clear_condition();
    }

    /// The currently declared condition.
    pub fn condition(&self) -> Option<SystemCondition> {
        self.injector.condition()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn make_injector(config: FailureConfig) -> FailureInjector {
        FailureInjector::new(config)
    }

    #[test]
    fn effective_probability_clamps_to_one() {
        let config = FailureConfig {
            allocation: 0.3,
            multipliers: vec![ConditionalMultiplier::new(SystemCondition::Recovery, 10.0)],
            ..Default::default()
        };
        let mut injector = make_injector(config);
        injector.set_condition(SystemCondition::Recovery);

        assert_eq!(
            injector.effective_probability(FailureCategory::Allocation),
            1.0
        );
    }

    #[test]
    fn effective_probability_monotone_in_factor() {
        let mut last = 0.0;
        for factor in [0.0, 0.5, 1.0, 2.0, 5.0, 100.0] {
            let config = FailureConfig {
                allocation: 0.3,
                multipliers: vec![ConditionalMultiplier::new(
                    SystemCondition::MemoryPressure,
                    factor,
                )],
                ..Default::default()
            };
            let mut injector = make_injector(config);
            injector.set_condition(SystemCondition::MemoryPressure);

            let p = injector.effective_probability(FailureCategory::Allocation);
            assert!(p >= last, "p={p} after {last}");
            assert!(p <= 1.0);
            last = p;
        }
    }

    #[test]
    fn first_matching_multiplier_wins() {
        let config = FailureConfig {
            network: 0.1,
            multipliers: vec![
                ConditionalMultiplier::new(SystemCondition::HighLoad, 2.0),
                ConditionalMultiplier::new(SystemCondition::HighLoad, 9.0),
            ],
            ..Default::default()
        };
        let mut injector = make_injector(config);
        injector.set_condition(SystemCondition::HighLoad);

        let p = injector.effective_probability(FailureCategory::Network);
        assert!((p - 0.2).abs() < 1e-12, "p was {p}");
    }

    #[test]
    fn no_condition_means_no_multiplier() {
        let config = FailureConfig {
            filesystem: 0.25,
            multipliers: vec![ConditionalMultiplier::new(SystemCondition::Recovery, 4.0)],
            ..Default::default()
        };
        let injector = make_injector(config);

        let p = injector.effective_probability(FailureCategory::Filesystem);
        assert!((p - 0.25).abs() < 1e-12);
    }

    #[test]
    fn multiplier_duration_not_consulted() {
        // An expired window still scales: duration is validated config,
        // not an execution-path input.
        let config = FailureConfig {
            allocation: 0.2,
            multipliers: vec![ConditionalMultiplier::new(SystemCondition::Recovery, 2.0)
                .with_duration(Duration::from_secs(0))],
            ..Default::default()
        };
        let mut injector = make_injector(config);
        injector.set_condition(SystemCondition::Recovery);

        assert!(!injector.config().multipliers[0].is_active(Duration::from_secs(1)));
        let p = injector.effective_probability(FailureCategory::Allocation);
        assert!((p - 0.4).abs() < 1e-12);
    }

    #[test]
    fn multiplier_is_active_within_window() {
        let m = ConditionalMultiplier::new(SystemCondition::Degraded, 3.0)
            .with_duration(Duration::from_secs(10));
        assert!(m.is_active(Duration::from_secs(5)));
        assert!(m.is_active(Duration::from_secs(10)));
        assert!(!m.is_active(Duration::from_secs(11)));

        let unbounded = ConditionalMultiplier::new(SystemCondition::Degraded, 3.0);
        assert!(unbounded.is_active(Duration::from_secs(1_000_000)));
    }

    #[test]
    fn custom_category_at_one_always_injects() {
        let config = FailureConfig::default().with_custom("disk_full", 1.0);
        let mut injector = make_injector(config);
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        for _ in 0..100 {
            assert!(injector.should_inject(&mut rng, FailureCategory::Custom("disk_full")));
        }
    }

    #[test]
    fn unregistered_custom_category_never_injects() {
        let mut injector = make_injector(FailureConfig::default());
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        for _ in 0..100 {
            assert!(!injector.should_inject(&mut rng, FailureCategory::Custom("no_such")));
        }
        assert_eq!(injector.tracker().injections("no_such"), 0);
        assert_eq!(injector.tracker().decisions("no_such"), 100);
    }

    #[test]
    fn decision_consumes_one_draw_either_way() {
        // Two injectors with opposite outcomes must leave their streams at
        // the same position: the next raw draws agree.
        let mut always = make_injector(FailureConfig::default().with_custom("x", 1.0));
        let mut never = make_injector(FailureConfig::default());

        let mut rng_a = ChaCha8Rng::seed_from_u64(42);
        let mut rng_b = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..10 {
            always.should_inject(&mut rng_a, FailureCategory::Custom("x"));
            never.should_inject(&mut rng_b, FailureCategory::Custom("x"));
        }
        assert_eq!(rng_a.gen::<u64>(), rng_b.gen::<u64>());
    }

    #[test]
    fn observed_rate_tracks_configured_probability() {
        let config = FailureConfig {
            allocation: 0.1,
            ..Default::default()
        };
        let mut injector = make_injector(config);
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        for _ in 0..10_000 {
            injector.should_inject(&mut rng, FailureCategory::Allocation);
        }
        let rate = injector.tracker().injection_rate("allocation");
        assert!((0.08..=0.12).contains(&rate), "rate was {rate}");
    }

    #[test]
    fn tracker_rate_zero_without_records() {
        let tracker = FailureTracker::default();
        assert_eq!(tracker.injection_rate("allocation"), 0.0);
        assert_eq!(tracker.total_injections(), 0);
    }

    #[test]
    fn context_threads_condition_to_injector() {
        let mut injector = make_injector(FailureConfig::default());
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let mut ctx = FaultContext::new(&mut injector, &mut rng);
        assert_eq!(ctx.condition(), None);
        ctx.set_condition(SystemCondition::MemoryPressure);
        assert_eq!(ctx.condition(), Some(SystemCondition::MemoryPressure));
        ctx.clear_condition();

        assert_eq!(injector.condition(), None);
    }
}
