//! Sequence execution against a fresh system instance.
//!
//! For each operation the executor consults the failure injector for the
//! built-in allocation category.  An injected failure means the operation
//! never reaches the system: it is recorded and skipped.  Otherwise the
//! host's execute handler runs with a [`FaultContext`], and any error it
//! returns is swallowed as an expected consequence of fault injection.
//! All registered invariants are evaluated after every operation, executed
//! or skipped; a critical violation aborts the sequence.
//!
//! Teardown runs on every exit path once the system was constructed.

use crate::failure::{FailureCategory, FailureInjector, FaultContext};
use crate::harness::{HarnessError, SystemHarness};
use crate::invariant::{Invariant, Severity, Violation};
use crate::op::OperationSequence;
use crate::stats::TestStatistics;
use log::{debug, warn};
use rand_chacha::ChaCha8Rng;
use std::time::Instant;

/// Result of executing one sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceOutcome {
    /// Every operation ran without a critical violation.
    Passed,
    /// A critical invariant was violated; the sequence was aborted.
    CriticalViolation(Violation),
}

/// Runs one sequence against one freshly constructed system instance.
pub struct Executor<'a, H: SystemHarness> {
    pub(crate) harness: &'a mut H,
    pub(crate) invariants: &'a [Invariant<H::System>],
    pub(crate) injector: &'a mut FailureInjector,
    pub(crate) stats: &'a mut TestStatistics<H::Kind>,
}

impl<'a, H: SystemHarness> Executor<'a, H> {
    /// Borrow the pieces needed to execute sequences.
    pub fn new(
        harness: &'a mut H,
        invariants: &'a [Invariant<H::System>],
        injector: &'a mut FailureInjector,
        stats: &'a mut TestStatistics<H::Kind>,
    ) -> Self {
        Self {
            harness,
            invariants,
            injector,
            stats,
        }
    }

    /// Execute `sequence` against a fresh system instance.
    ///
    /// Construction failure propagates as fatal.  Once the system exists,
    /// teardown is guaranteed before returning.
    pub fn execute(
        &mut self,
        rng: &mut ChaCha8Rng,
        sequence: &OperationSequence<H::Kind>,
    ) -> Result<SequenceOutcome, HarnessError> {
        // A fresh instance starts in no declared condition.
        self.injector.clear_condition();
        let mut system = self.harness.init()?;
        let outcome = self.run_operations(rng, &mut system, sequence);
        self.harness.teardown(system);
        Ok(outcome)
    }

    fn run_operations(
        &mut self,
        rng: &mut ChaCha8Rng,
        system: &mut H::System,
        sequence: &OperationSequence<H::Kind>,
    ) -> SequenceOutcome {
        for (index, op) in sequence.iter().enumerate() {
            self.stats.operations_total += 1;

            if self.injector.should_inject(rng, FailureCategory::Allocation) {
                debug!("op {index}: allocation failure injected, handler skipped");
            } else {
                let started = self.stats.is_detailed().then(Instant::now);
                let mut ctx = FaultContext::new(self.injector, rng);
                if let Err(err) = self.harness.execute(system, op, &mut ctx) {
                    debug!("op {index} failed (expected under fault injection): {err}");
                }
                if let Some(started) = started {
                    if let Err(err) = self.stats.record_detail(&op.kind, started.elapsed()) {
                        warn!("statistics recording failed: {err}");
                    }
                }
            }

            for invariant in self.invariants {
                if invariant.holds(system) {
                    continue;
                }
                self.stats.invariant_violations += 1;
                let violation = Violation {
                    invariant: invariant.name().to_string(),
                    severity: invariant.severity(),
                    operation_index: index,
                };
                match invariant.severity() {
                    Severity::Critical => {
                        warn!(
                            "critical invariant '{}' violated after op {index}",
                            invariant.name()
                        );
                        return SequenceOutcome::CriticalViolation(violation);
                    }
                    Severity::Important => {
                        warn!(
                            "important invariant '{}' violated after op {index}",
                            invariant.name()
                        );
                    }
                    Severity::Advisory => {
                        debug!(
                            "advisory invariant '{}' violated after op {index}",
                            invariant.name()
                        );
                    }
                }
            }
        }
        SequenceOutcome::Passed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::FailureConfig;
    use crate::harness::OperationError;
    use crate::op::Operation;
    use rand::SeedableRng;
    use serde::Serialize;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
    enum Kind {
        Bump,
    }

    /// Harness over a plain counter, tracking lifecycle calls.
    struct CounterHarness {
        inits: u32,
        teardowns: u32,
        handler_calls: u32,
        fail_handler: bool,
    }

    impl CounterHarness {
        fn new() -> Self {
            Self {
                inits: 0,
                teardowns: 0,
                handler_calls: 0,
                fail_handler: false,
            }
        }
    }

    impl SystemHarness for CounterHarness {
        type System = u32;
        type Kind = Kind;

        fn init(&mut self) -> Result<u32, HarnessError> {
            self.inits += 1;
            Ok(0)
        }

        fn teardown(&mut self, _system: u32) {
            self.teardowns += 1;
        }

        fn execute(
            &mut self,
            system: &mut u32,
            _op: &Operation<Kind>,
            _ctx: &mut FaultContext<'_>,
        ) -> Result<(), OperationError> {
            self.handler_calls += 1;
            *system += 1;
            if self.fail_handler {
                return Err(OperationError::new("simulated handler failure"));
            }
            Ok(())
        }
    }

    fn make_sequence(len: usize) -> OperationSequence<Kind> {
        let mut seq = OperationSequence::with_capacity(len);
        for _ in 0..len {
            seq.push(Operation::new(Kind::Bump));
        }
        seq
    }

    fn run(
        harness: &mut CounterHarness,
        invariants: &[Invariant<u32>],
        failure: FailureConfig,
        detailed: bool,
        len: usize,
    ) -> (SequenceOutcome, TestStatistics<Kind>) {
        let mut injector = FailureInjector::new(failure);
        let mut stats = TestStatistics::new(detailed);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let outcome = Executor::new(harness, invariants, &mut injector, &mut stats)
            .execute(&mut rng, &make_sequence(len))
            .unwrap();
        stats.merge_tracker(injector.tracker());
        (outcome, stats)
    }

    #[test]
    fn passes_without_faults_or_violations() {
        let mut harness = CounterHarness::new();
        let (outcome, stats) = run(&mut harness, &[], FailureConfig::default(), false, 10);

        assert_eq!(outcome, SequenceOutcome::Passed);
        assert_eq!(stats.operations_total, 10);
        assert_eq!(harness.inits, 1);
        assert_eq!(harness.teardowns, 1);
        assert_eq!(harness.handler_calls, 10);
    }

    #[test]
    fn injected_allocation_failure_skips_handler() {
        let mut harness = CounterHarness::new();
        let failure = FailureConfig {
            allocation: 1.0,
            ..Default::default()
        };
        let (outcome, stats) = run(&mut harness, &[], failure, false, 10);

        assert_eq!(outcome, SequenceOutcome::Passed);
        assert_eq!(harness.handler_calls, 0);
        assert_eq!(stats.operations_total, 10);
        assert_eq!(stats.injections.get("allocation"), Some(&10));
        // Teardown still happens.
        assert_eq!(harness.teardowns, 1);
    }

    #[test]
    fn handler_errors_are_swallowed() {
        let mut harness = CounterHarness::new();
        harness.fail_handler = true;
        let (outcome, _stats) = run(&mut harness, &[], FailureConfig::default(), false, 5);

        assert_eq!(outcome, SequenceOutcome::Passed);
        assert_eq!(harness.handler_calls, 5);
    }

    #[test]
    fn critical_violation_aborts_at_offending_op() {
        let mut harness = CounterHarness::new();
        let invariants = vec![Invariant::new(
            "counter stays below 4",
            Severity::Critical,
            |c: &u32| *c < 4,
        )];
        let (outcome, stats) = run(&mut harness, &invariants, FailureConfig::default(), false, 10);

        let SequenceOutcome::CriticalViolation(violation) = outcome else {
            panic!("expected a critical violation");
        };
        assert_eq!(violation.operation_index, 3);
        assert_eq!(violation.invariant, "counter stays below 4");
        // Aborted: ops 4..10 never ran, teardown still happened.
        assert_eq!(stats.operations_total, 4);
        assert_eq!(harness.teardowns, 1);
        assert_eq!(stats.invariant_violations, 1);
    }

    #[test]
    fn important_violations_do_not_halt() {
        let mut harness = CounterHarness::new();
        let invariants = vec![Invariant::new(
            "never satisfied",
            Severity::Important,
            |_: &u32| false,
        )];
        let (outcome, stats) = run(&mut harness, &invariants, FailureConfig::default(), false, 6);

        assert_eq!(outcome, SequenceOutcome::Passed);
        assert_eq!(stats.invariant_violations, 6);
        assert_eq!(harness.handler_calls, 6);
    }

    #[test]
    fn invariants_checked_after_skipped_ops() {
        // With allocation at 1.0 the handler never runs, but the invariant
        // sweep still observes the untouched system after every op.
        let mut harness = CounterHarness::new();
        let invariants = vec![Invariant::new(
            "counter untouched",
            Severity::Critical,
            |c: &u32| *c == 0,
        )];
        let failure = FailureConfig {
            allocation: 1.0,
            ..Default::default()
        };
        let (outcome, stats) = run(&mut harness, &invariants, failure, false, 8);

        assert_eq!(outcome, SequenceOutcome::Passed);
        assert_eq!(stats.operations_total, 8);
    }

    #[test]
    fn empty_sequence_still_cycles_lifecycle() {
        let mut harness = CounterHarness::new();
        let (outcome, stats) = run(&mut harness, &[], FailureConfig::default(), false, 0);

        assert_eq!(outcome, SequenceOutcome::Passed);
        assert_eq!(stats.operations_total, 0);
        assert_eq!(harness.inits, 1);
        assert_eq!(harness.teardowns, 1);
    }

    #[test]
    fn detailed_stats_record_timing_and_frequency() {
        let mut harness = CounterHarness::new();
        let (_, stats) = run(&mut harness, &[], FailureConfig::default(), true, 12);

        let detail = stats.detail().unwrap();
        assert_eq!(detail.observed.get(&Kind::Bump), Some(&12));
        assert_eq!(detail.timings[&Kind::Bump].count, 12);
    }
}
