//! Failing-sequence minimization.
//!
//! The shrinker repeatedly removes one randomly chosen operation and
//! re-runs the executor on the candidate.  A candidate that still produces
//! a critical violation becomes the new current sequence; the first
//! candidate that passes ends the loop.  Shrinking is a diagnostic aid,
//! not fault tolerance: the result is reported alongside the seed as the
//! minimal reproduction candidate.

use crate::executor::{Executor, SequenceOutcome};
use crate::harness::{HarnessError, SystemHarness};
use crate::op::OperationSequence;
use log::{debug, info};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// Shrinking limits.
#[derive(Debug, Clone)]
pub struct ShrinkConfig {
    /// Upper bound on removal attempts.
    pub max_attempts: usize,
}

impl Default for ShrinkConfig {
    fn default() -> Self {
        Self { max_attempts: 100 }
    }
}

/// Minimizes sequences that triggered a critical violation.
#[derive(Debug, Clone)]
pub struct Shrinker {
    config: ShrinkConfig,
}

impl Shrinker {
    /// Create a shrinker with the given limits.
    pub fn new(config: ShrinkConfig) -> Self {
        Self { config }
    }

    /// Minimize `original`, which must have produced a critical violation.
    ///
    /// Each attempt removes one uniformly chosen operation and re-executes
    /// the candidate.  Candidates that still fail are adopted; the first
    /// candidate that passes stops the loop, as does reaching a
    /// single-operation sequence or `max_attempts`.  Returns the final
    /// current sequence, which may equal the original.
    pub fn shrink<H: SystemHarness>(
        &self,
        rng: &mut ChaCha8Rng,
        executor: &mut Executor<'_, H>,
        original: &OperationSequence<H::Kind>,
    ) -> Result<OperationSequence<H::Kind>, HarnessError> {
        let mut current = original.clone();

        for attempt in 0..self.config.max_attempts {
            if current.len() <= 1 {
                break;
            }

            let index = rng.gen_range(0..current.len());
            let candidate = current.without(index);

            match executor.execute(rng, &candidate)? {
                SequenceOutcome::CriticalViolation(_) => {
                    debug!(
                        "shrink attempt {attempt}: removing op {index} still fails ({} ops left)",
                        candidate.len()
                    );
                    current = candidate;
                    executor.stats.shrink_iterations += 1;
                }
                SequenceOutcome::Passed => {
                    debug!("shrink attempt {attempt}: removing op {index} passes, stopping");
                    break;
                }
            }
        }

        info!(
            "shrinking finished: {} ops -> {} ops",
            original.len(),
            current.len()
        );
        Ok(current)
    }
}
