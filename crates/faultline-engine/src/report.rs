//! Human-readable reports and the failure reproduction artifact.
//!
//! [`FailureReport`] is the serializable record of a critical violation:
//! the seed, the iteration, the violated invariant, and the shrunk
//! sequence.  Together with the seed it is the minimal reproduction
//! candidate.  The formatters here render reports and run statistics for
//! terminals; they do no I/O themselves.

use crate::invariant::Violation;
use crate::op::{OpKind, Operation, OperationSequence};
use crate::stats::TestStatistics;
use serde::Serialize;
use std::fmt;

/// How many operations of the shrunk sequence the formatter prints.
const MAX_LISTED_OPS: usize = 10;

/// Record of a critical invariant violation, shrunk and ready to report.
#[derive(Debug, Clone, Serialize)]
pub struct FailureReport<K: OpKind> {
    /// Seed of the run that found the violation.
    pub seed: u64,
    /// Zero-based iteration that produced the failing sequence.
    pub iteration: u64,
    /// The critical violation that aborted the sequence.
    pub violation: Violation,
    /// Length of the sequence as generated.
    pub original_len: usize,
    /// Successful shrink steps taken.
    pub shrink_iterations: u64,
    /// The minimal reproduction candidate.
    pub shrunk: OperationSequence<K>,
}

impl<K: OpKind> fmt::Display for FailureReport<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "critical invariant '{}' violated at iteration {} (seed {}, {} ops shrunk to {})",
            self.violation.invariant,
            self.iteration,
            self.seed,
            self.original_len,
            self.shrunk.len()
        )
    }
}

/// Format a failure report with the minimal reproduction listing.
pub fn format_failure<K: OpKind>(report: &FailureReport<K>) -> String {
    let mut output = String::new();

    output.push_str("═══════════════════════════════════════════════════════════════════════\n");
    output.push_str("  Faultline Failure Report\n");
    output.push_str("═══════════════════════════════════════════════════════════════════════\n\n");

    output.push_str(&format!("Seed:                  {}\n", report.seed));
    output.push_str(&format!("Iteration:             {}\n", report.iteration));
    output.push_str(&format!(
        "Invariant:             '{}' ({})\n",
        report.violation.invariant, report.violation.severity
    ));
    output.push_str(&format!(
        "Violated after op:     {}\n",
        report.violation.operation_index
    ));
    output.push_str(&format!(
        "Original length:       {} ops\n",
        report.original_len
    ));
    output.push_str(&format!(
        "Shrunk length:         {} ops ({} shrink steps)\n",
        report.shrunk.len(),
        report.shrink_iterations
    ));

    output.push_str("\n─── Minimal Reproduction ──────────────────────────────────────────────\n");
    for (i, op) in report.shrunk.iter().take(MAX_LISTED_OPS).enumerate() {
        output.push_str(&format!("  [{i}] {}\n", format_op(op)));
    }
    if report.shrunk.len() > MAX_LISTED_OPS {
        output.push_str(&format!(
            "  ... and {} more operations\n",
            report.shrunk.len() - MAX_LISTED_OPS
        ));
    }

    output.push_str("═══════════════════════════════════════════════════════════════════════\n");
    output
}

/// Format accumulated statistics.
pub fn format_statistics<K: OpKind>(stats: &TestStatistics<K>) -> String {
    let mut output = String::new();

    output.push_str("═══════════════════════════════════════════════════════════════════════\n");
    output.push_str("  Faultline Run Statistics\n");
    output.push_str("═══════════════════════════════════════════════════════════════════════\n\n");

    output.push_str(&format!(
        "Sequences tested:      {}\n",
        stats.sequences_tested
    ));
    output.push_str(&format!(
        "Operations executed:   {}\n",
        stats.operations_total
    ));
    output.push_str(&format!(
        "Invariant violations:  {}\n",
        stats.invariant_violations
    ));
    output.push_str(&format!(
        "Shrink iterations:     {}\n",
        stats.shrink_iterations
    ));
    output.push_str(&format!(
        "Execution time:        {:?}\n",
        stats.execution_time
    ));

    if !stats.injections.is_empty() {
        output.push_str(
            "\n─── Failure Injections ────────────────────────────────────────────────\n",
        );
        for (category, count) in &stats.injections {
            output.push_str(&format!("{category:<22} {count}\n"));
        }
    }

    if let Some(detail) = stats.detail() {
        output.push_str(
            "\n─── Operation Detail ──────────────────────────────────────────────────\n",
        );
        for (kind, timing) in &detail.timings {
            let intended = detail
                .intended
                .iter()
                .find(|(k, _)| k == kind)
                .map(|(_, w)| *w);
            let share = detail.observed_share(kind);
            match intended {
                Some(intended) => output.push_str(&format!(
                    "{kind:?}: {} calls (observed {:.1}%, intended {:.1}%), mean {:?}, min {:?}, max {:?}\n",
                    timing.count,
                    share * 100.0,
                    intended * 100.0,
                    timing.mean(),
                    timing.min,
                    timing.max,
                )),
                None => output.push_str(&format!(
                    "{kind:?}: {} calls (observed {:.1}%), mean {:?}, min {:?}, max {:?}\n",
                    timing.count,
                    share * 100.0,
                    timing.mean(),
                    timing.min,
                    timing.max,
                )),
            }
        }
    }

    output.push_str("═══════════════════════════════════════════════════════════════════════\n");
    output
}

fn format_op<K: OpKind>(op: &Operation<K>) -> String {
    let mut line = format!("{:?}", op.kind);
    if let Some(key) = &op.key {
        line.push_str(&format!(" key={}", preview(key)));
    }
    if let Some(value) = &op.value {
        line.push_str(&format!(" value=({} bytes)", value.len()));
    }
    line
}

fn preview(bytes: &[u8]) -> String {
    if bytes.iter().all(|b| b.is_ascii_graphic()) && bytes.len() <= 24 {
        format!("\"{}\"", String::from_utf8_lossy(bytes))
    } else {
        let head: String = bytes.iter().take(8).map(|b| format!("{b:02x}")).collect();
        format!("0x{head}.. ({} bytes)", bytes.len())
    }
}
