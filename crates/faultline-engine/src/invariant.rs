//! Invariant checkers.
//!
//! An [`Invariant`] is a named predicate over system state, evaluated by
//! the executor after every operation.  Severity decides what a violation
//! does: `Critical` aborts the sequence and triggers shrinking,
//! `Important` and `Advisory` are recorded and execution continues.

use serde::Serialize;
use std::fmt;

/// How severely a violation is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    /// Aborts the sequence; the run fails after shrinking and reporting.
    Critical,
    /// Recorded and logged, execution continues.
    Important,
    /// Recorded at low log priority, execution continues.
    Advisory,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Critical => "critical",
            Self::Important => "important",
            Self::Advisory => "advisory",
        };
        f.write_str(s)
    }
}

/// A named, severity-tagged predicate over system state.
///
/// Predicates must be pure reads: they are evaluated after every operation
/// and must not mutate the system or draw randomness.
pub struct Invariant<S> {
    name: String,
    severity: Severity,
    check: Box<dyn Fn(&S) -> bool>,
}

impl<S> Invariant<S> {
    /// Create an invariant from a predicate.
    pub fn new(
        name: impl Into<String>,
        severity: Severity,
        check: impl Fn(&S) -> bool + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            severity,
            check: Box::new(check),
        }
    }

    /// Evaluate the predicate against the live system.
    pub fn holds(&self, system: &S) -> bool {
        (self.check)(system)
    }

    /// The invariant's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The invariant's severity.
    pub fn severity(&self) -> Severity {
        self.severity
    }
}

impl<S> fmt::Debug for Invariant<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invariant")
            .field("name", &self.name)
            .field("severity", &self.severity)
            .finish_non_exhaustive()
    }
}

/// A recorded invariant violation.  Data, not an error: only `Critical`
/// violations are promoted to a test failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Name of the violated invariant.
    pub invariant: String,
    /// Severity at the time of violation.
    pub severity: Severity,
    /// Index of the operation after which the violation was observed.
    pub operation_index: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        value: u32,
    }

    #[test]
    fn holds_reads_live_state() {
        let invariant = Invariant::new("counter bounded", Severity::Critical, |c: &Counter| {
            c.value <= 50
        });

        let mut counter = Counter { value: 50 };
        assert!(invariant.holds(&counter));
        counter.value = 51;
        assert!(!invariant.holds(&counter));
    }

    #[test]
    fn accessors_expose_name_and_severity() {
        let invariant =
            Invariant::new("no empty keys", Severity::Advisory, |_: &Counter| true);
        assert_eq!(invariant.name(), "no empty keys");
        assert_eq!(invariant.severity(), Severity::Advisory);
    }

    #[test]
    fn severity_displays_lowercase() {
        assert_eq!(Severity::Critical.to_string(), "critical");
        assert_eq!(Severity::Important.to_string(), "important");
        assert_eq!(Severity::Advisory.to_string(), "advisory");
    }
}
