//! The system-under-test seam.
//!
//! Hosts implement [`SystemHarness`] to hand the engine the three
//! lifecycle points it needs: construct a fresh system, execute one
//! operation against it, and tear it down.  Dispatching an operation kind
//! to host behavior is the host's job inside `execute`; the engine never
//! reflects on names or methods.
//!
//! [`FnHarness`] adapts three closures for hosts that prefer functions
//! over a trait impl.

use crate::failure::FaultContext;
use crate::op::{OpKind, Operation};
use std::marker::PhantomData;
use thiserror::Error;

/// Fatal lifecycle error.  Propagates and aborts the whole run; system
/// construction is never fault-injected.
#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("system construction failed: {0}")]
    Construct(String),
}

/// Expected operational error from the host's execute handler.
///
/// Under fault injection these are a normal consequence of injected
/// failures; the executor logs and swallows them.
#[derive(Error, Debug)]
#[error("{0}")]
pub struct OperationError(pub String);

impl OperationError {
    /// Create an operation error from any message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// The interface a host supplies to put its system under test.
pub trait SystemHarness {
    /// The system-under-test instance type.
    type System;
    /// The host's enumerated operation-kind type.
    type Kind: OpKind;

    /// Construct a fresh system instance.  Called once per sequence.
    fn init(&mut self) -> Result<Self::System, HarnessError>;

    /// Release a system instance.  Called on every exit path.
    fn teardown(&mut self, system: Self::System);

    /// Execute one operation against the live system.
    ///
    /// `ctx` carries the active failure injector and stream; host code
    /// decides where injected failures take effect by consulting it.
    fn execute(
        &mut self,
        system: &mut Self::System,
        op: &Operation<Self::Kind>,
        ctx: &mut FaultContext<'_>,
    ) -> Result<(), OperationError>;
}

/// Adapter building a [`SystemHarness`] from three closures.
pub struct FnHarness<S, K, I, T, E> {
    init: I,
    teardown: T,
    execute: E,
    _marker: PhantomData<fn() -> (S, K)>,
}

impl<S, K, I, T, E> FnHarness<S, K, I, T, E>
where
    K: OpKind,
    I: FnMut() -> Result<S, HarnessError>,
    T: FnMut(S),
    E: FnMut(&mut S, &Operation<K>, &mut FaultContext<'_>) -> Result<(), OperationError>,
{
    /// Build a harness from constructor, teardown, and execute closures.
    pub fn new(init: I, teardown: T, execute: E) -> Self {
        Self {
            init,
            teardown,
            execute,
            _marker: PhantomData,
        }
    }
}

impl<S, K, I, T, E> SystemHarness for FnHarness<S, K, I, T, E>
where
    K: OpKind,
    I: FnMut() -> Result<S, HarnessError>,
    T: FnMut(S),
    E: FnMut(&mut S, &Operation<K>, &mut FaultContext<'_>) -> Result<(), OperationError>,
{
    type System = S;
    type Kind = K;

    fn init(&mut self) -> Result<S, HarnessError> {
        (self.init)()
    }

    fn teardown(&mut self, system: S) {
        (self.teardown)(system)
    }

    fn execute(
        &mut self,
        system: &mut S,
        op: &Operation<K>,
        ctx: &mut FaultContext<'_>,
    ) -> Result<(), OperationError> {
        (self.execute)(system, op, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::{FailureConfig, FailureInjector};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use serde::Serialize;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
    enum Kind {
        Bump,
    }

    #[test]
    fn fn_harness_drives_closures() {
        let mut harness = FnHarness::new(
            || Ok(0u32),
            |_system| {},
            |system: &mut u32, _op: &Operation<Kind>, _ctx: &mut FaultContext<'_>| {
                *system += 1;
                Ok(())
            },
        );

        let mut injector = FailureInjector::new(FailureConfig::default());
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let mut system = harness.init().unwrap();
        let op = Operation::new(Kind::Bump);
        let mut ctx = FaultContext::new(&mut injector, &mut rng);
        harness.execute(&mut system, &op, &mut ctx).unwrap();
        harness.execute(&mut system, &op, &mut ctx).unwrap();
        assert_eq!(system, 2);
        harness.teardown(system);
    }

    #[test]
    fn init_error_carries_message() {
        let mut harness = FnHarness::new(
            || Err::<u32, _>(HarnessError::Construct("out of memory".into())),
            |_system| {},
            |_: &mut u32, _op: &Operation<Kind>, _ctx: &mut FaultContext<'_>| Ok(()),
        );

        let err = harness.init().unwrap_err();
        assert!(err.to_string().contains("out of memory"));
    }
}
