//! Simulated filesystem for faultline harnesses.
//!
//! [`SimFs`] is a deterministic in-memory file tree a host may use inside
//! its execute handler to exercise filesystem failure modes without real
//! I/O.  Every call that touches state first consults the engine's
//! [`FaultContext`] under the filesystem category, so fault probabilities,
//! conditional multipliers, and the declared system condition all apply.
//!
//! Failures are decisions, not instrumented I/O: an injected fault leaves
//! the tree untouched and surfaces as [`SimFsError::FaultInjected`].
//! A byte-capacity limit models disk-full separately from injection.

use faultline_engine::{FailureCategory, FaultContext};
use log::debug;
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors surfaced by the simulated filesystem.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SimFsError {
    #[error("injected fault during {op} of '{path}'")]
    FaultInjected { op: &'static str, path: String },

    #[error("no such file: '{0}'")]
    NotFound(String),

    #[error("file already exists: '{0}'")]
    AlreadyExists(String),

    #[error("disk full: '{path}' needs {needed} bytes, {available} available")]
    DiskFull {
        path: String,
        needed: usize,
        available: usize,
    },
}

/// A deterministic in-memory file tree with a byte-capacity limit.
#[derive(Debug, Clone)]
pub struct SimFs {
    files: BTreeMap<String, Vec<u8>>,
    capacity: usize,
    used: usize,
}

impl SimFs {
    /// Create a filesystem holding at most `capacity` content bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            files: BTreeMap::new(),
            capacity,
            used: 0,
        }
    }

    /// Create an empty file.
    pub fn create(&mut self, ctx: &mut FaultContext<'_>, path: &str) -> Result<(), SimFsError> {
        if ctx.should_inject(FailureCategory::Filesystem) {
            debug!("simfs: injected fault on create '{path}'");
            return Err(SimFsError::FaultInjected {
                op: "create",
                path: path.to_string(),
            });
        }
        if self.files.contains_key(path) {
            return Err(SimFsError::AlreadyExists(path.to_string()));
        }
        self.files.insert(path.to_string(), Vec::new());
        Ok(())
    }

    /// Replace a file's contents.  The file must exist.
    pub fn write(
        &mut self,
        ctx: &mut FaultContext<'_>,
        path: &str,
        data: &[u8],
    ) -> Result<(), SimFsError> {
        if ctx.should_inject(FailureCategory::Filesystem) {
            debug!("simfs: injected fault on write '{path}'");
            return Err(SimFsError::FaultInjected {
                op: "write",
                path: path.to_string(),
            });
        }
        let Some(existing) = self.files.get_mut(path) else {
            return Err(SimFsError::NotFound(path.to_string()));
        };

        let freed = existing.len();
        let available = self.capacity - (self.used - freed);
        if data.len() > available {
            return Err(SimFsError::DiskFull {
                path: path.to_string(),
                needed: data.len(),
                available,
            });
        }
        self.used = self.used - freed + data.len();
        *existing = data.to_vec();
        Ok(())
    }

    /// Read a file's contents.
    pub fn read(&mut self, ctx: &mut FaultContext<'_>, path: &str) -> Result<Vec<u8>, SimFsError> {
        if ctx.should_inject(FailureCategory::Filesystem) {
            debug!("simfs: injected fault on read '{path}'");
            return Err(SimFsError::FaultInjected {
                op: "read",
                path: path.to_string(),
            });
        }
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| SimFsError::NotFound(path.to_string()))
    }

    /// Delete a file, releasing its bytes.
    pub fn delete(&mut self, ctx: &mut FaultContext<'_>, path: &str) -> Result<(), SimFsError> {
        if ctx.should_inject(FailureCategory::Filesystem) {
            debug!("simfs: injected fault on delete '{path}'");
            return Err(SimFsError::FaultInjected {
                op: "delete",
                path: path.to_string(),
            });
        }
        match self.files.remove(path) {
            Some(contents) => {
                self.used -= contents.len();
                Ok(())
            }
            None => Err(SimFsError::NotFound(path.to_string())),
        }
    }

    /// Whether a file exists.  Pure read, never fault-injected.
    pub fn exists(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// A file's size in bytes.
    pub fn len(&self, path: &str) -> Option<usize> {
        self.files.get(path).map(Vec::len)
    }

    /// Number of files.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Content bytes currently stored.
    pub fn used_bytes(&self) -> usize {
        self.used
    }

    /// Content bytes still available.
    pub fn available_bytes(&self) -> usize {
        self.capacity - self.used
    }
}
