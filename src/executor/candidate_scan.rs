//! Candidate scan executor.
//!
//! Produces the query candidates in the order they were supplied.

use crate::access::Value;
use crate::executor::Executor;
use anyhow::{bail, Result};
use std::sync::Arc;

/// Executor that scans a fixed set of candidate values
pub struct CandidateScanExecutor {
    candidates: Arc<[Value]>,
    /// Current position in candidates
    position: usize,
    /// Whether the executor has been initialized
    initialized: bool,
}

impl CandidateScanExecutor {
    pub fn new(candidates: impl Into<Arc<[Value]>>) -> Self {
        Self {
            candidates: candidates.into(),
            position: 0,
            initialized: false,
        }
    }
}

impl Executor for CandidateScanExecutor {
    fn init(&mut self) -> Result<()> {
        self.position = 0;
        self.initialized = true;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Value>> {
        if !self.initialized {
            bail!("Executor not initialized. Call init() first.");
        }

        let candidate = self.candidates.get(self.position).cloned();
        if candidate.is_some() {
            self.position += 1;
        }
        Ok(candidate)
    }
}
