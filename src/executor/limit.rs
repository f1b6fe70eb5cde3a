//! Limit executor implementation.
//!
//! This executor applies a query range: it skips the first `offset` values
//! from its child and returns at most `limit` of the rest.

use crate::access::Value;
use crate::executor::Executor;
use anyhow::{bail, Result};

/// Executor that limits the number of values returned
pub struct LimitExecutor {
    /// Child executor that produces values
    child: Box<dyn Executor>,
    /// Maximum number of values to return
    limit: usize,
    /// Number of values to skip before returning
    offset: usize,
    /// Number of values skipped so far
    skipped: usize,
    /// Number of values returned so far
    returned: usize,
    /// Whether the executor has been initialized
    initialized: bool,
}

impl LimitExecutor {
    /// Create a new limit executor with only limit
    pub fn new(child: Box<dyn Executor>, limit: usize) -> Self {
        Self::with_offset(child, limit, 0)
    }

    /// Create a new limit executor with limit and offset
    ///
    /// # Arguments
    /// * `child` - The child executor that produces values
    /// * `limit` - The maximum number of values to return
    /// * `offset` - The number of values to skip before returning
    pub fn with_offset(child: Box<dyn Executor>, limit: usize, offset: usize) -> Self {
        Self {
            child,
            limit,
            offset,
            skipped: 0,
            returned: 0,
            initialized: false,
        }
    }

    /// Range `[from, to)`; an open end returns everything after `from`
    pub fn range(child: Box<dyn Executor>, from: usize, to: Option<usize>) -> Self {
        let limit = to.map_or(usize::MAX, |to| to.saturating_sub(from));
        Self::with_offset(child, limit, from)
    }
}

impl Executor for LimitExecutor {
    fn init(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }

        // Initialize child executor
        self.child.init()?;

        // Reset counters
        self.skipped = 0;
        self.returned = 0;

        self.initialized = true;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Value>> {
        if !self.initialized {
            bail!("Executor not initialized. Call init() first.");
        }

        if self.returned >= self.limit {
            return Ok(None);
        }

        while self.skipped < self.offset {
            if self.child.next()?.is_none() {
                return Ok(None);
            }
            self.skipped += 1;
        }

        match self.child.next()? {
            Some(value) => {
                self.returned += 1;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }
}
