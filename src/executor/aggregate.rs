//! Aggregation executor for aggregate result expressions.
//!
//! Aggregates (`count`, `sum`, `avg`, `min`, `max`) range over the whole
//! result set rather than a single candidate. This executor materializes
//! every candidate from its child, installs them as the result set of a
//! fresh evaluation context and evaluates the result expressions once.
//!
//! Exactly one row is produced, even when the child is empty: `count`
//! yields 0 and the other aggregates yield null over no members.

use crate::access::Value;
use crate::executor::{evaluate_value, ExecutionContext, Executor};
use crate::expression::Expression;
use anyhow::{bail, Result};
use std::sync::Arc;

/// Executor that evaluates aggregate result expressions over all candidates
pub struct AggregateExecutor {
    /// Child executor that produces candidates
    child: Box<dyn Executor>,
    /// Result expressions, in output order
    exprs: Vec<Expression>,
    context: ExecutionContext,
    /// The single computed row, taken by the first `next()`
    row: Option<Value>,
    /// Whether the executor has been initialized
    initialized: bool,
}

impl AggregateExecutor {
    /// Create a new aggregate executor
    ///
    /// # Arguments
    /// * `child` - The child executor that produces candidates
    /// * `exprs` - Result expressions, at least one containing an aggregate
    /// * `context` - Shared execution resources
    pub fn new(child: Box<dyn Executor>, exprs: Vec<Expression>, context: ExecutionContext) -> Self {
        Self {
            child,
            exprs,
            context,
            row: None,
            initialized: false,
        }
    }

    fn compute(&mut self) -> Result<Value> {
        let mut members = Vec::new();
        while let Some(candidate) = self.child.next()? {
            members.push(candidate);
        }
        log::debug!("aggregating over {} candidates", members.len());

        let mut ctx = self.context.evaluation_context();
        ctx.set_result_set(Arc::from(members));

        let mut row = self
            .exprs
            .iter()
            .map(|expr| evaluate_value(&mut ctx, expr))
            .collect::<Result<Vec<_>>>()?;

        if row.len() == 1 {
            return Ok(row.pop().unwrap_or(Value::Null));
        }
        Ok(Value::Array(row))
    }
}

impl Executor for AggregateExecutor {
    fn init(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }

        if self.exprs.is_empty() {
            bail!("Aggregation requires at least one result expression");
        }

        self.child.init()?;
        self.row = Some(self.compute()?);
        self.initialized = true;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Value>> {
        if !self.initialized {
            bail!("Executor not initialized. Call init() first.");
        }
        Ok(self.row.take())
    }
}
