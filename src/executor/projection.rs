//! Projection executor implementation.
//!
//! This executor turns each candidate into a result row by evaluating the
//! result expressions against it. A single expression yields its value
//! directly; several expressions yield an array holding one value per
//! expression, in order.

use crate::access::Value;
use crate::executor::{evaluate_value, ExecutionContext, Executor};
use crate::expression::{EvaluationContext, Expression};
use anyhow::{bail, Result};

/// Executor that evaluates result expressions per candidate
pub struct ProjectionExecutor {
    /// Child executor that produces candidates
    child: Box<dyn Executor>,
    /// Result expressions, in output order
    exprs: Vec<Expression>,
    context: ExecutionContext,
    eval_ctx: Option<EvaluationContext>,
}

impl ProjectionExecutor {
    /// Create a new projection executor
    ///
    /// # Arguments
    /// * `child` - The child executor that produces candidates
    /// * `exprs` - Result expressions evaluated against each candidate
    /// * `context` - Shared execution resources
    ///
    /// # Example
    /// ```ignore
    /// // result "name, age" over Person candidates
    /// // produces rows like ["Smith", 30]
    /// ```
    pub fn new(child: Box<dyn Executor>, exprs: Vec<Expression>, context: ExecutionContext) -> Self {
        Self {
            child,
            exprs,
            context,
            eval_ctx: None,
        }
    }
}

impl Executor for ProjectionExecutor {
    fn init(&mut self) -> Result<()> {
        if self.eval_ctx.is_some() {
            return Ok(());
        }

        if self.exprs.is_empty() {
            bail!("Projection requires at least one result expression");
        }

        self.child.init()?;
        self.eval_ctx = Some(self.context.evaluation_context());
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Value>> {
        let Some(ctx) = self.eval_ctx.as_mut() else {
            bail!("Executor not initialized. Call init() first.");
        };

        let Some(candidate) = self.child.next()? else {
            return Ok(None);
        };

        ctx.set_candidate(candidate);
        let row = self
            .exprs
            .iter()
            .map(|expr| evaluate_value(ctx, expr))
            .collect::<Result<Vec<_>>>();
        ctx.clear_candidate();

        let mut row = row?;
        if row.len() == 1 {
            return Ok(row.pop());
        }
        Ok(Some(Value::Array(row)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::Object;
    use crate::catalog::TypeCatalog;
    use crate::executor::CandidateScanExecutor;
    use std::sync::Arc;

    fn people() -> Box<dyn Executor> {
        Box::new(CandidateScanExecutor::new(vec![
            Object::new("org.acme.Person")
                .with_field("name", "Smith")
                .with_field("age", 30)
                .into(),
            Object::new("org.acme.Person")
                .with_field("name", "Jones")
                .with_field("age", Value::Null)
                .into(),
        ]))
    }

    fn context() -> ExecutionContext {
        ExecutionContext::new(Arc::new(TypeCatalog::new()))
    }

    #[test]
    fn test_single_expression() -> Result<()> {
        let greeting = Expression::add_expr(Expression::literal("Mr. "), Expression::path("name"));
        let mut projection = ProjectionExecutor::new(people(), vec![greeting], context());
        projection.init()?;

        assert_eq!(projection.next()?, Some(Value::string("Mr. Smith")));
        assert_eq!(projection.next()?, Some(Value::string("Mr. Jones")));
        assert_eq!(projection.next()?, None);
        Ok(())
    }

    #[test]
    fn test_multiple_expressions() -> Result<()> {
        let exprs = vec![Expression::path("name"), Expression::path("this.age")];
        let mut projection = ProjectionExecutor::new(people(), exprs, context());
        projection.init()?;

        assert_eq!(
            projection.next()?,
            Some(Value::Array(vec![Value::string("Smith"), Value::Int(30)]))
        );
        assert_eq!(
            projection.next()?,
            Some(Value::Array(vec![Value::string("Jones"), Value::Null]))
        );
        Ok(())
    }

    #[test]
    fn test_empty_projection_rejected() {
        let mut projection = ProjectionExecutor::new(people(), Vec::new(), context());
        assert!(projection.init().is_err());
    }
}
