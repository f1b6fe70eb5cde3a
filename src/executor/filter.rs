//! Filter executor implementation.
//!
//! This executor keeps the candidates from a child executor for which the
//! filter evaluates to TRUE. Unresolved and null results reject the
//! candidate.
//!
//! Variables are existential: when the filter stops on a variable without
//! a binding and the point of failure knows the values it could take (the
//! elements of `coll.contains(v)`), each value is bound in turn and the
//! filter re-evaluated. The candidate is kept if any assignment holds.

use crate::access::Value;
use crate::executor::{ExecutionContext, Executor};
use crate::expression::{EvaluationContext, Evaluator, Expression, Resolution, Warning};
use anyhow::{bail, Result};

/// Executor that filters candidates with an expression
pub struct FilterExecutor {
    /// Child executor that produces candidates
    child: Box<dyn Executor>,
    /// Filter expression that evaluates to boolean
    filter_expr: Expression,
    context: ExecutionContext,
    eval_ctx: Option<EvaluationContext>,
}

impl FilterExecutor {
    /// Create a new filter executor
    ///
    /// # Arguments
    /// * `child` - The child executor that produces candidates
    /// * `filter_expr` - The filter expression that evaluates to boolean
    /// * `context` - Shared execution resources
    pub fn new(child: Box<dyn Executor>, filter_expr: Expression, context: ExecutionContext) -> Self {
        Self {
            child,
            filter_expr,
            context,
            eval_ctx: None,
        }
    }
}

/// Evaluate the filter for the bound candidate, enumerating unbound
/// variables. `depth` counts the variables bound so far.
fn satisfies(
    ctx: &mut EvaluationContext,
    filter: &Expression,
    declared: &[String],
    depth: usize,
) -> Result<bool> {
    let resolution = Evaluator::new(ctx).evaluate(filter)?;
    let unbound = match resolution {
        Resolution::Resolved(operand) => return Ok(operand.is_true()),
        Resolution::Unbound(unbound) => unbound,
    };

    let exhausted = !declared.is_empty() && depth >= declared.len();
    let Some(values) = unbound.candidates.filter(|_| !exhausted) else {
        ctx.warn(Warning::UnboundVariable {
            name: unbound.name,
        });
        return Ok(false);
    };

    log::debug!(
        "enumerating variable {} over {} values",
        unbound.name,
        values.len()
    );
    for value in values {
        ctx.set_variable(unbound.name.clone(), value);
        if satisfies(ctx, filter, declared, depth + 1)? {
            ctx.clear_variable(&unbound.name);
            return Ok(true);
        }
    }
    ctx.clear_variable(&unbound.name);
    Ok(false)
}

impl Executor for FilterExecutor {
    fn init(&mut self) -> Result<()> {
        if self.eval_ctx.is_some() {
            return Ok(());
        }

        // Initialize child executor
        self.child.init()?;

        self.eval_ctx = Some(self.context.evaluation_context());
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Value>> {
        let Some(ctx) = self.eval_ctx.as_mut() else {
            bail!("Executor not initialized. Call init() first.");
        };

        // Keep pulling candidates until one satisfies the filter
        while let Some(candidate) = self.child.next()? {
            ctx.set_candidate(candidate.clone());
            let keep = satisfies(ctx, &self.filter_expr, &self.context.variables, 0);
            ctx.clear_variables();
            ctx.clear_candidate();
            if keep? {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }
}
