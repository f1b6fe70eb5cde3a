//! Executor layer for in-memory query execution.
//!
//! This module implements the Volcano-style iterator model over candidate
//! objects. Each executor produces values one at a time via `next()`: the
//! candidate scan feeds the filter, ordering and range, and the result
//! stage turns candidates into result rows.

use crate::access::{DetachedAccess, FieldAccess, Value};
use crate::catalog::TypeCatalog;
use crate::expression::{
    Diagnostics, EvaluationContext, Evaluator, Expression, LogDiagnostics, Resolution, Warning,
    DEFAULT_ALIAS,
};
use crate::invoke::{builtin_registry, MethodRegistry};
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;

pub mod aggregate;
pub mod candidate_scan;
pub mod filter;
pub mod limit;
pub mod projection;
pub mod sort;

// Re-export executors
pub use aggregate::AggregateExecutor;
pub use candidate_scan::CandidateScanExecutor;
pub use filter::FilterExecutor;
pub use limit::LimitExecutor;
pub use projection::ProjectionExecutor;
pub use sort::{NullOrder, SortCriteria, SortExecutor, SortOrder};

/// Trait for all query executors
pub trait Executor: Send {
    /// Initialize the executor. This must be called before `next()`.
    fn init(&mut self) -> Result<()>;

    /// Get the next value from the executor.
    /// Returns None when there are no more values.
    fn next(&mut self) -> Result<Option<Value>>;
}

/// Execution context containing shared resources
#[derive(Clone)]
pub struct ExecutionContext {
    pub alias: String,
    pub parameters: HashMap<String, Value>,
    /// Declared variable names
    pub variables: Vec<String>,
    pub catalog: Arc<TypeCatalog>,
    pub registry: Arc<MethodRegistry>,
    pub field_access: Arc<dyn FieldAccess>,
    pub diagnostics: Arc<dyn Diagnostics>,
}

impl ExecutionContext {
    pub fn new(catalog: Arc<TypeCatalog>) -> Self {
        Self {
            alias: DEFAULT_ALIAS.to_string(),
            parameters: HashMap::new(),
            variables: Vec::new(),
            catalog,
            registry: builtin_registry(),
            field_access: Arc::new(DetachedAccess),
            diagnostics: Arc::new(LogDiagnostics),
        }
    }

    /// A fresh evaluation context over these resources
    pub fn evaluation_context(&self) -> EvaluationContext {
        EvaluationContext::new(Arc::clone(&self.catalog))
            .with_alias(self.alias.clone())
            .with_parameters(self.parameters.clone())
            .with_registry(Arc::clone(&self.registry))
            .with_field_access(Arc::clone(&self.field_access))
            .with_diagnostics(Arc::clone(&self.diagnostics))
    }
}

/// Evaluate an expression to a plain value: unresolved results and
/// unbound variables read as null
pub(crate) fn evaluate_value(ctx: &mut EvaluationContext, expr: &Expression) -> Result<Value> {
    let resolution = Evaluator::new(ctx).evaluate(expr)?;
    match resolution {
        Resolution::Resolved(operand) => Ok(operand.into_value().unwrap_or(Value::Null)),
        Resolution::Unbound(unbound) => {
            ctx.warn(Warning::UnboundVariable {
                name: unbound.name,
            });
            Ok(Value::Null)
        }
    }
}
