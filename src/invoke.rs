//! Method and function invocation.
//!
//! Calls are dispatched through a [`MethodRegistry`] keyed by receiver type
//! (none for static functions) and lower-cased method name. Receiver lookups
//! walk the type's ancestry, so an evaluator registered for `Collection`
//! serves both lists and sets.

pub mod aggregate;
pub mod collection;
pub mod identity;
pub mod map;
pub mod math;
pub mod registry;
pub mod string;

pub use aggregate::AggregateKind;
pub use registry::MethodRegistry;

use crate::access::{numeric, Value};
use crate::expression::{EvalError, Evaluator, Invocation, Operand, Step};
use once_cell::sync::Lazy;
use std::ops::RangeInclusive;
use std::sync::Arc;

/// Evaluates one method for a resolved receiver.
///
/// Implementations evaluate their own arguments through the evaluator, so
/// they decide what is evaluated and in which order.
pub trait MethodEvaluator: Send + Sync {
    fn evaluate(
        &self,
        invocation: &Invocation,
        receiver: &Value,
        evaluator: &mut Evaluator<'_>,
    ) -> Step<Operand>;

    /// Result for a null receiver; the evaluator is not invoked then
    fn null_receiver_default(&self) -> Value {
        Value::Null
    }
}

static BUILTINS: Lazy<Arc<MethodRegistry>> =
    Lazy::new(|| Arc::new(MethodRegistry::with_builtins()));

/// The process-wide registry of built-in methods
pub fn builtin_registry() -> Arc<MethodRegistry> {
    Arc::clone(&BUILTINS)
}

/// Check the argument count of an invocation
pub(crate) fn check_arity(
    invocation: &Invocation,
    allowed: RangeInclusive<usize>,
    expected: &'static str,
) -> Step<()> {
    let actual = invocation.args.len();
    if allowed.contains(&actual) {
        Ok(())
    } else {
        Err(EvalError::ArgumentCount {
            method: invocation.method.clone(),
            expected,
            actual,
        }
        .into())
    }
}

/// Evaluate every argument in order; None when any is unresolved
pub(crate) fn arguments(
    invocation: &Invocation,
    evaluator: &mut Evaluator<'_>,
) -> Step<Option<Vec<Value>>> {
    let mut values = Vec::with_capacity(invocation.args.len());
    for arg in &invocation.args {
        match evaluator.operand(arg)? {
            Operand::Value(value) => values.push(value),
            Operand::Unresolved => return Ok(None),
        }
    }
    Ok(Some(values))
}

/// An integral argument, e.g. a position
pub(crate) fn integer_argument(invocation: &Invocation, value: &Value) -> Step<i64> {
    if !value.is_integral() {
        return Err(EvalError::InvalidOperand {
            operator: "argument",
            expected: "integral number",
            found: format!("{} in {}", value.describe_type(), invocation.method),
        }
        .into());
    }
    numeric::to_i64(value).ok_or_else(|| {
        EvalError::InvalidOperand {
            operator: "argument",
            expected: "64-bit integer",
            found: value.to_string(),
        }
        .into()
    })
}
