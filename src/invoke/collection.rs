//! Collection and array methods.
//!
//! `contains` compares with the loose query equality, so `{1, 2}.contains(2L)`
//! holds. An unbound variable passed to `contains` is enumerated over the
//! receiver's elements.

use crate::access::{values_equal, Value};
use crate::expression::{EvalError, Evaluator, Invocation, Operand, Step, Warning};
use crate::invoke::{arguments, check_arity, integer_argument, MethodEvaluator, MethodRegistry};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionMethod {
    Contains,
    IsEmpty,
    Size,
    /// Array length
    Length,
    /// Positional access, lists only
    Get,
}

impl CollectionMethod {
    pub fn name(&self) -> &'static str {
        match self {
            CollectionMethod::Contains => "contains",
            CollectionMethod::IsEmpty => "isEmpty",
            CollectionMethod::Size => "size",
            CollectionMethod::Length => "length",
            CollectionMethod::Get => "get",
        }
    }
}

pub fn register(registry: &mut MethodRegistry) {
    use CollectionMethod::*;
    for method in [Contains, IsEmpty, Size] {
        registry.register(Some("Collection"), method.name(), Arc::new(method));
    }
    registry.register(Some("List"), Get.name(), Arc::new(Get));
    for method in [Contains, Length, Size] {
        registry.register(Some("Array"), method.name(), Arc::new(method));
    }
}

impl MethodEvaluator for CollectionMethod {
    fn evaluate(
        &self,
        invocation: &Invocation,
        receiver: &Value,
        evaluator: &mut Evaluator<'_>,
    ) -> Step<Operand> {
        let Some(elements) = receiver.elements() else {
            return Err(EvalError::InvalidOperand {
                operator: self.name(),
                expected: "Collection",
                found: receiver.describe_type().to_string(),
            }
            .into());
        };

        match self {
            CollectionMethod::Contains => {
                check_arity(invocation, 1..=1, "1")?;
                let needle =
                    evaluator.member_argument(&invocation.args[0], || elements.to_vec())?;
                match needle {
                    Operand::Value(needle) => Ok(Operand::from(
                        elements.iter().any(|e| values_equal(e, &needle)),
                    )),
                    Operand::Unresolved => Ok(Operand::from(false)),
                }
            }
            CollectionMethod::IsEmpty => {
                check_arity(invocation, 0..=0, "0")?;
                Ok(Operand::from(elements.is_empty()))
            }
            CollectionMethod::Size | CollectionMethod::Length => {
                check_arity(invocation, 0..=0, "0")?;
                Ok(Operand::Value(Value::Int(elements.len() as i32)))
            }
            CollectionMethod::Get => {
                check_arity(invocation, 1..=1, "1")?;
                let Some(args) = arguments(invocation, evaluator)? else {
                    return Ok(Operand::Unresolved);
                };
                let index = integer_argument(invocation, &args[0])?;
                match usize::try_from(index).ok().and_then(|i| elements.get(i)) {
                    Some(element) => Ok(Operand::Value(element.clone())),
                    None => {
                        evaluator.warn(Warning::IndexOutOfRange {
                            method: self.name().to_string(),
                            index,
                        });
                        Ok(Operand::Unresolved)
                    }
                }
            }
        }
    }

    fn null_receiver_default(&self) -> Value {
        match self {
            CollectionMethod::Contains | CollectionMethod::IsEmpty => Value::Boolean(false),
            _ => Value::Null,
        }
    }
}
