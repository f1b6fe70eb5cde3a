//! Object identity: `JDOHelper.getObjectId(o)`, `ID(o)` and `o.getObjectId()`.

use crate::access::Value;
use crate::expression::{Evaluator, Invocation, Operand, Step};
use crate::invoke::{arguments, check_arity, MethodEvaluator, MethodRegistry};
use std::sync::Arc;

/// Stable identity of a managed object; null for anything else
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectId {
    /// Static form, the object is the only argument
    Function,
    /// Receiver form
    Method,
}

pub fn register(registry: &mut MethodRegistry) {
    for name in ["JDOHelper.getObjectId", "ID"] {
        registry.register(None, name, Arc::new(ObjectId::Function));
    }
    registry.register(Some("Object"), "getObjectId", Arc::new(ObjectId::Method));
}

fn identity_of(value: &Value) -> Value {
    match value {
        Value::Object(object) => object.identity().cloned().unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

impl MethodEvaluator for ObjectId {
    fn evaluate(
        &self,
        invocation: &Invocation,
        receiver: &Value,
        evaluator: &mut Evaluator<'_>,
    ) -> Step<Operand> {
        match self {
            ObjectId::Function => {
                check_arity(invocation, 1..=1, "1")?;
                match arguments(invocation, evaluator)? {
                    Some(args) => Ok(Operand::Value(identity_of(&args[0]))),
                    None => Ok(Operand::Unresolved),
                }
            }
            ObjectId::Method => {
                check_arity(invocation, 0..=0, "0")?;
                Ok(Operand::Value(identity_of(receiver)))
            }
        }
    }
}
