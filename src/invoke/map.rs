//! Map methods.

use crate::access::{values_equal, Value};
use crate::expression::{EvalError, Evaluator, Invocation, Operand, Step};
use crate::invoke::{check_arity, MethodEvaluator, MethodRegistry};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapMethod {
    ContainsKey,
    ContainsValue,
    ContainsEntry,
    Get,
    IsEmpty,
    Size,
}

impl MapMethod {
    pub const ALL: [MapMethod; 6] = [
        MapMethod::ContainsKey,
        MapMethod::ContainsValue,
        MapMethod::ContainsEntry,
        MapMethod::Get,
        MapMethod::IsEmpty,
        MapMethod::Size,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            MapMethod::ContainsKey => "containsKey",
            MapMethod::ContainsValue => "containsValue",
            MapMethod::ContainsEntry => "containsEntry",
            MapMethod::Get => "get",
            MapMethod::IsEmpty => "isEmpty",
            MapMethod::Size => "size",
        }
    }
}

pub fn register(registry: &mut MethodRegistry) {
    for method in MapMethod::ALL {
        registry.register(Some("Map"), method.name(), Arc::new(method));
    }
}

fn keys(entries: &[(Value, Value)]) -> Vec<Value> {
    entries.iter().map(|(k, _)| k.clone()).collect()
}

fn values(entries: &[(Value, Value)]) -> Vec<Value> {
    entries.iter().map(|(_, v)| v.clone()).collect()
}

fn entry<'e>(entries: &'e [(Value, Value)], key: &Value) -> Option<&'e Value> {
    entries
        .iter()
        .find(|(k, _)| values_equal(k, key))
        .map(|(_, v)| v)
}

impl MethodEvaluator for MapMethod {
    fn evaluate(
        &self,
        invocation: &Invocation,
        receiver: &Value,
        evaluator: &mut Evaluator<'_>,
    ) -> Step<Operand> {
        let Value::Map(entries) = receiver else {
            return Err(EvalError::InvalidOperand {
                operator: self.name(),
                expected: "Map",
                found: receiver.describe_type().to_string(),
            }
            .into());
        };

        match self {
            MapMethod::ContainsKey | MapMethod::Get => {
                check_arity(invocation, 1..=1, "1")?;
                let key = match evaluator.member_argument(&invocation.args[0], || keys(entries))? {
                    Operand::Value(key) => key,
                    Operand::Unresolved if *self == MapMethod::Get => {
                        return Ok(Operand::Unresolved)
                    }
                    Operand::Unresolved => return Ok(Operand::from(false)),
                };
                let found = entry(entries, &key);
                if *self == MapMethod::Get {
                    Ok(Operand::Value(found.cloned().unwrap_or(Value::Null)))
                } else {
                    Ok(Operand::from(found.is_some()))
                }
            }
            MapMethod::ContainsValue => {
                check_arity(invocation, 1..=1, "1")?;
                match evaluator.member_argument(&invocation.args[0], || values(entries))? {
                    Operand::Value(value) => Ok(Operand::from(
                        entries.iter().any(|(_, v)| values_equal(v, &value)),
                    )),
                    Operand::Unresolved => Ok(Operand::from(false)),
                }
            }
            MapMethod::ContainsEntry => {
                check_arity(invocation, 2..=2, "2")?;
                let key = match evaluator.member_argument(&invocation.args[0], || keys(entries))? {
                    Operand::Value(key) => key,
                    Operand::Unresolved => return Ok(Operand::from(false)),
                };
                // An absent key decides the result; the value is never evaluated
                let Some(stored) = entry(entries, &key) else {
                    return Ok(Operand::from(false));
                };
                let stored = stored.clone();
                match evaluator.member_argument(&invocation.args[1], || vec![stored.clone()])? {
                    Operand::Value(value) => Ok(Operand::from(values_equal(&stored, &value))),
                    Operand::Unresolved => Ok(Operand::from(false)),
                }
            }
            MapMethod::IsEmpty => {
                check_arity(invocation, 0..=0, "0")?;
                Ok(Operand::from(entries.is_empty()))
            }
            MapMethod::Size => {
                check_arity(invocation, 0..=0, "0")?;
                Ok(Operand::Value(Value::Int(entries.len() as i32)))
            }
        }
    }

    fn null_receiver_default(&self) -> Value {
        match self {
            MapMethod::Get | MapMethod::Size => Value::Null,
            _ => Value::Boolean(false),
        }
    }
}
