//! String methods.

use crate::access::Value;
use crate::expression::pattern::full_match;
use crate::expression::{EvalError, Evaluator, Invocation, Operand, Step, Warning};
use crate::invoke::{arguments, check_arity, integer_argument, MethodEvaluator, MethodRegistry};
use std::sync::Arc;

const DEFAULT_TRIM_CHAR: char = ' ';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringMethod {
    Trim,
    TrimLeft,
    TrimRight,
    ToUpperCase,
    ToLowerCase,
    Length,
    Substring,
    IndexOf,
    StartsWith,
    EndsWith,
    Equals,
    EqualsIgnoreCase,
    Matches,
    CharAt,
    Concat,
}

impl StringMethod {
    pub const ALL: [StringMethod; 15] = [
        StringMethod::Trim,
        StringMethod::TrimLeft,
        StringMethod::TrimRight,
        StringMethod::ToUpperCase,
        StringMethod::ToLowerCase,
        StringMethod::Length,
        StringMethod::Substring,
        StringMethod::IndexOf,
        StringMethod::StartsWith,
        StringMethod::EndsWith,
        StringMethod::Equals,
        StringMethod::EqualsIgnoreCase,
        StringMethod::Matches,
        StringMethod::CharAt,
        StringMethod::Concat,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StringMethod::Trim => "trim",
            StringMethod::TrimLeft => "trimLeft",
            StringMethod::TrimRight => "trimRight",
            StringMethod::ToUpperCase => "toUpperCase",
            StringMethod::ToLowerCase => "toLowerCase",
            StringMethod::Length => "length",
            StringMethod::Substring => "substring",
            StringMethod::IndexOf => "indexOf",
            StringMethod::StartsWith => "startsWith",
            StringMethod::EndsWith => "endsWith",
            StringMethod::Equals => "equals",
            StringMethod::EqualsIgnoreCase => "equalsIgnoreCase",
            StringMethod::Matches => "matches",
            StringMethod::CharAt => "charAt",
            StringMethod::Concat => "concat",
        }
    }

    fn is_predicate(&self) -> bool {
        matches!(
            self,
            StringMethod::StartsWith
                | StringMethod::EndsWith
                | StringMethod::Equals
                | StringMethod::EqualsIgnoreCase
                | StringMethod::Matches
        )
    }
}

pub fn register(registry: &mut MethodRegistry) {
    for method in StringMethod::ALL {
        registry.register(Some("String"), method.name(), Arc::new(method));
    }
}

/// Text of a String or Char argument
fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Char(c) => Some(c.to_string()),
        _ => None,
    }
}

fn text_argument(method: StringMethod, value: &Value) -> Step<String> {
    text(value).ok_or_else(|| {
        EvalError::InvalidOperand {
            operator: method.name(),
            expected: "String",
            found: value.describe_type().to_string(),
        }
        .into()
    })
}

fn trim_char(method: StringMethod, args: &[Value]) -> Step<char> {
    let Some(arg) = args.first() else {
        return Ok(DEFAULT_TRIM_CHAR);
    };
    let text = text_argument(method, arg)?;
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(EvalError::InvalidOperand {
            operator: method.name(),
            expected: "single character",
            found: format!("\"{}\"", text),
        }
        .into()),
    }
}

/// Byte offset of char index `index`, allowing one past the end
fn byte_offset(s: &str, index: i64) -> Option<usize> {
    let index = usize::try_from(index).ok()?;
    if index == s.chars().count() {
        return Some(s.len());
    }
    s.char_indices().nth(index).map(|(offset, _)| offset)
}

impl StringMethod {
    fn apply(
        &self,
        invocation: &Invocation,
        s: &str,
        args: &[Value],
        evaluator: &Evaluator<'_>,
    ) -> Step<Operand> {
        let value = match self {
            StringMethod::Trim => {
                let c = trim_char(*self, args)?;
                Value::string(s.trim_matches(c))
            }
            StringMethod::TrimLeft => {
                let c = trim_char(*self, args)?;
                Value::string(s.trim_start_matches(c))
            }
            StringMethod::TrimRight => {
                let c = trim_char(*self, args)?;
                Value::string(s.trim_end_matches(c))
            }
            StringMethod::ToUpperCase => Value::string(s.to_uppercase()),
            StringMethod::ToLowerCase => Value::string(s.to_lowercase()),
            StringMethod::Length => Value::Int(s.chars().count() as i32),
            StringMethod::Substring => {
                let begin = integer_argument(invocation, &args[0])?;
                let end = match args.get(1) {
                    Some(end) => integer_argument(invocation, end)?,
                    None => s.chars().count() as i64,
                };
                match (byte_offset(s, begin), byte_offset(s, end)) {
                    (Some(from), Some(to)) if from <= to => Value::string(&s[from..to]),
                    _ => {
                        evaluator.warn(Warning::IndexOutOfRange {
                            method: self.name().to_string(),
                            index: if byte_offset(s, begin).is_none() { begin } else { end },
                        });
                        return Ok(Operand::Unresolved);
                    }
                }
            }
            StringMethod::IndexOf => {
                let needle = text_argument(*self, &args[0])?;
                let from = match args.get(1) {
                    Some(from) => integer_argument(invocation, from)?.max(0),
                    None => 0,
                };
                let position = byte_offset(s, from).and_then(|start| {
                    s[start..]
                        .find(&needle)
                        .map(|found| s[..start + found].chars().count() as i32)
                });
                Value::Int(position.unwrap_or(-1))
            }
            StringMethod::StartsWith | StringMethod::EndsWith | StringMethod::Equals => {
                let Some(other) = text(&args[0]) else {
                    return Ok(Operand::from(false));
                };
                Value::Boolean(match self {
                    StringMethod::StartsWith => s.starts_with(&other),
                    StringMethod::EndsWith => s.ends_with(&other),
                    _ => s == other,
                })
            }
            StringMethod::EqualsIgnoreCase => match text(&args[0]) {
                Some(other) => Value::Boolean(s.to_lowercase() == other.to_lowercase()),
                None => Value::Boolean(false),
            },
            StringMethod::Matches => match &args[0] {
                Value::Null => Value::Boolean(false),
                pattern => Value::Boolean(full_match(&text_argument(*self, pattern)?, s)?),
            },
            StringMethod::CharAt => {
                let index = integer_argument(invocation, &args[0])?;
                match usize::try_from(index).ok().and_then(|i| s.chars().nth(i)) {
                    Some(c) => Value::Char(c),
                    None => {
                        evaluator.warn(Warning::IndexOutOfRange {
                            method: self.name().to_string(),
                            index,
                        });
                        return Ok(Operand::Unresolved);
                    }
                }
            }
            StringMethod::Concat => {
                let suffix = text_argument(*self, &args[0])?;
                Value::String(format!("{}{}", s, suffix))
            }
        };
        Ok(Operand::Value(value))
    }

    fn check_arity(&self, invocation: &Invocation) -> Step<()> {
        match self {
            StringMethod::Trim | StringMethod::TrimLeft | StringMethod::TrimRight => {
                check_arity(invocation, 0..=1, "0 or 1")
            }
            StringMethod::ToUpperCase | StringMethod::ToLowerCase | StringMethod::Length => {
                check_arity(invocation, 0..=0, "0")
            }
            StringMethod::Substring | StringMethod::IndexOf => {
                check_arity(invocation, 1..=2, "1 or 2")
            }
            _ => check_arity(invocation, 1..=1, "1"),
        }
    }
}

impl MethodEvaluator for StringMethod {
    fn evaluate(
        &self,
        invocation: &Invocation,
        receiver: &Value,
        evaluator: &mut Evaluator<'_>,
    ) -> Step<Operand> {
        self.check_arity(invocation)?;
        let Some(s) = receiver.as_str() else {
            return Err(EvalError::InvalidOperand {
                operator: self.name(),
                expected: "String",
                found: receiver.describe_type().to_string(),
            }
            .into());
        };
        let Some(args) = arguments(invocation, evaluator)? else {
            return Ok(Operand::Unresolved);
        };
        self.apply(invocation, s, &args, evaluator)
    }

    fn null_receiver_default(&self) -> Value {
        if self.is_predicate() {
            Value::Boolean(false)
        } else {
            Value::Null
        }
    }
}
