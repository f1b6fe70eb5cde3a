//! Math functions and Number conversions.

use crate::access::{numeric, Value};
use crate::expression::{EvalError, Evaluator, Invocation, Operand, Step};
use crate::invoke::{arguments, check_arity, MethodEvaluator, MethodRegistry};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathFunction {
    Abs,
    Sqrt,
}

pub fn register(registry: &mut MethodRegistry) {
    for name in ["Math.abs", "ABS"] {
        registry.register(None, name, Arc::new(MathFunction::Abs));
    }
    for name in ["Math.sqrt", "SQRT"] {
        registry.register(None, name, Arc::new(MathFunction::Sqrt));
    }
    for method in [
        NumberMethod::DoubleValue,
        NumberMethod::LongValue,
        NumberMethod::IntValue,
    ] {
        registry.register(Some("Number"), method.name(), Arc::new(method));
    }
}

fn not_numeric(operator: &'static str, value: &Value) -> EvalError {
    EvalError::InvalidOperand {
        operator,
        expected: "Number",
        found: value.describe_type().to_string(),
    }
}

impl MethodEvaluator for MathFunction {
    fn evaluate(
        &self,
        invocation: &Invocation,
        _receiver: &Value,
        evaluator: &mut Evaluator<'_>,
    ) -> Step<Operand> {
        check_arity(invocation, 1..=1, "1")?;
        let Some(args) = arguments(invocation, evaluator)? else {
            return Ok(Operand::Unresolved);
        };
        let value = &args[0];
        if value.is_null() {
            return Ok(Operand::Value(Value::Null));
        }
        let result = match self {
            MathFunction::Abs => numeric::abs(value).ok_or_else(|| not_numeric("abs", value))?,
            MathFunction::Sqrt => {
                let n = numeric::to_f64(value).ok_or_else(|| not_numeric("sqrt", value))?;
                Value::Double(n.sqrt())
            }
        };
        Ok(Operand::Value(result))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberMethod {
    DoubleValue,
    LongValue,
    IntValue,
}

impl NumberMethod {
    pub fn name(&self) -> &'static str {
        match self {
            NumberMethod::DoubleValue => "doubleValue",
            NumberMethod::LongValue => "longValue",
            NumberMethod::IntValue => "intValue",
        }
    }
}

impl MethodEvaluator for NumberMethod {
    fn evaluate(
        &self,
        invocation: &Invocation,
        receiver: &Value,
        _evaluator: &mut Evaluator<'_>,
    ) -> Step<Operand> {
        check_arity(invocation, 0..=0, "0")?;
        let n = numeric::to_f64(receiver).ok_or_else(|| not_numeric(self.name(), receiver))?;
        let integral = numeric::to_i64(receiver).unwrap_or(n as i64);
        let value = match self {
            NumberMethod::DoubleValue => Value::Double(n),
            NumberMethod::LongValue => Value::Long(integral),
            NumberMethod::IntValue => Value::Int(integral as i32),
        };
        Ok(Operand::Value(value))
    }
}
