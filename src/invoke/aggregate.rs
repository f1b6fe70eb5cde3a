//! Aggregates over the result set: count, sum, avg, min and max.
//!
//! The argument is evaluated once per member of the result set, with that
//! member bound as the candidate. `DISTINCT` on the argument drops repeated
//! values using strict value equality, so `1` and `1L` both count.

use crate::access::{compare_values, numeric, Value};
use crate::expression::{
    EvalError, Evaluator, Expression, Operand, Step, UnaryOperator, Warning,
};
use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use std::cmp::Ordering;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateKind {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateKind {
    /// Case-insensitive lookup of an aggregate function name
    pub fn from_name(name: &str) -> Option<Self> {
        [
            AggregateKind::Count,
            AggregateKind::Sum,
            AggregateKind::Avg,
            AggregateKind::Min,
            AggregateKind::Max,
        ]
        .into_iter()
        .find(|kind| kind.name().eq_ignore_ascii_case(name))
    }

    pub fn name(&self) -> &'static str {
        match self {
            AggregateKind::Count => "count",
            AggregateKind::Sum => "sum",
            AggregateKind::Avg => "avg",
            AggregateKind::Min => "min",
            AggregateKind::Max => "max",
        }
    }
}

/// Evaluate an aggregate call. Leaves the operand stack exactly as it was;
/// the caller pushes the single result.
pub fn evaluate(
    kind: AggregateKind,
    argument: &Expression,
    evaluator: &mut Evaluator<'_>,
) -> Step<Operand> {
    let Some(members) = evaluator.context().result_set().map(Arc::clone) else {
        evaluator.warn(Warning::MissingResultSet {
            aggregate: kind.name().to_string(),
        });
        return Ok(Operand::Unresolved);
    };
    let (distinct, argument) = match argument {
        Expression::UnaryOp {
            op: UnaryOperator::Distinct,
            operand,
        } => (true, operand.as_ref()),
        other => (false, other),
    };

    let depth = evaluator.stack_depth();
    let previous = evaluator.context().candidate().cloned();
    let collected = collect(argument, &members, evaluator);
    evaluator.truncate_stack(depth);
    match previous {
        Some(candidate) => evaluator.context_mut().set_candidate(candidate),
        None => evaluator.context_mut().clear_candidate(),
    };

    let mut values = collected?;
    if distinct {
        let mut unique: Vec<Value> = Vec::with_capacity(values.len());
        for value in values {
            if !unique.contains(&value) {
                unique.push(value);
            }
        }
        values = unique;
    }
    log::debug!(
        "{}({}) over {} members, {} values",
        kind.name(),
        if distinct { "DISTINCT" } else { "" },
        members.len(),
        values.len()
    );
    Ok(Operand::Value(compute(kind, values)?))
}

/// Argument values of every member; unresolved values are skipped
fn collect(
    argument: &Expression,
    members: &[Value],
    evaluator: &mut Evaluator<'_>,
) -> Step<Vec<Value>> {
    let mut values = Vec::with_capacity(members.len());
    for member in members {
        evaluator.context_mut().set_candidate(member.clone());
        if let Operand::Value(value) = evaluator.operand(argument)? {
            values.push(value);
        }
    }
    Ok(values)
}

fn compute(kind: AggregateKind, values: Vec<Value>) -> Step<Value> {
    let values: Vec<Value> = values.into_iter().filter(|v| !v.is_null()).collect();
    if kind == AggregateKind::Count {
        return Ok(Value::Long(values.len() as i64));
    }
    if values.is_empty() {
        return Ok(Value::Null);
    }
    match kind {
        AggregateKind::Sum => sum(kind, &values),
        AggregateKind::Avg => average(kind, &values),
        _ => extreme(kind, values),
    }
}

fn require_numeric(kind: AggregateKind, values: &[Value]) -> Step<()> {
    match values.iter().find(|v| !v.is_numeric()) {
        Some(value) => Err(EvalError::InvalidOperand {
            operator: kind.name(),
            expected: "Number",
            found: value.describe_type().to_string(),
        }
        .into()),
        None => Ok(()),
    }
}

fn sum(kind: AggregateKind, values: &[Value]) -> Step<Value> {
    require_numeric(kind, values)?;
    if values.iter().any(|v| matches!(v, Value::Decimal(_))) {
        return Ok(Value::Decimal(decimal_sum(values)));
    }
    if values.iter().any(|v| matches!(v, Value::Float(_) | Value::Double(_))) {
        return Ok(Value::Double(
            values.iter().filter_map(numeric::to_f64).sum(),
        ));
    }

    let mut total = BigInt::from(0);
    for value in values {
        match value {
            Value::BigInteger(n) => total += n,
            other => total += numeric::to_i64(other).unwrap_or(0),
        }
    }
    let has_big = values.iter().any(|v| matches!(v, Value::BigInteger(_)));
    Ok(match total.to_i64() {
        Some(n) if !has_big => Value::Long(n),
        _ => Value::BigInteger(total),
    })
}

fn decimal_sum(values: &[Value]) -> BigDecimal {
    values
        .iter()
        .filter_map(numeric::to_decimal)
        .fold(BigDecimal::from(0), |acc, n| acc + n)
}

fn average(kind: AggregateKind, values: &[Value]) -> Step<Value> {
    require_numeric(kind, values)?;
    let count = values.len();
    if values.iter().any(|v| matches!(v, Value::Decimal(_))) {
        return Ok(Value::Decimal(
            decimal_sum(values) / BigDecimal::from(count as i64),
        ));
    }
    let total: f64 = values.iter().filter_map(numeric::to_f64).sum();
    Ok(Value::Double(total / count as f64))
}

fn extreme(kind: AggregateKind, values: Vec<Value>) -> Step<Value> {
    let wanted = if kind == AggregateKind::Min {
        Ordering::Less
    } else {
        Ordering::Greater
    };
    let mut values = values.into_iter();
    let Some(mut best) = values.next() else {
        return Ok(Value::Null);
    };
    for value in values {
        match compare_values(&value, &best) {
            Some(ordering) if ordering == wanted => best = value,
            Some(_) => {}
            None => {
                return Err(EvalError::InvalidOperand {
                    operator: kind.name(),
                    expected: "mutually comparable values",
                    found: format!("{} and {}", best.describe_type(), value.describe_type()),
                }
                .into())
            }
        }
    }
    Ok(best)
}
