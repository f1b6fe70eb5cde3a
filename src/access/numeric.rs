//! Numeric promotion and arithmetic.
//!
//! Query arithmetic is carried out on arbitrary-precision decimals so that
//! values exactly representable in decimal form never pick up binary
//! rounding error. Floating point values enter through their shortest
//! decimal text (`0.1f64` becomes `0.1`, not its binary expansion).
//! Division is the exception: it goes through `f64` and is re-widened.

use crate::access::Value;
use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};
use std::cmp::Ordering;
use std::str::FromStr;

/// Arithmetic operators understood by [`apply`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arithmetic {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

/// Widen any numeric value to a decimal
pub fn to_decimal(value: &Value) -> Option<BigDecimal> {
    match value {
        Value::Byte(n) => Some(BigDecimal::from(*n)),
        Value::Short(n) => Some(BigDecimal::from(*n)),
        Value::Int(n) => Some(BigDecimal::from(*n)),
        Value::Long(n) => Some(BigDecimal::from(*n)),
        Value::BigInteger(n) => Some(BigDecimal::new(n.clone(), 0)),
        Value::Float(n) if n.is_finite() => BigDecimal::from_str(&n.to_string()).ok(),
        Value::Double(n) if n.is_finite() => BigDecimal::from_str(&n.to_string()).ok(),
        Value::Decimal(n) => Some(n.clone()),
        _ => None,
    }
}

/// Integral values as `i64` (None for floating kinds and out-of-range big integers)
pub fn to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Byte(n) => Some(i64::from(*n)),
        Value::Short(n) => Some(i64::from(*n)),
        Value::Int(n) => Some(i64::from(*n)),
        Value::Long(n) => Some(*n),
        Value::BigInteger(n) => n.to_i64(),
        _ => None,
    }
}

pub fn to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Float(n) => Some(f64::from(*n)),
        Value::Double(n) => Some(*n),
        Value::Decimal(n) => n.to_f64(),
        Value::BigInteger(n) => n.to_f64(),
        other => to_i64(other).map(|n| n as f64),
    }
}

/// Compare two numeric values of any kind by magnitude
pub fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    if let (Some(l), Some(r)) = (small_integral(left), small_integral(right)) {
        return Some(l.cmp(&r));
    }
    match (left, right) {
        (Value::Float(_) | Value::Double(_), Value::Float(_) | Value::Double(_)) => {
            to_f64(left)?.partial_cmp(&to_f64(right)?)
        }
        _ => Some(to_decimal(left)?.cmp(&to_decimal(right)?)),
    }
}

fn small_integral(value: &Value) -> Option<i64> {
    match value {
        Value::BigInteger(_) => None,
        other => to_i64(other),
    }
}

/// Why [`apply`] produced no value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticFault {
    /// Division or modulo by zero
    DivisionByZero,
    /// An operand or the result is infinite, NaN or not a number at all
    NonFinite,
}

/// Apply an arithmetic operator to two numeric values.
pub fn apply(op: Arithmetic, left: &Value, right: &Value) -> Result<Value, ArithmeticFault> {
    if op == Arithmetic::Div {
        let dividend = finite_f64(left)?;
        let divisor = finite_f64(right)?;
        if divisor == 0.0 {
            return Err(ArithmeticFault::DivisionByZero);
        }
        let quotient = dividend / divisor;
        if !quotient.is_finite() {
            return Err(ArithmeticFault::NonFinite);
        }
        return BigDecimal::from_str(&quotient.to_string())
            .map(Value::Decimal)
            .map_err(|_| ArithmeticFault::NonFinite);
    }

    let l = to_decimal(left).ok_or(ArithmeticFault::NonFinite)?;
    let r = to_decimal(right).ok_or(ArithmeticFault::NonFinite)?;
    let result = match op {
        Arithmetic::Add => l + r,
        Arithmetic::Sub => l - r,
        Arithmetic::Mul => l * r,
        _ => {
            if r.is_zero() {
                return Err(ArithmeticFault::DivisionByZero);
            }
            l % r
        }
    };
    Ok(Value::Decimal(result))
}

fn finite_f64(value: &Value) -> Result<f64, ArithmeticFault> {
    to_f64(value)
        .filter(|n| n.is_finite())
        .ok_or(ArithmeticFault::NonFinite)
}

/// Negate, keeping the numeric kind
pub fn negate(value: &Value) -> Option<Value> {
    match value {
        Value::Byte(n) => Some(Value::Byte(n.wrapping_neg())),
        Value::Short(n) => Some(Value::Short(n.wrapping_neg())),
        Value::Int(n) => Some(Value::Int(n.wrapping_neg())),
        Value::Long(n) => Some(Value::Long(n.wrapping_neg())),
        Value::BigInteger(n) => Some(Value::BigInteger(-n)),
        Value::Float(n) => Some(Value::Float(-n)),
        Value::Double(n) => Some(Value::Double(-n)),
        Value::Decimal(n) => Some(Value::Decimal(-n.clone())),
        _ => None,
    }
}

/// Bitwise complement. Non-numeric values count as zero.
pub fn complement(value: &Value) -> Value {
    match value {
        Value::Byte(n) => Value::Byte(!n),
        Value::Short(n) => Value::Short(!n),
        Value::Int(n) => Value::Int(!n),
        Value::Long(n) => Value::Long(!n),
        Value::BigInteger(n) => Value::BigInteger(-n - BigInt::from(1)),
        Value::Float(_) | Value::Double(_) | Value::Decimal(_) => {
            Value::Long(!to_f64(value).map(|f| f as i64).unwrap_or(0))
        }
        _ => Value::Int(!0),
    }
}

/// Absolute value, keeping the numeric kind
pub fn abs(value: &Value) -> Option<Value> {
    match value {
        Value::Byte(n) => Some(Value::Byte(n.wrapping_abs())),
        Value::Short(n) => Some(Value::Short(n.wrapping_abs())),
        Value::Int(n) => Some(Value::Int(n.wrapping_abs())),
        Value::Long(n) => Some(Value::Long(n.wrapping_abs())),
        Value::BigInteger(n) => Some(Value::BigInteger(n.abs())),
        Value::Float(n) => Some(Value::Float(n.abs())),
        Value::Double(n) => Some(Value::Double(n.abs())),
        Value::Decimal(n) => Some(Value::Decimal(n.abs())),
        _ => None,
    }
}
