//! Error types for expression evaluation.
//!
//! These errors mean the expression tree itself breaks the contract the
//! evaluator relies on, so they abort the whole evaluation. Gaps that only
//! affect one candidate are not errors; they resolve to
//! [`Operand::Unresolved`](crate::expression::Operand::Unresolved).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EvalError {
    #[error("CAST is only supported as the qualifier of a member path")]
    BareCast,

    #[error("Negation is not supported on {shape} expressions")]
    UnsupportedNegation { shape: &'static str },

    #[error("Cannot negate a value of type {type_name}")]
    NonNumericNegation { type_name: String },

    #[error("Bitwise complement is not supported on {shape} expressions")]
    UnsupportedComplement { shape: &'static str },

    #[error("LIKE can only be used on a String, found {found}")]
    LikeOperand { found: String },

    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Invalid operand for operator {operator}: expected {expected}, got {found}")]
    InvalidOperand {
        operator: &'static str,
        expected: &'static str,
        found: String,
    },

    #[error("Operator {operator} requires a type as its right operand, got {found}")]
    TypeOperandExpected {
        operator: &'static str,
        found: &'static str,
    },

    #[error("Unknown type: {name}")]
    UnknownType { name: String },

    #[error("No constructor of {type_name} accepts ({arguments})")]
    NoMatchingConstructor { type_name: String, arguments: String },

    #[error("Operator {operator} is not supported here")]
    UnsupportedOperator { operator: &'static str },

    #[error("Method {method} expects {expected} arguments, got {actual}")]
    ArgumentCount {
        method: String,
        expected: &'static str,
        actual: usize,
    },

    #[error("Operand stack holds {size} values after evaluation, expected 1")]
    StackImbalance { size: usize },

    #[error("Operand stack underflow")]
    StackUnderflow,

    /// The field-loading capability failed; its error is passed through
    #[error(transparent)]
    FieldLoad(#[from] anyhow::Error),
}

/// Result type for expression operations
pub type EvalResult<T> = Result<T, EvalError>;
