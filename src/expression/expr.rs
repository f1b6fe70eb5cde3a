//! Expression tree definitions.
//!
//! Trees are produced by a query compiler and are never mutated while being
//! evaluated; one compiled tree is shared by every evaluation of a query.

use crate::access::Value;
use crate::expression::operator::{BinaryOperator, UnaryOperator};
use crate::invoke::AggregateKind;
use serde::{Deserialize, Serialize};

/// Literal value in an expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Literal {
    pub value: Value,
}

impl Literal {
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    pub fn null() -> Self {
        Self { value: Value::Null }
    }
}

/// Dotted member path, optionally navigated from a qualifier expression
/// (a cast, a variable, a parameter...) instead of the candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimaryPath {
    #[serde(default)]
    pub qualifier: Option<Box<Expression>>,
    pub segments: Vec<String>,
}

impl PrimaryPath {
    /// The path as written, e.g. `address.city`
    pub fn id(&self) -> String {
        self.segments.join(".")
    }
}

/// Method or function call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invocation {
    /// None for static calls such as `count(...)` or `Math.abs(...)`
    #[serde(default)]
    pub receiver: Option<Box<Expression>>,
    pub method: String,
    #[serde(default)]
    pub args: Vec<Expression>,
    /// Declared type of the receiver, used when its value is null
    #[serde(default)]
    pub receiver_type: Option<String>,
}

impl Invocation {
    pub fn is_static(&self) -> bool {
        self.receiver.is_none()
    }
}

/// Expression tree node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    /// Literal constant value
    Literal(Literal),

    /// Query parameter, by name
    Parameter(String),

    /// Query variable, by name
    Variable(String),

    /// Member path
    Primary(PrimaryPath),

    /// Binary operation
    BinaryOp {
        op: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },

    /// Unary operation
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expression>,
    },

    /// Method or function invocation
    Invoke(Invocation),

    /// Result instance construction, `new Type(args...)`
    Creator {
        type_name: String,
        args: Vec<Expression>,
    },

    /// CASE WHEN ... THEN ... ELSE ... END
    Case {
        conditions: Vec<(Expression, Expression)>,
        else_result: Option<Box<Expression>>,
    },

    /// Array literal, `{a, b, c}`
    Array(Vec<Expression>),
}

impl Expression {
    /// Create a literal expression
    pub fn literal(value: impl Into<Value>) -> Self {
        Expression::Literal(Literal::new(value.into()))
    }

    pub fn null() -> Self {
        Expression::Literal(Literal::null())
    }

    /// Create a type reference literal
    pub fn type_ref(name: impl Into<String>) -> Self {
        Expression::Literal(Literal::new(Value::Type(name.into())))
    }

    pub fn parameter(name: impl Into<String>) -> Self {
        Expression::Parameter(name.into())
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Expression::Variable(name.into())
    }

    /// Create a path from dotted text, e.g. `path("address.city")`
    pub fn path(id: &str) -> Self {
        Expression::Primary(PrimaryPath {
            qualifier: None,
            segments: id.split('.').map(str::to_string).collect(),
        })
    }

    /// Create a path navigated from a qualifier expression
    pub fn qualified(qualifier: Expression, segments: &[&str]) -> Self {
        Expression::Primary(PrimaryPath {
            qualifier: Some(Box::new(qualifier)),
            segments: segments.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// `((type) operand).segments`
    pub fn cast_path(operand: Expression, type_name: &str, segments: &[&str]) -> Self {
        Self::qualified(
            Self::binary_op(BinaryOperator::Cast, operand, Self::type_ref(type_name)),
            segments,
        )
    }

    /// Create a binary operation expression
    pub fn binary_op(op: BinaryOperator, left: Expression, right: Expression) -> Self {
        Expression::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Create a unary operation expression
    pub fn unary_op(op: UnaryOperator, operand: Expression) -> Self {
        Expression::UnaryOp {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn and(left: Expression, right: Expression) -> Self {
        Self::binary_op(BinaryOperator::And, left, right)
    }

    pub fn or(left: Expression, right: Expression) -> Self {
        Self::binary_op(BinaryOperator::Or, left, right)
    }

    pub fn not_expr(operand: Expression) -> Self {
        Self::unary_op(UnaryOperator::Not, operand)
    }

    pub fn eq(left: Expression, right: Expression) -> Self {
        Self::binary_op(BinaryOperator::Eq, left, right)
    }

    pub fn ne(left: Expression, right: Expression) -> Self {
        Self::binary_op(BinaryOperator::Ne, left, right)
    }

    pub fn lt(left: Expression, right: Expression) -> Self {
        Self::binary_op(BinaryOperator::Lt, left, right)
    }

    pub fn le(left: Expression, right: Expression) -> Self {
        Self::binary_op(BinaryOperator::Le, left, right)
    }

    pub fn gt(left: Expression, right: Expression) -> Self {
        Self::binary_op(BinaryOperator::Gt, left, right)
    }

    pub fn ge(left: Expression, right: Expression) -> Self {
        Self::binary_op(BinaryOperator::Ge, left, right)
    }

    pub fn add_expr(left: Expression, right: Expression) -> Self {
        Self::binary_op(BinaryOperator::Add, left, right)
    }

    pub fn sub_expr(left: Expression, right: Expression) -> Self {
        Self::binary_op(BinaryOperator::Sub, left, right)
    }

    pub fn mul_expr(left: Expression, right: Expression) -> Self {
        Self::binary_op(BinaryOperator::Mul, left, right)
    }

    pub fn div_expr(left: Expression, right: Expression) -> Self {
        Self::binary_op(BinaryOperator::Div, left, right)
    }

    pub fn like(left: Expression, pattern: Expression) -> Self {
        Self::binary_op(BinaryOperator::Like, left, pattern)
    }

    /// `operand instanceof type_name`
    pub fn is_type(operand: Expression, type_name: &str) -> Self {
        Self::binary_op(BinaryOperator::Is, operand, Self::type_ref(type_name))
    }

    pub fn neg(operand: Expression) -> Self {
        Self::unary_op(UnaryOperator::Neg, operand)
    }

    pub fn distinct(operand: Expression) -> Self {
        Self::unary_op(UnaryOperator::Distinct, operand)
    }

    /// `receiver.method(args)`
    pub fn invoke(receiver: Expression, method: &str, args: Vec<Expression>) -> Self {
        Expression::Invoke(Invocation {
            receiver: Some(Box::new(receiver)),
            method: method.to_string(),
            args,
            receiver_type: None,
        })
    }

    /// Static call, `method(args)`
    pub fn call(method: &str, args: Vec<Expression>) -> Self {
        Expression::Invoke(Invocation {
            receiver: None,
            method: method.to_string(),
            args,
            receiver_type: None,
        })
    }

    pub fn creator(type_name: &str, args: Vec<Expression>) -> Self {
        Expression::Creator {
            type_name: type_name.to_string(),
            args,
        }
    }

    pub fn case(conditions: Vec<(Expression, Expression)>, else_result: Option<Expression>) -> Self {
        Expression::Case {
            conditions,
            else_result: else_result.map(Box::new),
        }
    }

    /// Name of the node kind, for diagnostics
    pub fn kind_name(&self) -> &'static str {
        match self {
            Expression::Literal(_) => "literal",
            Expression::Parameter(_) => "parameter",
            Expression::Variable(_) => "variable",
            Expression::Primary(_) => "primary",
            Expression::BinaryOp { .. } => "dyadic",
            Expression::UnaryOp { .. } => "unary",
            Expression::Invoke(_) => "invocation",
            Expression::Creator { .. } => "creator",
            Expression::Case { .. } => "case",
            Expression::Array(_) => "array",
        }
    }

    /// Check if this expression calls an aggregate function anywhere
    pub fn contains_aggregate(&self) -> bool {
        match self {
            Expression::Literal(_) | Expression::Parameter(_) | Expression::Variable(_) => false,
            Expression::Primary(path) => path
                .qualifier
                .as_ref()
                .is_some_and(|q| q.contains_aggregate()),
            Expression::BinaryOp { left, right, .. } => {
                left.contains_aggregate() || right.contains_aggregate()
            }
            Expression::UnaryOp { operand, .. } => operand.contains_aggregate(),
            Expression::Invoke(invocation) => {
                (invocation.is_static() && AggregateKind::from_name(&invocation.method).is_some())
                    || invocation
                        .receiver
                        .as_ref()
                        .is_some_and(|r| r.contains_aggregate())
                    || invocation.args.iter().any(Expression::contains_aggregate)
            }
            Expression::Creator { args, .. } | Expression::Array(args) => {
                args.iter().any(Expression::contains_aggregate)
            }
            Expression::Case {
                conditions,
                else_result,
            } => {
                conditions
                    .iter()
                    .any(|(cond, res)| cond.contains_aggregate() || res.contains_aggregate())
                    || else_result.as_ref().is_some_and(|e| e.contains_aggregate())
            }
        }
    }
}
