//! Operator definitions for expressions.

use crate::access::numeric::Arithmetic;
use serde::{Deserialize, Serialize};

/// Binary operators supported in expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOperator {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,

    // Logical
    And,
    Or,

    // String
    Like,

    // Type operators; the right operand names a type
    Is,
    IsNot,
    Cast,
}

impl BinaryOperator {
    /// Get the display string for this operator
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Mod => "%",
            BinaryOperator::Eq => "==",
            BinaryOperator::Ne => "!=",
            BinaryOperator::Lt => "<",
            BinaryOperator::Le => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::Ge => ">=",
            BinaryOperator::And => "&&",
            BinaryOperator::Or => "||",
            BinaryOperator::Like => "LIKE",
            BinaryOperator::Is => "instanceof",
            BinaryOperator::IsNot => "!instanceof",
            BinaryOperator::Cast => "CAST",
        }
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOperator::Eq
                | BinaryOperator::Ne
                | BinaryOperator::Lt
                | BinaryOperator::Le
                | BinaryOperator::Gt
                | BinaryOperator::Ge
        )
    }

    /// The numeric operation behind an arithmetic operator
    pub fn arithmetic(&self) -> Option<Arithmetic> {
        match self {
            BinaryOperator::Add => Some(Arithmetic::Add),
            BinaryOperator::Sub => Some(Arithmetic::Sub),
            BinaryOperator::Mul => Some(Arithmetic::Mul),
            BinaryOperator::Div => Some(Arithmetic::Div),
            BinaryOperator::Mod => Some(Arithmetic::Mod),
            _ => None,
        }
    }
}

/// Unary operators supported in expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOperator {
    /// Logical NOT
    Not,
    /// Arithmetic negation
    Neg,
    /// Bitwise complement
    Com,
    /// Marks an aggregate argument for de-duplication
    Distinct,
}

impl UnaryOperator {
    /// Get the display string for this operator
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOperator::Not => "!",
            UnaryOperator::Neg => "-",
            UnaryOperator::Com => "~",
            UnaryOperator::Distinct => "DISTINCT",
        }
    }
}
