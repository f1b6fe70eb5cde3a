//! Expression trees and their in-memory evaluation.
//!
//! This module provides:
//! - The expression tree and operators
//! - The operand stack machine and its evaluation context
//! - The unresolved marker and unbound-variable signal
//! - Warnings and where they are reported

pub mod context;
pub mod diagnostics;
pub mod error;
pub mod eval;
pub mod expr;
pub mod operand;
pub mod operator;
pub mod pattern;

pub use context::{EvaluationContext, DEFAULT_ALIAS};
pub use diagnostics::{CollectingDiagnostics, Diagnostics, LogDiagnostics, Warning};
pub use error::{EvalError, EvalResult};
pub use eval::Evaluator;
pub use expr::{Expression, Invocation, Literal, PrimaryPath};
pub use operand::{Binding, Halt, Operand, Resolution, Step, UnboundVariable};
pub use operator::{BinaryOperator, UnaryOperator};
