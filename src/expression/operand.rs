//! Operand stack entries and the unbound-variable signal.

use crate::access::Value;
use crate::expression::EvalError;

/// One entry of the operand stack: a value, or the marker for a
/// subexpression that could not be resolved against this candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Value(Value),
    Unresolved,
}

impl Operand {
    pub fn is_unresolved(&self) -> bool {
        matches!(self, Operand::Unresolved)
    }

    /// True only for a boolean TRUE value
    pub fn is_true(&self) -> bool {
        matches!(self, Operand::Value(Value::Boolean(true)))
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Operand::Value(value) => Some(value),
            Operand::Unresolved => None,
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Operand::Value(value) => Some(value),
            Operand::Unresolved => None,
        }
    }

    /// Type name for diagnostics
    pub fn describe_type(&self) -> &str {
        match self {
            Operand::Value(value) => value.describe_type(),
            Operand::Unresolved => "unresolved",
        }
    }
}

impl From<Value> for Operand {
    fn from(value: Value) -> Self {
        Operand::Value(value)
    }
}

impl From<bool> for Operand {
    fn from(b: bool) -> Self {
        Operand::Value(Value::Boolean(b))
    }
}

/// A variable was referenced before any value was bound to it.
///
/// `candidates` holds the values the variable could take, when the point
/// of failure knows them (e.g. the elements of `coll.contains(v)`).
#[derive(Debug, Clone, PartialEq)]
pub struct UnboundVariable {
    pub name: String,
    pub candidates: Option<Vec<Value>>,
}

impl UnboundVariable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            candidates: None,
        }
    }

    pub fn with_candidates(mut self, candidates: Vec<Value>) -> Self {
        self.candidates = Some(candidates);
        self
    }
}

/// Result of resolving a variable by name
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Bound(Value),
    Unbound(UnboundVariable),
}

/// Why a tree walk stopped before producing its operand
#[derive(Debug)]
pub enum Halt {
    Unbound(UnboundVariable),
    Fatal(EvalError),
}

impl From<EvalError> for Halt {
    fn from(err: EvalError) -> Self {
        Halt::Fatal(err)
    }
}

impl From<UnboundVariable> for Halt {
    fn from(unbound: UnboundVariable) -> Self {
        Halt::Unbound(unbound)
    }
}

/// Result type for one step of a tree walk
pub type Step<T> = Result<T, Halt>;

/// Outcome of evaluating a whole expression
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved(Operand),
    Unbound(UnboundVariable),
}

impl Resolution {
    /// The resolved operand, treating an unbound variable as unresolved
    pub fn into_operand(self) -> Operand {
        match self {
            Resolution::Resolved(operand) => operand,
            Resolution::Unbound(_) => Operand::Unresolved,
        }
    }
}
