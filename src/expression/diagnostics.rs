//! Warnings raised while evaluating, and where they go.
//!
//! A warning never stops evaluation. The evaluator reports it to the
//! [`Diagnostics`] collaborator held by its context; by default that is the
//! `log` facade, but callers that want to show warnings to end users can
//! collect them instead.

use parking_lot::Mutex;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    /// No evaluator is registered for the method on this receiver type
    UnsupportedMethod {
        receiver: Option<String>,
        method: String,
    },

    /// A variable had no binding where it could not be enumerated
    UnboundVariable { name: String },

    /// A cast target is not a supertype of the value's runtime type
    FailedCast { found: String, target: String },

    /// A CASE condition produced something other than a boolean
    NonBooleanCaseCondition { found: String },

    /// A member path segment could not be resolved
    UnresolvedMember { member: String, type_name: String },

    /// Division or modulo by zero
    DivisionByZero { operator: &'static str },

    /// An arithmetic operand or result was infinite or NaN
    NonFiniteOperand { operator: &'static str },

    /// An aggregate was called without a result set to aggregate over
    MissingResultSet { aggregate: String },

    /// An array literal element was of an unsupported kind
    UnsupportedArrayElement { kind: &'static str },

    /// A positional method argument fell outside its receiver
    IndexOutOfRange { method: String, index: i64 },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::UnsupportedMethod { receiver, method } => match receiver {
                Some(receiver) => write!(
                    f,
                    "Method {} is not supported in-memory on type {}",
                    method, receiver
                ),
                None => write!(f, "Function {} is not supported in-memory", method),
            },
            Warning::UnboundVariable { name } => {
                write!(f, "Variable {} has no value bound", name)
            }
            Warning::FailedCast { found, target } => {
                write!(f, "Cannot cast a value of type {} to {}", found, target)
            }
            Warning::NonBooleanCaseCondition { found } => {
                write!(f, "CASE condition evaluated to {}, expected Boolean", found)
            }
            Warning::UnresolvedMember { member, type_name } => {
                write!(f, "Member {} cannot be resolved on type {}", member, type_name)
            }
            Warning::DivisionByZero { operator } => {
                write!(f, "Division by zero in operator {}", operator)
            }
            Warning::NonFiniteOperand { operator } => {
                write!(f, "Non-finite operand in operator {}", operator)
            }
            Warning::MissingResultSet { aggregate } => {
                write!(f, "Aggregate {} needs a result set", aggregate)
            }
            Warning::UnsupportedArrayElement { kind } => {
                write!(f, "Array literal element of kind {} cannot be evaluated", kind)
            }
            Warning::IndexOutOfRange { method, index } => {
                write!(f, "Index {} is out of range in {}", index, method)
            }
        }
    }
}

/// Receives the warnings produced during evaluation
pub trait Diagnostics: Send + Sync {
    fn warn(&self, warning: Warning);
}

/// Forwards warnings to the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn warn(&self, warning: Warning) {
        log::warn!("{}", warning);
    }
}

/// Keeps warnings for the caller, also forwarding them to the log
#[derive(Debug, Default)]
pub struct CollectingDiagnostics {
    warnings: Mutex<Vec<Warning>>,
}

impl CollectingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warnings(&self) -> Vec<Warning> {
        self.warnings.lock().clone()
    }

    /// Remove and return everything collected so far
    pub fn take(&self) -> Vec<Warning> {
        std::mem::take(&mut *self.warnings.lock())
    }
}

impl Diagnostics for CollectingDiagnostics {
    fn warn(&self, warning: Warning) {
        log::debug!("{}", warning);
        self.warnings.lock().push(warning);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warning_display() {
        let warning = Warning::UnsupportedMethod {
            receiver: Some("String".to_string()),
            method: "reverse".to_string(),
        };
        assert_eq!(
            warning.to_string(),
            "Method reverse is not supported in-memory on type String"
        );

        let warning = Warning::UnsupportedMethod {
            receiver: None,
            method: "NOW".to_string(),
        };
        assert_eq!(warning.to_string(), "Function NOW is not supported in-memory");

        let warning = Warning::FailedCast {
            found: "org.acme.Person".to_string(),
            target: "org.acme.Manager".to_string(),
        };
        assert_eq!(
            warning.to_string(),
            "Cannot cast a value of type org.acme.Person to org.acme.Manager"
        );
    }

    #[test]
    fn test_collecting_diagnostics() {
        let diagnostics = CollectingDiagnostics::new();
        diagnostics.warn(Warning::UnboundVariable {
            name: "v".to_string(),
        });
        diagnostics.warn(Warning::DivisionByZero { operator: "/" });
        assert_eq!(diagnostics.warnings().len(), 2);

        let taken = diagnostics.take();
        assert_eq!(taken.len(), 2);
        assert!(diagnostics.warnings().is_empty());
    }
}
