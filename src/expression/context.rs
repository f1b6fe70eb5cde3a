//! Per-execution evaluation context.

use crate::access::{DetachedAccess, FieldAccess, Value};
use crate::catalog::TypeCatalog;
use crate::expression::diagnostics::{Diagnostics, LogDiagnostics, Warning};
use crate::expression::operand::{Binding, UnboundVariable};
use crate::invoke::{builtin_registry, MethodRegistry};
use std::collections::HashMap;
use std::sync::Arc;

/// Default alias of the candidate object
pub const DEFAULT_ALIAS: &str = "this";

/// Everything a tree walk reads besides the tree itself.
///
/// Created once per query execution. The candidate lives in `state` under
/// the alias; variables are bound and cleared by the caller as it
/// enumerates existential assignments.
pub struct EvaluationContext {
    alias: String,
    parameters: HashMap<String, Value>,
    state: HashMap<String, Value>,
    variables: HashMap<String, Value>,
    result_set: Option<Arc<[Value]>>,
    catalog: Arc<TypeCatalog>,
    registry: Arc<MethodRegistry>,
    field_access: Arc<dyn FieldAccess>,
    diagnostics: Arc<dyn Diagnostics>,
}

impl EvaluationContext {
    pub fn new(catalog: Arc<TypeCatalog>) -> Self {
        Self {
            alias: DEFAULT_ALIAS.to_string(),
            parameters: HashMap::new(),
            state: HashMap::new(),
            variables: HashMap::new(),
            result_set: None,
            catalog,
            registry: builtin_registry(),
            field_access: Arc::new(DetachedAccess),
            diagnostics: Arc::new(LogDiagnostics),
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }

    pub fn with_parameters(mut self, parameters: HashMap<String, Value>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_registry(mut self, registry: Arc<MethodRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_field_access(mut self, field_access: Arc<dyn FieldAccess>) -> Self {
        self.field_access = field_access;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn catalog(&self) -> &Arc<TypeCatalog> {
        &self.catalog
    }

    pub fn registry(&self) -> &Arc<MethodRegistry> {
        &self.registry
    }

    pub fn field_access(&self) -> &Arc<dyn FieldAccess> {
        &self.field_access
    }

    /// The current candidate, if one is bound
    pub fn candidate(&self) -> Option<&Value> {
        self.state.get(&self.alias)
    }

    /// Bind the candidate under the alias, returning the previous one
    pub fn set_candidate(&mut self, candidate: Value) -> Option<Value> {
        self.state.insert(self.alias.clone(), candidate)
    }

    pub fn clear_candidate(&mut self) -> Option<Value> {
        self.state.remove(&self.alias)
    }

    pub fn set_state(&mut self, name: impl Into<String>, value: Value) {
        self.state.insert(name.into(), value);
    }

    pub fn state(&self, name: &str) -> Option<&Value> {
        self.state.get(name)
    }

    /// Parameter value; absent parameters read as null
    pub fn parameter(&self, name: &str) -> Value {
        self.parameters.get(name).cloned().unwrap_or(Value::Null)
    }

    pub fn set_parameter(&mut self, name: impl Into<String>, value: Value) {
        self.parameters.insert(name.into(), value);
    }

    pub fn set_variable(&mut self, name: impl Into<String>, value: Value) {
        self.variables.insert(name.into(), value);
    }

    pub fn clear_variable(&mut self, name: &str) -> Option<Value> {
        self.variables.remove(name)
    }

    pub fn clear_variables(&mut self) {
        self.variables.clear();
    }

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    /// Resolve a variable: external state first, then bound variables
    pub fn resolve_variable(&self, name: &str) -> Binding {
        match self.state.get(name).or_else(|| self.variables.get(name)) {
            Some(value) => Binding::Bound(value.clone()),
            None => Binding::Unbound(UnboundVariable::new(name)),
        }
    }

    pub fn result_set(&self) -> Option<&Arc<[Value]>> {
        self.result_set.as_ref()
    }

    pub fn set_result_set(&mut self, members: Arc<[Value]>) {
        self.result_set = Some(members);
    }

    pub fn warn(&self, warning: Warning) {
        self.diagnostics.warn(warning);
    }
}
