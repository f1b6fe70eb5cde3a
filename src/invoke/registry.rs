//! Registry of method evaluators.

use crate::catalog::TypeCatalog;
use crate::invoke::{collection, identity, map, math, string, MethodEvaluator};
use std::collections::HashMap;
use std::sync::Arc;

/// Method evaluators by receiver type and lower-cased method name.
///
/// Built completely before evaluation starts and only read afterwards.
#[derive(Default)]
pub struct MethodRegistry {
    statics: HashMap<String, Arc<dyn MethodEvaluator>>,
    methods: HashMap<String, HashMap<String, Arc<dyn MethodEvaluator>>>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in method
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        string::register(&mut registry);
        collection::register(&mut registry);
        map::register(&mut registry);
        math::register(&mut registry);
        identity::register(&mut registry);
        registry
    }

    /// Register an evaluator; `receiver_type` None registers a static function
    pub fn register(
        &mut self,
        receiver_type: Option<&str>,
        method: &str,
        evaluator: Arc<dyn MethodEvaluator>,
    ) {
        let key = method.to_lowercase();
        match receiver_type {
            Some(type_name) => {
                self.methods
                    .entry(type_name.to_string())
                    .or_default()
                    .insert(key, evaluator);
            }
            None => {
                self.statics.insert(key, evaluator);
            }
        }
    }

    /// Find the evaluator for a call: statics by name; receiver methods by
    /// exact type first, then up the type's ancestry
    pub fn lookup(
        &self,
        receiver_type: Option<&str>,
        method: &str,
        catalog: &TypeCatalog,
    ) -> Option<Arc<dyn MethodEvaluator>> {
        let key = method.to_lowercase();
        let Some(type_name) = receiver_type else {
            return self.statics.get(&key).cloned();
        };
        catalog
            .ancestry(type_name)
            .iter()
            .find_map(|t| self.methods.get(t).and_then(|m| m.get(&key)))
            .cloned()
    }

    /// Find a receiver method by name alone, for receivers with no known
    /// type. Types are searched in name order.
    pub fn lookup_by_name(&self, method: &str) -> Option<Arc<dyn MethodEvaluator>> {
        let key = method.to_lowercase();
        let mut types: Vec<&String> = self.methods.keys().collect();
        types.sort();
        types
            .into_iter()
            .find_map(|t| self.methods.get(t).and_then(|m| m.get(&key)))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.statics.len() + self.methods.values().map(HashMap::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
