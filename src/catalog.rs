//! Type catalog: resolves type names and aliases, answers ancestry and
//! assignability questions, and builds result instances for constructor
//! expressions.
//!
//! Built-in types are always known. User types are registered once before
//! evaluation; afterwards the catalog is only read. Ancestry chains are
//! computed lazily and memoized, so concurrent evaluations share them.

pub mod class_info;

pub use class_info::{ClassInfo, ConstructorInfo, ParamInfo};

use crate::access::{builtin_supertypes, Object, Value, OBJECT_TYPE};
use dashmap::DashMap;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

/// Package prefixes that may qualify a built-in type name
const BUILTIN_PACKAGES: &[&str] = &["java.lang.", "java.util.", "java.math."];

#[derive(Debug, Default)]
pub struct TypeCatalog {
    classes: HashMap<String, ClassInfo>,
    /// Short names and aliases mapped to fully qualified names
    imports: HashMap<String, String>,
    ancestry: DashMap<String, Arc<[String]>>,
}

impl TypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user type. Its simple name becomes an import unless
    /// another type already claimed it.
    pub fn register(&mut self, class: ClassInfo) {
        let simple = class.simple_name().to_string();
        if simple != class.name {
            self.imports.entry(simple).or_insert_with(|| class.name.clone());
        }
        self.classes.insert(class.name.clone(), class);
        self.ancestry.clear();
    }

    /// Add an explicit alias for a type name
    pub fn add_import(&mut self, alias: impl Into<String>, type_name: impl Into<String>) {
        self.imports.insert(alias.into(), type_name.into());
    }

    pub fn class(&self, name: &str) -> Option<&ClassInfo> {
        self.classes.get(name)
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassInfo> {
        self.classes.values()
    }

    fn is_known(&self, name: &str) -> bool {
        self.classes.contains_key(name) || builtin_supertypes(name).is_some()
    }

    /// Resolve a possibly short or aliased type name to its full name
    pub fn resolve(&self, name: &str) -> Option<String> {
        if self.is_known(name) {
            return Some(name.to_string());
        }
        if let Some(full) = self.imports.get(name) {
            if self.is_known(full) {
                return Some(full.clone());
            }
        }
        BUILTIN_PACKAGES
            .iter()
            .filter_map(|package| name.strip_prefix(package))
            .find(|short| builtin_supertypes(short).is_some())
            .map(str::to_string)
    }

    fn direct_supertypes(&self, name: &str) -> Vec<String> {
        if let Some(class) = self.classes.get(name) {
            let supers: Vec<String> = class
                .supertypes()
                .map(|s| self.resolve(s).unwrap_or_else(|| s.to_string()))
                .collect();
            if supers.is_empty() {
                return vec![OBJECT_TYPE.to_string()];
            }
            return supers;
        }
        builtin_supertypes(name)
            .map(|supers| supers.iter().map(|s| s.to_string()).collect())
            .unwrap_or_else(|| vec![OBJECT_TYPE.to_string()])
    }

    /// The type itself followed by all of its supertypes, nearest first,
    /// always ending with the root type
    pub fn ancestry(&self, name: &str) -> Arc<[String]> {
        if let Some(chain) = self.ancestry.get(name) {
            return Arc::clone(chain.value());
        }

        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([name.to_string()]);
        while let Some(current) = queue.pop_front() {
            if current == OBJECT_TYPE || !seen.insert(current.clone()) {
                continue;
            }
            queue.extend(self.direct_supertypes(&current));
            chain.push(current);
        }
        chain.push(OBJECT_TYPE.to_string());

        let chain: Arc<[String]> = chain.into();
        self.ancestry.insert(name.to_string(), Arc::clone(&chain));
        chain
    }

    /// Whether `from` is `to` or one of its subtypes
    pub fn is_assignable(&self, from: &str, to: &str) -> bool {
        let target = self.resolve(to).unwrap_or_else(|| to.to_string());
        self.ancestry(from).iter().any(|t| *t == target)
    }

    /// Runtime instance test. Null is an instance of nothing.
    pub fn is_instance(&self, value: &Value, type_name: &str) -> bool {
        value
            .type_name()
            .is_some_and(|actual| self.is_assignable(actual, type_name))
    }

    /// Whether a value may be passed where `type_name` is expected
    fn accepts(&self, type_name: &str, value: &Value) -> bool {
        if value.is_null() {
            return true;
        }
        if self.is_instance(value, type_name) {
            return true;
        }
        // Loose numeric typing: any number feeds a numeric parameter
        value.is_numeric()
            && self
                .resolve(type_name)
                .is_some_and(|t| self.is_assignable(&t, "Number"))
    }

    /// Build an instance of `type_name` with the first constructor whose
    /// parameters accept `args`
    pub fn construct(&self, type_name: &str, args: &[Value]) -> Option<Value> {
        let class = self.classes.get(type_name)?;
        if class.constructors.is_empty() && args.is_empty() {
            return Some(Object::new(&class.name).into());
        }
        let constructor = class.constructors.iter().find(|c| {
            c.arity() == args.len()
                && c.params
                    .iter()
                    .zip(args)
                    .all(|(param, arg)| self.accepts(&param.type_name, arg))
        })?;
        let object = constructor
            .params
            .iter()
            .zip(args)
            .fold(Object::new(&class.name), |object, (param, arg)| {
                object.with_field(param.field.clone(), arg.clone())
            });
        Some(object.into())
    }
}
