//! Candidate objects and the deferred field-loading capability.

use crate::access::Value;
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// An object instance: its type, the fields currently held in memory and,
/// for managed (persistent) instances, a stable identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Object {
    type_name: String,
    #[serde(default)]
    fields: IndexMap<String, Value>,
    #[serde(default)]
    identity: Option<Value>,
}

impl Object {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: IndexMap::new(),
            identity: None,
        }
    }

    /// Create a managed object with the given identity
    pub fn managed(type_name: impl Into<String>, identity: Value) -> Self {
        Self {
            identity: Some(identity),
            ..Self::new(type_name)
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn identity(&self) -> Option<&Value> {
        self.identity.as_ref()
    }

    pub fn is_managed(&self) -> bool {
        self.identity.is_some()
    }

    /// Member-by-name access to an in-memory field
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    pub fn into_ref(self) -> ObjectRef {
        ObjectRef(Arc::new(self))
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.identity {
            Some(id) => write!(f, "{}[{}]", self.type_name, id),
            None => {
                write!(f, "{}{{", self.type_name)?;
                for (i, (name, value)) in self.fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}={}", name, value)?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// Shared handle to an object. Managed objects are equal when their type and
/// identity match; other objects are equal only to themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectRef(Arc<Object>);

impl ObjectRef {
    pub fn new(object: Object) -> Self {
        Self(Arc::new(object))
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

impl Deref for ObjectRef {
    type Target = Object;

    fn deref(&self) -> &Object {
        &self.0
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.0, &other.0) {
            return true;
        }
        match (&self.0.identity, &other.0.identity) {
            (Some(a), Some(b)) => self.0.type_name == other.0.type_name && a == b,
            _ => false,
        }
    }
}

impl From<Object> for Value {
    fn from(object: Object) -> Self {
        Value::Object(object.into_ref())
    }
}

/// Deferred field loading for managed objects.
///
/// `field_index` returns None when the object is not managed by this
/// capability; the evaluator then falls back to member-by-name access.
pub trait FieldAccess: Send + Sync {
    fn field_index(&self, object: &Object, member: &str) -> Option<usize>;

    /// Make sure field `index` of `object` is loaded and return its value
    fn fetch_field(&self, object: &Object, index: usize) -> anyhow::Result<Value>;
}

/// Field access for detached data: nothing is managed
#[derive(Debug, Default, Clone, Copy)]
pub struct DetachedAccess;

impl FieldAccess for DetachedAccess {
    fn field_index(&self, _object: &Object, _member: &str) -> Option<usize> {
        None
    }

    fn fetch_field(&self, object: &Object, index: usize) -> anyhow::Result<Value> {
        anyhow::bail!("{} is not managed (field {})", object.type_name(), index)
    }
}

/// Backing rows for managed objects, keyed by type and identity, with a
/// fixed field layout per type. Loaded rows are served by field index.
#[derive(Default)]
pub struct ObjectStore {
    layouts: HashMap<String, Vec<String>>,
    rows: RwLock<HashMap<(String, String), Vec<Value>>>,
    loads: AtomicUsize,
}

impl ObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the persistent field layout of a type
    pub fn define_layout(&mut self, type_name: impl Into<String>, fields: Vec<String>) {
        self.layouts.insert(type_name.into(), fields);
    }

    /// Store the persistent state of a managed object
    pub fn put(&self, type_name: &str, identity: &Value, row: Vec<Value>) -> anyhow::Result<()> {
        let layout = self
            .layouts
            .get(type_name)
            .ok_or_else(|| anyhow::anyhow!("no field layout for type {}", type_name))?;
        if layout.len() != row.len() {
            anyhow::bail!(
                "row for {} has {} values but the layout has {} fields",
                type_name,
                row.len(),
                layout.len()
            );
        }
        self.rows
            .write()
            .insert((type_name.to_string(), identity.to_string()), row);
        Ok(())
    }

    /// Number of field loads served so far
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }
}

impl FieldAccess for ObjectStore {
    fn field_index(&self, object: &Object, member: &str) -> Option<usize> {
        object.identity()?;
        self.layouts
            .get(object.type_name())?
            .iter()
            .position(|name| name == member)
    }

    fn fetch_field(&self, object: &Object, index: usize) -> anyhow::Result<Value> {
        let identity = object
            .identity()
            .ok_or_else(|| anyhow::anyhow!("{} has no identity", object.type_name()))?;
        let rows = self.rows.read();
        let row = rows
            .get(&(object.type_name().to_string(), identity.to_string()))
            .ok_or_else(|| {
                anyhow::anyhow!("no stored state for {}[{}]", object.type_name(), identity)
            })?;
        let value = row.get(index).cloned().ok_or_else(|| {
            anyhow::anyhow!("field index {} out of range for {}", index, object.type_name())
        })?;
        self.loads.fetch_add(1, Ordering::Relaxed);
        Ok(value)
    }
}
