//! Access layer for the data queries run against.
//!
//! This module provides the runtime data model the evaluator works on:
//!
//! - **Value**: Type-safe representation of every value a query can see
//! - **DataType**: Built-in runtime types and their supertypes
//! - **Object**: Candidate instances with ordered, named fields
//! - **FieldAccess**: Deferred field loading for managed instances
//!
//! Numeric promotion lives in `numeric` so that comparison, arithmetic and
//! the aggregate functions share a single set of widening rules.

pub mod numeric;
pub mod object;
pub mod value;

pub use object::{DetachedAccess, FieldAccess, Object, ObjectRef, ObjectStore};
pub use value::{
    DataType, OBJECT_TYPE, Value, builtin_supertypes, compare_values, values_equal,
};
