//! In-memory query execution.
//!
//! A `QueryDocument` describes one query: the candidate alias, an optional
//! filter, ordering, range and result expressions, plus the parameters,
//! variables and types it needs. `InMemoryQuery` turns it into a chain of
//! executors and runs it over a set of candidates:
//!
//! ```text
//! candidates -> filter -> ordering -> result -> range
//! ```
//!
//! The result stage is either a projection evaluated per candidate or, when
//! any result expression calls an aggregate, a single row computed over all
//! filtered candidates.

use crate::access::{DetachedAccess, FieldAccess, Value};
use crate::catalog::{ClassInfo, TypeCatalog};
use crate::executor::{
    AggregateExecutor, CandidateScanExecutor, ExecutionContext, Executor, FilterExecutor,
    LimitExecutor, NullOrder, ProjectionExecutor, SortCriteria, SortExecutor, SortOrder,
};
use crate::expression::{Diagnostics, Expression, LogDiagnostics, DEFAULT_ALIAS};
use crate::invoke::{builtin_registry, MethodRegistry};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors in a query document.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Invalid range: from {from} is past to {to}")]
    InvalidRange { from: usize, to: usize },

    #[error("Invalid query document: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One ordering key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderingSpec {
    pub expr: Expression,
    #[serde(default)]
    pub descending: bool,
    /// None picks the default: nulls first ascending, last descending
    #[serde(default)]
    pub nulls_first: Option<bool>,
}

impl OrderingSpec {
    fn criteria(&self) -> SortCriteria {
        let order = if self.descending {
            SortOrder::Desc
        } else {
            SortOrder::Asc
        };
        match self.nulls_first {
            Some(true) => SortCriteria::with_null_order(self.expr.clone(), order, NullOrder::First),
            Some(false) => SortCriteria::with_null_order(self.expr.clone(), order, NullOrder::Last),
            None => SortCriteria::new(self.expr.clone(), order),
        }
    }
}

/// Result range, `from` inclusive and `to` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeSpec {
    #[serde(default)]
    pub from: usize,
    #[serde(default)]
    pub to: Option<usize>,
}

fn default_alias() -> String {
    DEFAULT_ALIAS.to_string()
}

/// Serializable description of a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryDocument {
    #[serde(default = "default_alias")]
    pub alias: String,
    #[serde(default)]
    pub filter: Option<Expression>,
    #[serde(default)]
    pub ordering: Vec<OrderingSpec>,
    #[serde(default)]
    pub range: Option<RangeSpec>,
    /// Empty means the candidates themselves
    #[serde(default)]
    pub result: Vec<Expression>,
    /// Parameter values as plain JSON
    #[serde(default)]
    pub parameters: HashMap<String, serde_json::Value>,
    /// Declared variable names
    #[serde(default)]
    pub variables: Vec<String>,
    #[serde(default)]
    pub classes: Vec<ClassInfo>,
    /// Import alias to fully qualified type name
    #[serde(default)]
    pub imports: HashMap<String, String>,
}

impl Default for QueryDocument {
    fn default() -> Self {
        Self {
            alias: default_alias(),
            filter: None,
            ordering: Vec::new(),
            range: None,
            result: Vec::new(),
            parameters: HashMap::new(),
            variables: Vec::new(),
            classes: Vec::new(),
            imports: HashMap::new(),
        }
    }
}

impl QueryDocument {
    /// Parse and validate a JSON document
    pub fn from_json(text: &str) -> Result<Self, QueryError> {
        let document: QueryDocument = serde_json::from_str(text)?;
        document.validate()?;
        Ok(document)
    }

    pub fn validate(&self) -> Result<(), QueryError> {
        if let Some(RangeSpec { from, to: Some(to) }) = self.range {
            if from > to {
                return Err(QueryError::InvalidRange { from, to });
            }
        }
        Ok(())
    }

    /// Type catalog holding the declared classes and imports
    pub fn catalog(&self) -> TypeCatalog {
        let mut catalog = TypeCatalog::new();
        for class in &self.classes {
            catalog.register(class.clone());
        }
        for (alias, type_name) in &self.imports {
            catalog.add_import(alias.as_str(), type_name.as_str());
        }
        catalog
    }

    fn parameter_values(&self) -> HashMap<String, Value> {
        self.parameters
            .iter()
            .map(|(name, json)| (name.clone(), Value::from_json(json)))
            .collect()
    }
}

/// A query ready to run over in-memory candidates.
pub struct InMemoryQuery {
    document: QueryDocument,
    registry: Arc<MethodRegistry>,
    field_access: Arc<dyn FieldAccess>,
    diagnostics: Arc<dyn Diagnostics>,
}

impl InMemoryQuery {
    pub fn new(document: QueryDocument) -> Self {
        Self {
            document,
            registry: builtin_registry(),
            field_access: Arc::new(DetachedAccess),
            diagnostics: Arc::new(LogDiagnostics),
        }
    }

    /// Use a registry with additional method evaluators
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

    fn context(&self) -> ExecutionContext {
        let mut context = ExecutionContext::new(Arc::new(self.document.catalog()));
        context.alias = self.document.alias.clone();
        context.parameters = self.document.parameter_values();
        context.variables = self.document.variables.clone();
        context.registry = Arc::clone(&self.registry);
        context.field_access = Arc::clone(&self.field_access);
        context.diagnostics = Arc::clone(&self.diagnostics);
        context
    }

    /// Build the executor chain for the given candidates
    fn create_executor(&self, candidates: Vec<Value>) -> Box<dyn Executor> {
        let document = &self.document;
        let context = self.context();

        let mut executor: Box<dyn Executor> = Box::new(CandidateScanExecutor::new(candidates));

        if let Some(filter) = &document.filter {
            executor = Box::new(FilterExecutor::new(executor, filter.clone(), context.clone()));
        }

        if !document.ordering.is_empty() {
            let criteria = document.ordering.iter().map(OrderingSpec::criteria).collect();
            executor = Box::new(SortExecutor::new(executor, criteria, context.clone()));
        }

        if document.result.iter().any(Expression::contains_aggregate) {
            executor = Box::new(AggregateExecutor::new(
                executor,
                document.result.clone(),
                context,
            ));
        } else if !document.result.is_empty() {
            executor = Box::new(ProjectionExecutor::new(
                executor,
                document.result.clone(),
                context,
            ));
        }

        if let Some(range) = document.range {
            executor = Box::new(LimitExecutor::range(executor, range.from, range.to));
        }

        executor
    }

    /// Run the query, collecting every result row
    pub fn execute(&self, candidates: Vec<Value>) -> Result<Vec<Value>> {
        self.document.validate()?;
        log::debug!(
            "executing query over {} candidates as {}",
            candidates.len(),
            self.document.alias
        );

        let mut executor = self.create_executor(candidates);
        executor.init()?;

        let mut results = Vec::new();
        while let Some(value) = executor.next()? {
            results.push(value);
        }
        log::debug!("query produced {} results", results.len());
        Ok(results)
    }
}
