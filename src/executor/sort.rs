//! Sort executor implementation.
//!
//! This executor sorts candidates from a child executor based on one or
//! more ordering expressions. It materializes all candidates from the child
//! executor into memory, evaluates the ordering keys once per candidate,
//! then returns them in sorted order.
//!
//! Supports:
//! - Multi-key ordering (ORDER BY a ASC, b DESC)
//! - NULL handling (NULLs first or last); unresolved keys sort as NULL
//! - Keys of different kinds: numbers, then text, then booleans, then the rest
//! - Stable order for equal keys

use crate::access::{compare_values, numeric, Value};
use crate::executor::{evaluate_value, ExecutionContext, Executor};
use crate::expression::Expression;
use anyhow::{bail, Result};
use std::cmp::Ordering;

/// Sort order for a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// NULL ordering preference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullOrder {
    First,
    Last,
}

/// Sort criteria for a single ordering expression
#[derive(Debug, Clone)]
pub struct SortCriteria {
    pub expr: Expression,
    /// Sort order (ASC/DESC)
    pub order: SortOrder,
    /// NULL ordering (FIRST/LAST)
    pub null_order: NullOrder,
}

impl SortCriteria {
    /// Create new sort criteria with default NULL ordering
    /// (NULLs first for ASC, NULLs last for DESC)
    pub fn new(expr: Expression, order: SortOrder) -> Self {
        let null_order = match order {
            SortOrder::Asc => NullOrder::First,
            SortOrder::Desc => NullOrder::Last,
        };
        Self {
            expr,
            order,
            null_order,
        }
    }

    /// Create new sort criteria with explicit NULL ordering
    pub fn with_null_order(expr: Expression, order: SortOrder, null_order: NullOrder) -> Self {
        Self {
            expr,
            order,
            null_order,
        }
    }
}

/// Rank of a key's kind, so that keys of different kinds still order totally
fn kind_rank(value: &Value) -> u8 {
    match value {
        value if value.is_numeric() => 0,
        Value::Char(_) | Value::String(_) => 1,
        Value::Boolean(_) => 2,
        Value::Type(_) => 3,
        Value::Object(_) => 4,
        Value::Array(_) | Value::List(_) | Value::Set(_) => 5,
        Value::Map(_) => 6,
        _ => 7,
    }
}

/// Numbers by magnitude, infinities at the ends and NaN after everything
fn numeric_order(k1: &Value, k2: &Value) -> Ordering {
    if let Some(cmp) = numeric::compare(k1, k2) {
        return cmp;
    }
    let x = numeric::to_f64(k1).unwrap_or(f64::NAN);
    let y = numeric::to_f64(k2).unwrap_or(f64::NAN);
    match (x.is_nan(), y.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
    }
}

/// Total order over non-null keys
fn total_order(k1: &Value, k2: &Value) -> Ordering {
    match kind_rank(k1).cmp(&kind_rank(k2)) {
        Ordering::Equal if kind_rank(k1) == 0 => numeric_order(k1, k2),
        // Objects, collections and maps have no order among themselves
        Ordering::Equal => compare_values(k1, k2).unwrap_or(Ordering::Equal),
        by_kind => by_kind,
    }
}

/// Executor that sorts candidates based on multiple criteria
pub struct SortExecutor {
    /// Child executor that produces candidates
    child: Box<dyn Executor>,
    /// Sort criteria (in order of precedence)
    criteria: Vec<SortCriteria>,
    context: ExecutionContext,
    /// Materialized and sorted candidates
    sorted: Vec<Value>,
    /// Current position in sorted
    current_position: usize,
    /// Whether the executor has been initialized
    initialized: bool,
}

impl SortExecutor {
    /// Create a new sort executor
    ///
    /// # Arguments
    /// * `child` - The child executor that produces candidates
    /// * `criteria` - Sort criteria in order of precedence
    /// * `context` - Shared execution resources
    pub fn new(
        child: Box<dyn Executor>,
        criteria: Vec<SortCriteria>,
        context: ExecutionContext,
    ) -> Self {
        Self {
            child,
            criteria,
            context,
            sorted: Vec::new(),
            current_position: 0,
            initialized: false,
        }
    }

    /// Compare two keys according to sort order and null handling
    fn compare_keys(k1: &Value, k2: &Value, order: SortOrder, null_order: NullOrder) -> Ordering {
        match (k1, k2) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => match null_order {
                NullOrder::First => Ordering::Less,
                NullOrder::Last => Ordering::Greater,
            },
            (_, Value::Null) => match null_order {
                NullOrder::First => Ordering::Greater,
                NullOrder::Last => Ordering::Less,
            },
            (k1, k2) => {
                let cmp = total_order(k1, k2);
                match order {
                    SortOrder::Asc => cmp,
                    SortOrder::Desc => cmp.reverse(),
                }
            }
        }
    }

    /// Materialize the child and sort by the evaluated keys
    fn sort_candidates(&mut self) -> Result<()> {
        let mut ctx = self.context.evaluation_context();
        let mut keyed: Vec<(Vec<Value>, Value)> = Vec::new();

        while let Some(candidate) = self.child.next()? {
            ctx.set_candidate(candidate.clone());
            let keys = self
                .criteria
                .iter()
                .map(|criteria| evaluate_value(&mut ctx, &criteria.expr))
                .collect::<Result<Vec<_>>>()?;
            keyed.push((keys, candidate));
        }

        // sort_by is stable
        keyed.sort_by(|a, b| {
            for (i, criteria) in self.criteria.iter().enumerate() {
                let cmp = Self::compare_keys(&a.0[i], &b.0[i], criteria.order, criteria.null_order);
                if cmp != Ordering::Equal {
                    return cmp;
                }
            }
            Ordering::Equal
        });

        self.sorted = keyed.into_iter().map(|(_, candidate)| candidate).collect();
        Ok(())
    }
}

impl Executor for SortExecutor {
    fn init(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }

        // Initialize child executor
        self.child.init()?;

        self.sort_candidates()?;
        self.current_position = 0;
        self.initialized = true;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Value>> {
        if !self.initialized {
            bail!("Executor not initialized. Call init() first.");
        }

        let candidate = self.sorted.get(self.current_position).cloned();
        if candidate.is_some() {
            self.current_position += 1;
        }
        Ok(candidate)
    }
}
