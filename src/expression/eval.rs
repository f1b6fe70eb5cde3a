//! Stack machine evaluating one expression tree against one candidate.
//!
//! The walk is post-order: visiting a node visits its children, pops their
//! operands and pushes exactly one operand of its own. Subexpressions that
//! cannot be resolved for this candidate push [`Operand::Unresolved`] and
//! report a warning; contract violations abort with an [`EvalError`]; a
//! variable without a binding stops the walk with an
//! [`UnboundVariable`](crate::expression::UnboundVariable) so the caller
//! can enumerate it.

use crate::access::numeric::ArithmeticFault;
use crate::access::{compare_values, numeric, values_equal, Object, Value};
use crate::expression::context::EvaluationContext;
use crate::expression::diagnostics::Warning;
use crate::expression::operand::{Binding, Halt, Operand, Resolution, Step};
use crate::expression::pattern::full_match;
use crate::expression::{
    BinaryOperator, EvalError, EvalResult, Expression, Invocation, Literal, PrimaryPath,
    UnaryOperator,
};
use crate::invoke::{aggregate, AggregateKind};
use std::cmp::Ordering;
use std::sync::Arc;

pub struct Evaluator<'a> {
    ctx: &'a mut EvaluationContext,
    stack: Vec<Operand>,
}

impl<'a> Evaluator<'a> {
    pub fn new(ctx: &'a mut EvaluationContext) -> Self {
        Self {
            ctx,
            stack: Vec::new(),
        }
    }

    pub fn context(&self) -> &EvaluationContext {
        self.ctx
    }

    pub fn context_mut(&mut self) -> &mut EvaluationContext {
        self.ctx
    }

    /// Evaluate a whole expression.
    ///
    /// An unbound variable is not an error: it comes back as
    /// [`Resolution::Unbound`], carrying candidate values when known.
    pub fn evaluate(&mut self, expr: &Expression) -> EvalResult<Resolution> {
        let base = self.stack.len();
        match self.visit(expr) {
            Ok(()) => {
                let size = self.stack.len() - base;
                if size != 1 {
                    self.stack.truncate(base);
                    return Err(EvalError::StackImbalance { size });
                }
                let operand = self.stack.pop().ok_or(EvalError::StackUnderflow)?;
                Ok(Resolution::Resolved(operand))
            }
            Err(Halt::Unbound(unbound)) => {
                self.stack.truncate(base);
                Ok(Resolution::Unbound(unbound))
            }
            Err(Halt::Fatal(err)) => {
                self.stack.truncate(base);
                Err(err)
            }
        }
    }

    /// Visit a subexpression and take its operand off the stack
    pub fn operand(&mut self, expr: &Expression) -> Step<Operand> {
        self.visit(expr)?;
        self.pop()
    }

    /// Evaluate the argument of a membership method. A bare variable with
    /// no binding surfaces `candidates` as the values it could take.
    pub fn member_argument<F>(&mut self, expr: &Expression, candidates: F) -> Step<Operand>
    where
        F: FnOnce() -> Vec<Value>,
    {
        if let Expression::Variable(name) = expr {
            if let Binding::Unbound(unbound) = self.ctx.resolve_variable(name) {
                return Err(Halt::Unbound(unbound.with_candidates(candidates())));
            }
        }
        self.operand(expr)
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    /// Drop everything pushed above `depth`
    pub fn truncate_stack(&mut self, depth: usize) {
        self.stack.truncate(depth);
    }

    pub fn warn(&self, warning: Warning) {
        self.ctx.warn(warning);
    }

    fn pop(&mut self) -> Step<Operand> {
        self.stack
            .pop()
            .ok_or(Halt::Fatal(EvalError::StackUnderflow))
    }

    fn visit(&mut self, expr: &Expression) -> Step<()> {
        let operand = match expr {
            Expression::Literal(literal) => Operand::Value(literal.value.clone()),
            Expression::Parameter(name) => Operand::Value(self.ctx.parameter(name)),
            Expression::Variable(name) => match self.ctx.resolve_variable(name) {
                Binding::Bound(value) => Operand::Value(value),
                Binding::Unbound(unbound) => return Err(Halt::Unbound(unbound)),
            },
            Expression::Primary(path) => self.primary(path)?,
            Expression::BinaryOp { op, left, right } => self.binary(*op, left, right)?,
            Expression::UnaryOp { op, operand } => self.unary(*op, operand)?,
            Expression::Invoke(invocation) => self.invoke(invocation)?,
            Expression::Creator { type_name, args } => self.creator(type_name, args)?,
            Expression::Case {
                conditions,
                else_result,
            } => self.case(conditions, else_result.as_deref())?,
            Expression::Array(elements) => self.array(elements)?,
        };
        self.stack.push(operand);
        Ok(())
    }

    fn primary(&mut self, path: &PrimaryPath) -> Step<Operand> {
        let mut segments = path.segments.as_slice();
        let mut current = match &path.qualifier {
            Some(qualifier) => match self.qualifier(qualifier)? {
                Operand::Value(value) => value,
                Operand::Unresolved => return Ok(Operand::Unresolved),
            },
            None => {
                let root = match segments.first() {
                    Some(first) if first == self.ctx.alias() => {
                        segments = &segments[1..];
                        self.ctx.candidate().cloned()
                    }
                    Some(first) => match self.ctx.state(first) {
                        Some(value) => {
                            segments = &segments[1..];
                            Some(value.clone())
                        }
                        None => self.ctx.candidate().cloned(),
                    },
                    None => self.ctx.candidate().cloned(),
                };
                match root {
                    Some(value) => value,
                    None => {
                        self.warn(Warning::UnresolvedMember {
                            member: path.id(),
                            type_name: "no candidate".to_string(),
                        });
                        return Ok(Operand::Unresolved);
                    }
                }
            }
        };

        for segment in segments {
            current = match current {
                Value::Null => return Ok(Operand::Value(Value::Null)),
                Value::Object(object) => match self.member(&object, segment)? {
                    Some(value) => value,
                    None => {
                        self.warn(Warning::UnresolvedMember {
                            member: segment.clone(),
                            type_name: object.type_name().to_string(),
                        });
                        return Ok(Operand::Unresolved);
                    }
                },
                // Plain JSON objects arrive as maps keyed by field name
                Value::Map(entries) => {
                    let entry = entries
                        .into_iter()
                        .find(|(key, _)| key.as_str() == Some(segment.as_str()));
                    match entry {
                        Some((_, value)) => value,
                        None => {
                            self.warn(Warning::UnresolvedMember {
                                member: segment.clone(),
                                type_name: "Map".to_string(),
                            });
                            return Ok(Operand::Unresolved);
                        }
                    }
                }
                other => {
                    self.warn(Warning::UnresolvedMember {
                        member: segment.clone(),
                        type_name: other.describe_type().to_string(),
                    });
                    return Ok(Operand::Unresolved);
                }
            };
        }
        Ok(Operand::Value(current))
    }

    /// Root value of a qualified path
    fn qualifier(&mut self, qualifier: &Expression) -> Step<Operand> {
        match qualifier {
            Expression::BinaryOp {
                op: BinaryOperator::Cast,
                left,
                right,
            } => {
                let source = self.qualifier(left)?;
                let target = self.type_operand(right, BinaryOperator::Cast)?;
                match source {
                    Operand::Value(value)
                        if value.is_null() || self.ctx.catalog().is_instance(&value, &target) =>
                    {
                        Ok(Operand::Value(value))
                    }
                    Operand::Value(value) => {
                        self.warn(Warning::FailedCast {
                            found: value.describe_type().to_string(),
                            target,
                        });
                        Ok(Operand::Unresolved)
                    }
                    Operand::Unresolved => Ok(Operand::Unresolved),
                }
            }
            Expression::Variable(name) => match self.ctx.resolve_variable(name) {
                Binding::Bound(value) => Ok(Operand::Value(value)),
                Binding::Unbound(_) => {
                    self.warn(Warning::UnboundVariable { name: name.clone() });
                    Ok(Operand::Unresolved)
                }
            },
            other => self.operand(other),
        }
    }

    /// Member of an object: by stable field index when the object is
    /// managed, by name otherwise
    fn member(&self, object: &Object, name: &str) -> Step<Option<Value>> {
        let field_access = self.ctx.field_access();
        if let Some(index) = field_access.field_index(object, name) {
            let value = field_access
                .fetch_field(object, index)
                .map_err(EvalError::FieldLoad)?;
            return Ok(Some(value));
        }
        Ok(object.field(name).cloned())
    }

    /// Resolve the right operand of IS / IS NOT / CAST to a type name
    fn type_operand(&self, expr: &Expression, op: BinaryOperator) -> Step<String> {
        let name = match expr {
            Expression::Literal(Literal {
                value: Value::Type(name),
            }) => name.clone(),
            Expression::Primary(PrimaryPath {
                qualifier: None,
                segments,
            }) => segments.join("."),
            other => {
                return Err(EvalError::TypeOperandExpected {
                    operator: op.as_str(),
                    found: other.kind_name(),
                }
                .into())
            }
        };
        self.ctx
            .catalog()
            .resolve(&name)
            .ok_or_else(|| EvalError::UnknownType { name }.into())
    }

    fn binary(&mut self, op: BinaryOperator, left: &Expression, right: &Expression) -> Step<Operand> {
        match op {
            BinaryOperator::Cast => Err(EvalError::BareCast.into()),
            BinaryOperator::Is | BinaryOperator::IsNot => {
                let operand = self.operand(left)?;
                let target = self.type_operand(right, op)?;
                let is = match operand {
                    Operand::Value(value) => self.ctx.catalog().is_instance(&value, &target),
                    Operand::Unresolved => false,
                };
                Ok(Operand::from(is == (op == BinaryOperator::Is)))
            }
            _ => {
                self.visit(left)?;
                self.visit(right)?;
                let right = self.pop()?;
                let left = self.pop()?;
                self.dyadic(op, left, right)
            }
        }
    }

    fn dyadic(&self, op: BinaryOperator, left: Operand, right: Operand) -> Step<Operand> {
        match op {
            BinaryOperator::And => {
                if left.is_unresolved() || right.is_unresolved() {
                    return Ok(Operand::from(false));
                }
                let l = logical_operand(op, &left)?;
                let r = logical_operand(op, &right)?;
                Ok(Operand::from(l && r))
            }
            BinaryOperator::Or => {
                if left.is_true() || right.is_true() {
                    Ok(Operand::from(true))
                } else if left.is_unresolved() && right.is_unresolved() {
                    Ok(Operand::Unresolved)
                } else {
                    Ok(Operand::from(false))
                }
            }
            op if op.is_comparison() => match (left, right) {
                (Operand::Value(l), Operand::Value(r)) => Ok(compare(op, &l, &r)),
                _ => Ok(Operand::from(false)),
            },
            BinaryOperator::Like => like(left, right),
            op => match op.arithmetic() {
                Some(arithmetic) => self.arithmetic(op, arithmetic, left, right),
                None => Err(EvalError::UnsupportedOperator {
                    operator: op.as_str(),
                }
                .into()),
            },
        }
    }

    fn arithmetic(
        &self,
        op: BinaryOperator,
        arithmetic: numeric::Arithmetic,
        left: Operand,
        right: Operand,
    ) -> Step<Operand> {
        let (l, r) = match (left, right) {
            (Operand::Value(l), Operand::Value(r)) => (l, r),
            _ => return Ok(Operand::Unresolved),
        };
        if l.is_null() || r.is_null() {
            return Ok(Operand::Value(Value::Null));
        }
        if op == BinaryOperator::Add
            && (matches!(l, Value::String(_)) || matches!(r, Value::String(_)))
        {
            return Ok(Operand::Value(Value::String(format!("{}{}", l, r))));
        }
        for operand in [&l, &r] {
            if !operand.is_numeric() {
                return Err(EvalError::InvalidOperand {
                    operator: op.as_str(),
                    expected: "Number",
                    found: operand.describe_type().to_string(),
                }
                .into());
            }
        }
        let warning = match numeric::apply(arithmetic, &l, &r) {
            Ok(value) => return Ok(Operand::Value(value)),
            Err(ArithmeticFault::DivisionByZero) => Warning::DivisionByZero {
                operator: op.as_str(),
            },
            Err(ArithmeticFault::NonFinite) => Warning::NonFiniteOperand {
                operator: op.as_str(),
            },
        };
        self.warn(warning);
        Ok(Operand::Unresolved)
    }

    fn unary(&mut self, op: UnaryOperator, child: &Expression) -> Step<Operand> {
        match op {
            UnaryOperator::Neg => {
                if !negatable(child) {
                    return Err(EvalError::UnsupportedNegation {
                        shape: child.kind_name(),
                    }
                    .into());
                }
                match self.operand(child)? {
                    Operand::Value(Value::Null) => Ok(Operand::Value(Value::Null)),
                    Operand::Value(value) => match numeric::negate(&value) {
                        Some(negated) => Ok(Operand::Value(negated)),
                        None => Err(EvalError::NonNumericNegation {
                            type_name: value.describe_type().to_string(),
                        }
                        .into()),
                    },
                    Operand::Unresolved => Ok(Operand::Unresolved),
                }
            }
            UnaryOperator::Com => {
                if !matches!(child, Expression::Primary(_)) {
                    return Err(EvalError::UnsupportedComplement {
                        shape: child.kind_name(),
                    }
                    .into());
                }
                match self.operand(child)? {
                    Operand::Value(value) => Ok(Operand::Value(numeric::complement(&value))),
                    Operand::Unresolved => Ok(Operand::Unresolved),
                }
            }
            UnaryOperator::Not => match self.operand(child)? {
                Operand::Unresolved | Operand::Value(Value::Null) => Ok(Operand::from(false)),
                Operand::Value(Value::Boolean(b)) => Ok(Operand::from(!b)),
                Operand::Value(other) => Err(EvalError::InvalidOperand {
                    operator: op.as_str(),
                    expected: "Boolean",
                    found: other.describe_type().to_string(),
                }
                .into()),
            },
            UnaryOperator::Distinct => Err(EvalError::UnsupportedOperator {
                operator: op.as_str(),
            }
            .into()),
        }
    }

    fn invoke(&mut self, invocation: &Invocation) -> Step<Operand> {
        let registry = Arc::clone(self.ctx.registry());
        let catalog = Arc::clone(self.ctx.catalog());

        let receiver_expr = match &invocation.receiver {
            Some(receiver) => receiver,
            None => {
                if let Some(kind) = AggregateKind::from_name(&invocation.method) {
                    if let [argument] = invocation.args.as_slice() {
                        return aggregate::evaluate(kind, argument, self);
                    }
                }
                return match registry.lookup(None, &invocation.method, &catalog) {
                    Some(evaluator) => evaluator.evaluate(invocation, &Value::Null, self),
                    None => {
                        self.warn(Warning::UnsupportedMethod {
                            receiver: None,
                            method: invocation.method.clone(),
                        });
                        Ok(Operand::Unresolved)
                    }
                };
            }
        };

        let receiver = match self.operand(receiver_expr)? {
            Operand::Value(value) => value,
            Operand::Unresolved => return Ok(Operand::Unresolved),
        };
        let type_name = match &receiver {
            Value::Null => invocation
                .receiver_type
                .as_deref()
                .map(|declared| catalog.resolve(declared).unwrap_or_else(|| declared.to_string())),
            value => value.type_name().map(str::to_string),
        };
        let evaluator = match type_name.as_deref() {
            Some(t) => registry.lookup(Some(t), &invocation.method, &catalog),
            // An untyped null still gets the method's fixed default
            None => registry.lookup_by_name(&invocation.method),
        };

        match evaluator {
            Some(evaluator) if receiver.is_null() => {
                Ok(Operand::Value(evaluator.null_receiver_default()))
            }
            Some(evaluator) => evaluator.evaluate(invocation, &receiver, self),
            None => {
                self.warn(Warning::UnsupportedMethod {
                    receiver: Some(type_name.unwrap_or_else(|| "null".to_string())),
                    method: invocation.method.clone(),
                });
                Ok(Operand::Unresolved)
            }
        }
    }

    fn creator(&mut self, type_name: &str, args: &[Expression]) -> Step<Operand> {
        for arg in args {
            self.visit(arg)?;
        }
        let operands = self.stack.split_off(self.stack.len() - args.len());
        let mut values = Vec::with_capacity(operands.len());
        for operand in operands {
            match operand {
                Operand::Value(value) => values.push(value),
                Operand::Unresolved => return Ok(Operand::Unresolved),
            }
        }

        let catalog = self.ctx.catalog();
        let resolved = catalog.resolve(type_name).ok_or_else(|| EvalError::UnknownType {
            name: type_name.to_string(),
        })?;
        match catalog.construct(&resolved, &values) {
            Some(instance) => Ok(Operand::Value(instance)),
            None => Err(EvalError::NoMatchingConstructor {
                type_name: resolved,
                arguments: values
                    .iter()
                    .map(|v| v.describe_type())
                    .collect::<Vec<_>>()
                    .join(", "),
            }
            .into()),
        }
    }

    fn case(
        &mut self,
        conditions: &[(Expression, Expression)],
        else_result: Option<&Expression>,
    ) -> Step<Operand> {
        for (condition, result) in conditions {
            match self.operand(condition)? {
                Operand::Value(Value::Boolean(true)) => return self.operand(result),
                Operand::Value(Value::Boolean(false)) => continue,
                other => {
                    self.warn(Warning::NonBooleanCaseCondition {
                        found: other.describe_type().to_string(),
                    });
                    return Ok(Operand::Unresolved);
                }
            }
        }
        match else_result {
            Some(expr) => self.operand(expr),
            None => Ok(Operand::Value(Value::Null)),
        }
    }

    fn array(&mut self, elements: &[Expression]) -> Step<Operand> {
        let mut values = Vec::with_capacity(elements.len());
        for element in elements {
            if !matches!(
                element,
                Expression::Literal(_) | Expression::Primary(_) | Expression::Parameter(_)
            ) {
                self.warn(Warning::UnsupportedArrayElement {
                    kind: element.kind_name(),
                });
                return Ok(Operand::Unresolved);
            }
            match self.operand(element)? {
                Operand::Value(value) => values.push(value),
                Operand::Unresolved => return Ok(Operand::Unresolved),
            }
        }
        Ok(Operand::Value(Value::Array(values)))
    }
}

/// A PrimaryPath, or negations of one
fn negatable(expr: &Expression) -> bool {
    match expr {
        Expression::Primary(_) => true,
        Expression::UnaryOp {
            op: UnaryOperator::Neg,
            operand,
        } => negatable(operand),
        _ => false,
    }
}

fn logical_operand(op: BinaryOperator, operand: &Operand) -> Step<bool> {
    match operand {
        Operand::Value(Value::Boolean(b)) => Ok(*b),
        Operand::Value(Value::Null) | Operand::Unresolved => Ok(false),
        Operand::Value(other) => Err(EvalError::InvalidOperand {
            operator: op.as_str(),
            expected: "Boolean",
            found: other.describe_type().to_string(),
        }
        .into()),
    }
}

fn compare(op: BinaryOperator, left: &Value, right: &Value) -> Operand {
    match op {
        BinaryOperator::Eq => Operand::from(values_equal(left, right)),
        BinaryOperator::Ne => Operand::from(!values_equal(left, right)),
        _ => {
            if left.is_null() || right.is_null() {
                return Operand::Unresolved;
            }
            let Some(ordering) = compare_values(left, right) else {
                return Operand::Unresolved;
            };
            let result = match op {
                BinaryOperator::Lt => ordering == Ordering::Less,
                BinaryOperator::Le => ordering != Ordering::Greater,
                BinaryOperator::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            };
            Operand::from(result)
        }
    }
}

fn like(left: Operand, right: Operand) -> Step<Operand> {
    let (text, pattern) = match (left, right) {
        (Operand::Value(l), Operand::Value(r)) => (l, r),
        _ => return Ok(Operand::from(false)),
    };
    let text = match text {
        Value::Null => return Ok(Operand::from(false)),
        Value::String(s) => s,
        other => {
            return Err(EvalError::LikeOperand {
                found: other.describe_type().to_string(),
            }
            .into())
        }
    };
    let pattern = match pattern {
        Value::String(p) => p,
        other => {
            return Err(EvalError::InvalidOperand {
                operator: BinaryOperator::Like.as_str(),
                expected: "String",
                found: other.describe_type().to_string(),
            }
            .into())
        }
    };
    Ok(Operand::from(full_match(&pattern, &text)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{FieldAccess, ObjectStore};
    use crate::catalog::{ClassInfo, ConstructorInfo, ParamInfo, TypeCatalog};
    use crate::expression::{CollectingDiagnostics, UnboundVariable};
    use pretty_assertions::assert_eq;

    fn catalog() -> TypeCatalog {
        let mut catalog = TypeCatalog::new();
        catalog.register(ClassInfo::new("org.acme.Person"));
        catalog.register(ClassInfo::new("org.acme.Manager").extends("org.acme.Person"));
        catalog.register(ClassInfo::new("org.acme.Address"));
        catalog.register(
            ClassInfo::new("org.acme.Summary").with_constructor(ConstructorInfo::new(vec![
                ParamInfo::new("name", "String"),
                ParamInfo::new("age", "Integer"),
            ])),
        );
        catalog
    }

    fn person(name: &str, age: Value) -> Value {
        Object::new("org.acme.Person")
            .with_field("name", name)
            .with_field("age", age)
            .with_field(
                "address",
                Object::new("org.acme.Address").with_field("city", "Leeds"),
            )
            .with_field("boss", Value::Null)
            .into()
    }

    fn context(candidate: Value) -> (EvaluationContext, Arc<CollectingDiagnostics>) {
        let diagnostics = Arc::new(CollectingDiagnostics::new());
        let mut ctx =
            EvaluationContext::new(Arc::new(catalog())).with_diagnostics(diagnostics.clone());
        ctx.set_candidate(candidate);
        (ctx, diagnostics)
    }

    fn eval(ctx: &mut EvaluationContext, expr: &Expression) -> EvalResult<Operand> {
        Ok(Evaluator::new(ctx).evaluate(expr)?.into_operand())
    }

    fn value(v: impl Into<Value>) -> Operand {
        Operand::Value(v.into())
    }

    #[test]
    fn test_literals_and_parameters() -> EvalResult<()> {
        let (mut ctx, _) = context(person("Smith", Value::Int(30)));
        ctx.set_parameter("minAge", Value::Int(18));

        assert_eq!(eval(&mut ctx, &Expression::literal(7))?, value(7));
        assert_eq!(eval(&mut ctx, &Expression::parameter("minAge"))?, value(18));
        assert_eq!(
            eval(&mut ctx, &Expression::parameter("missing"))?,
            Operand::Value(Value::Null)
        );
        Ok(())
    }

    #[test]
    fn test_path_navigation() -> EvalResult<()> {
        let (mut ctx, diagnostics) = context(person("Smith", Value::Int(30)));

        assert_eq!(eval(&mut ctx, &Expression::path("name"))?, value("Smith"));
        assert_eq!(eval(&mut ctx, &Expression::path("this.name"))?, value("Smith"));
        assert_eq!(
            eval(&mut ctx, &Expression::path("address.city"))?,
            value("Leeds")
        );
        // A null link short-circuits the rest of the path
        assert_eq!(
            eval(&mut ctx, &Expression::path("boss.address.city"))?,
            Operand::Value(Value::Null)
        );
        assert!(diagnostics.warnings().is_empty());

        assert_eq!(
            eval(&mut ctx, &Expression::path("salary"))?,
            Operand::Unresolved
        );
        assert_eq!(
            diagnostics.take(),
            vec![Warning::UnresolvedMember {
                member: "salary".to_string(),
                type_name: "org.acme.Person".to_string(),
            }]
        );
        Ok(())
    }

    #[test]
    fn test_map_entries_as_members() -> EvalResult<()> {
        let json = serde_json::json!({"name": "Smith", "address": {"city": "Leeds"}, "age": null});
        let (mut ctx, diagnostics) = context(Value::from_json(&json));

        assert_eq!(eval(&mut ctx, &Expression::path("name"))?, value("Smith"));
        assert_eq!(
            eval(&mut ctx, &Expression::path("this.address.city"))?,
            value("Leeds")
        );
        assert_eq!(
            eval(&mut ctx, &Expression::path("age"))?,
            Operand::Value(Value::Null)
        );
        assert!(diagnostics.warnings().is_empty());

        assert_eq!(
            eval(&mut ctx, &Expression::path("salary"))?,
            Operand::Unresolved
        );
        assert_eq!(
            diagnostics.take(),
            vec![Warning::UnresolvedMember {
                member: "salary".to_string(),
                type_name: "Map".to_string(),
            }]
        );
        Ok(())
    }

    #[test]
    fn test_state_value_as_root() -> EvalResult<()> {
        let (mut ctx, _) = context(person("Smith", Value::Int(30)));
        ctx.set_state("other", person("Jones", Value::Int(40)));
        assert_eq!(eval(&mut ctx, &Expression::path("other.name"))?, value("Jones"));
        match eval(&mut ctx, &Expression::variable("other"))? {
            Operand::Value(Value::Object(other)) => {
                assert_eq!(other.field("name"), Some(&Value::string("Jones")));
            }
            other => panic!("expected object, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_and_or_asymmetry() -> EvalResult<()> {
        let (mut ctx, _) = context(person("Smith", Value::Int(30)));
        let unresolved = Expression::path("salary");
        let truth = Expression::literal(true);

        assert_eq!(
            eval(&mut ctx, &Expression::and(unresolved.clone(), truth.clone()))?,
            value(false)
        );
        assert_eq!(
            eval(&mut ctx, &Expression::or(unresolved.clone(), truth.clone()))?,
            value(true)
        );
        assert_eq!(
            eval(
                &mut ctx,
                &Expression::or(unresolved.clone(), Expression::literal(false))
            )?,
            value(false)
        );
        assert_eq!(
            eval(&mut ctx, &Expression::or(unresolved.clone(), unresolved))?,
            Operand::Unresolved
        );
        Ok(())
    }

    #[test]
    fn test_and_rejects_non_boolean() {
        let (mut ctx, _) = context(person("Smith", Value::Int(30)));
        let result = eval(
            &mut ctx,
            &Expression::and(Expression::path("name"), Expression::literal(true)),
        );
        assert!(matches!(result, Err(EvalError::InvalidOperand { .. })));
    }

    #[test]
    fn test_comparisons() -> EvalResult<()> {
        let (mut ctx, _) = context(person("Smith", Value::Int(30)));

        let ge = Expression::ge(Expression::path("age"), Expression::literal(Value::Long(18)));
        assert_eq!(eval(&mut ctx, &ge)?, value(true));

        let eq = Expression::eq(Expression::path("age"), Expression::literal(Value::Byte(30)));
        assert_eq!(eval(&mut ctx, &eq)?, value(true));

        let eq_null = Expression::eq(Expression::path("boss"), Expression::null());
        assert_eq!(eval(&mut ctx, &eq_null)?, value(true));

        let ne_null = Expression::ne(Expression::path("name"), Expression::null());
        assert_eq!(eval(&mut ctx, &ne_null)?, value(true));

        let lt_null = Expression::lt(Expression::path("boss"), Expression::literal(1));
        assert_eq!(eval(&mut ctx, &lt_null)?, Operand::Unresolved);

        let incomparable = Expression::lt(Expression::path("name"), Expression::literal(1));
        assert_eq!(eval(&mut ctx, &incomparable)?, Operand::Unresolved);

        let unresolved = Expression::eq(Expression::path("salary"), Expression::literal(1));
        assert_eq!(eval(&mut ctx, &unresolved)?, value(false));
        Ok(())
    }

    #[test]
    fn test_like() -> EvalResult<()> {
        let (mut ctx, _) = context(person("Smith", Value::Int(30)));

        let like = Expression::like(Expression::path("name"), Expression::literal("Sm.*"));
        assert_eq!(eval(&mut ctx, &like)?, value(true));

        let partial = Expression::like(Expression::path("name"), Expression::literal("mit"));
        assert_eq!(eval(&mut ctx, &partial)?, value(false));

        let null_left = Expression::like(Expression::path("boss"), Expression::literal(".*"));
        assert_eq!(eval(&mut ctx, &null_left)?, value(false));

        let not_text = Expression::like(Expression::path("age"), Expression::literal(".*"));
        assert!(matches!(
            eval(&mut ctx, &not_text),
            Err(EvalError::LikeOperand { .. })
        ));

        let bad_pattern = Expression::like(Expression::path("name"), Expression::literal("(x"));
        assert!(matches!(
            eval(&mut ctx, &bad_pattern),
            Err(EvalError::InvalidPattern { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_instanceof() -> EvalResult<()> {
        let (mut ctx, _) = context(person("Smith", Value::Int(30)));

        let is_person = Expression::is_type(Expression::path("this"), "Person");
        assert_eq!(eval(&mut ctx, &is_person)?, value(true));

        let is_manager = Expression::is_type(Expression::path("this"), "Manager");
        assert_eq!(eval(&mut ctx, &is_manager)?, value(false));

        let null_is = Expression::is_type(Expression::path("boss"), "Person");
        assert_eq!(eval(&mut ctx, &null_is)?, value(false));

        let not_is = Expression::binary_op(
            BinaryOperator::IsNot,
            Expression::path("salary"),
            Expression::path("Person"),
        );
        assert_eq!(eval(&mut ctx, &not_is)?, value(true));

        let bad = Expression::is_type(Expression::path("this"), "Unknown");
        assert!(matches!(eval(&mut ctx, &bad), Err(EvalError::UnknownType { .. })));

        let not_a_type = Expression::binary_op(
            BinaryOperator::Is,
            Expression::path("this"),
            Expression::literal(1),
        );
        assert!(matches!(
            eval(&mut ctx, &not_a_type),
            Err(EvalError::TypeOperandExpected { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_cast_qualifier() -> EvalResult<()> {
        let manager: Value = Object::new("org.acme.Manager")
            .with_field("name", "Jones")
            .with_field("salary", Value::Long(100))
            .into();
        let (mut ctx, diagnostics) = context(manager);

        let up = Expression::cast_path(Expression::path("this"), "Person", &["name"]);
        assert_eq!(eval(&mut ctx, &up)?, value("Jones"));

        ctx.set_candidate(person("Smith", Value::Int(30)));
        let down = Expression::cast_path(Expression::path("this"), "Manager", &["salary"]);
        assert_eq!(eval(&mut ctx, &down)?, Operand::Unresolved);
        assert_eq!(
            diagnostics.take(),
            vec![Warning::FailedCast {
                found: "org.acme.Person".to_string(),
                target: "org.acme.Manager".to_string(),
            }]
        );

        let bare = Expression::binary_op(
            BinaryOperator::Cast,
            Expression::path("this"),
            Expression::type_ref("Person"),
        );
        assert!(matches!(eval(&mut ctx, &bare), Err(EvalError::BareCast)));
        Ok(())
    }

    #[test]
    fn test_arithmetic() -> EvalResult<()> {
        let (mut ctx, diagnostics) = context(person("Smith", Value::Int(30)));

        let greeting = Expression::add_expr(Expression::literal("Mr. "), Expression::path("name"));
        assert_eq!(eval(&mut ctx, &greeting)?, value("Mr. Smith"));

        let left_text = Expression::add_expr(Expression::literal(""), Expression::literal(5));
        assert_eq!(eval(&mut ctx, &left_text)?, value("5"));
        let right_text = Expression::add_expr(Expression::literal(5), Expression::literal(""));
        assert_eq!(eval(&mut ctx, &right_text)?, value("5"));

        let exact = Expression::add_expr(
            Expression::literal(Value::Double(0.1)),
            Expression::literal(Value::Double(0.2)),
        );
        assert_eq!(
            eval(&mut ctx, &exact)?.into_value(),
            Value::decimal("0.3")
        );

        let with_null = Expression::mul_expr(Expression::path("boss"), Expression::literal(2));
        assert_eq!(eval(&mut ctx, &with_null)?, Operand::Value(Value::Null));

        let by_zero = Expression::div_expr(Expression::path("age"), Expression::literal(0));
        assert_eq!(eval(&mut ctx, &by_zero)?, Operand::Unresolved);
        assert_eq!(
            diagnostics.take(),
            vec![Warning::DivisionByZero { operator: "/" }]
        );

        let overflowed = Expression::add_expr(
            Expression::literal(Value::Double(f64::INFINITY)),
            Expression::literal(1),
        );
        assert_eq!(eval(&mut ctx, &overflowed)?, Operand::Unresolved);
        assert_eq!(
            diagnostics.take(),
            vec![Warning::NonFiniteOperand { operator: "+" }]
        );

        let bad = Expression::sub_expr(Expression::path("name"), Expression::literal(1));
        assert!(matches!(
            eval(&mut ctx, &bad),
            Err(EvalError::InvalidOperand { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_negation_and_complement() -> EvalResult<()> {
        let (mut ctx, _) = context(person("Smith", Value::Int(30)));

        assert_eq!(eval(&mut ctx, &Expression::neg(Expression::path("age")))?, value(-30));
        assert_eq!(
            eval(&mut ctx, &Expression::neg(Expression::neg(Expression::path("age"))))?,
            value(30)
        );
        assert_eq!(
            eval(&mut ctx, &Expression::neg(Expression::path("boss")))?,
            Operand::Value(Value::Null)
        );
        assert!(matches!(
            eval(&mut ctx, &Expression::neg(Expression::literal(1))),
            Err(EvalError::UnsupportedNegation { shape: "literal" })
        ));
        assert!(matches!(
            eval(&mut ctx, &Expression::neg(Expression::path("name"))),
            Err(EvalError::NonNumericNegation { .. })
        ));

        let com = Expression::unary_op(UnaryOperator::Com, Expression::path("age"));
        assert_eq!(eval(&mut ctx, &com)?, value(!30));
        let com_text = Expression::unary_op(UnaryOperator::Com, Expression::path("name"));
        assert_eq!(eval(&mut ctx, &com_text)?, value(-1));
        let com_literal = Expression::unary_op(UnaryOperator::Com, Expression::literal(1));
        assert!(matches!(
            eval(&mut ctx, &com_literal),
            Err(EvalError::UnsupportedComplement { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_not() -> EvalResult<()> {
        let (mut ctx, _) = context(person("Smith", Value::Int(30)));
        assert_eq!(
            eval(&mut ctx, &Expression::not_expr(Expression::literal(false)))?,
            value(true)
        );
        assert_eq!(
            eval(&mut ctx, &Expression::not_expr(Expression::path("salary")))?,
            value(false)
        );
        assert_eq!(
            eval(&mut ctx, &Expression::not_expr(Expression::path("boss")))?,
            value(false)
        );
        assert!(eval(&mut ctx, &Expression::not_expr(Expression::literal(1))).is_err());
        assert!(matches!(
            eval(&mut ctx, &Expression::distinct(Expression::path("age"))),
            Err(EvalError::UnsupportedOperator { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_creator() -> EvalResult<()> {
        let (mut ctx, _) = context(person("Smith", Value::Int(30)));

        let summary = Expression::creator(
            "Summary",
            vec![Expression::path("name"), Expression::path("age")],
        );
        match eval(&mut ctx, &summary)? {
            Operand::Value(Value::Object(instance)) => {
                assert_eq!(instance.type_name(), "org.acme.Summary");
                assert_eq!(instance.field("name"), Some(&Value::string("Smith")));
                assert_eq!(instance.field("age"), Some(&Value::Int(30)));
            }
            other => panic!("expected object, got {:?}", other),
        }

        let unresolved = Expression::creator(
            "Summary",
            vec![Expression::path("name"), Expression::path("salary")],
        );
        assert_eq!(eval(&mut ctx, &unresolved)?, Operand::Unresolved);

        let unknown = Expression::creator("Nope", vec![]);
        assert!(matches!(
            eval(&mut ctx, &unknown),
            Err(EvalError::UnknownType { .. })
        ));

        let mismatched = Expression::creator("Summary", vec![Expression::path("name")]);
        assert!(matches!(
            eval(&mut ctx, &mismatched),
            Err(EvalError::NoMatchingConstructor { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_case() -> EvalResult<()> {
        let (mut ctx, diagnostics) = context(person("Smith", Value::Int(30)));

        let case = Expression::case(
            vec![
                (
                    Expression::lt(Expression::path("age"), Expression::literal(18)),
                    Expression::literal("minor"),
                ),
                (
                    Expression::ge(Expression::path("age"), Expression::literal(18)),
                    Expression::literal("adult"),
                ),
            ],
            None,
        );
        assert_eq!(eval(&mut ctx, &case)?, value("adult"));

        let fallthrough = Expression::case(
            vec![(Expression::literal(false), Expression::literal(1))],
            Some(Expression::literal(2)),
        );
        assert_eq!(eval(&mut ctx, &fallthrough)?, value(2));

        let no_else = Expression::case(
            vec![(Expression::literal(false), Expression::literal(1))],
            None,
        );
        assert_eq!(eval(&mut ctx, &no_else)?, Operand::Value(Value::Null));

        let non_boolean = Expression::case(
            vec![(Expression::path("boss"), Expression::literal(1))],
            Some(Expression::literal(2)),
        );
        assert_eq!(eval(&mut ctx, &non_boolean)?, Operand::Unresolved);
        assert_eq!(
            diagnostics.take(),
            vec![Warning::NonBooleanCaseCondition {
                found: "null".to_string()
            }]
        );
        Ok(())
    }

    #[test]
    fn test_array_literal() -> EvalResult<()> {
        let (mut ctx, _) = context(person("Smith", Value::Int(30)));

        let array = Expression::Array(vec![
            Expression::literal(1),
            Expression::path("name"),
            Expression::parameter("p"),
        ]);
        assert_eq!(
            eval(&mut ctx, &array)?,
            Operand::Value(Value::Array(vec![
                Value::Int(1),
                Value::string("Smith"),
                Value::Null
            ]))
        );

        let nested = Expression::Array(vec![Expression::add_expr(
            Expression::literal(1),
            Expression::literal(2),
        )]);
        assert_eq!(eval(&mut ctx, &nested)?, Operand::Unresolved);

        let unresolved = Expression::Array(vec![Expression::path("salary")]);
        assert_eq!(eval(&mut ctx, &unresolved)?, Operand::Unresolved);
        Ok(())
    }

    #[test]
    fn test_unbound_variable() -> EvalResult<()> {
        let (mut ctx, diagnostics) = context(person("Smith", Value::Int(30)));

        let bare = Expression::eq(Expression::variable("v"), Expression::literal(1));
        let resolution = Evaluator::new(&mut ctx).evaluate(&bare)?;
        assert_eq!(resolution, Resolution::Unbound(UnboundVariable::new("v")));

        // Through a path the variable degrades to unresolved
        let path = Expression::qualified(Expression::variable("v"), &["name"]);
        assert_eq!(eval(&mut ctx, &path)?, Operand::Unresolved);
        assert_eq!(
            diagnostics.take(),
            vec![Warning::UnboundVariable {
                name: "v".to_string()
            }]
        );

        ctx.set_variable("v", person("Jones", Value::Int(40)));
        assert_eq!(eval(&mut ctx, &path)?, value("Jones"));
        Ok(())
    }

    #[test]
    fn test_stack_is_balanced_after_halt() -> EvalResult<()> {
        let (mut ctx, _) = context(person("Smith", Value::Int(30)));
        let mut evaluator = Evaluator::new(&mut ctx);

        let expr = Expression::add_expr(Expression::literal(1), Expression::variable("v"));
        assert!(matches!(evaluator.evaluate(&expr)?, Resolution::Unbound(_)));
        assert_eq!(evaluator.stack_depth(), 0);

        let bad = Expression::add_expr(Expression::literal(1), Expression::literal(true));
        assert!(evaluator.evaluate(&bad).is_err());
        assert_eq!(evaluator.stack_depth(), 0);
        Ok(())
    }

    #[test]
    fn test_managed_object_loads_by_index() -> EvalResult<()> {
        let mut store = ObjectStore::new();
        store.define_layout("org.acme.Person", vec!["name".to_string(), "age".to_string()]);
        store
            .put(
                "org.acme.Person",
                &Value::Long(7),
                vec![Value::string("Stored"), Value::Int(51)],
            )
            .map_err(EvalError::FieldLoad)?;
        let store = Arc::new(store);

        let hollow: Value = Object::managed("org.acme.Person", Value::Long(7)).into();
        let (ctx, _) = context(hollow);
        let mut ctx = ctx.with_field_access(store.clone() as Arc<dyn FieldAccess>);

        assert_eq!(eval(&mut ctx, &Expression::path("age"))?, value(51));
        assert_eq!(store.load_count(), 1);
        Ok(())
    }

    #[test]
    fn test_field_load_failure_is_fatal() {
        let mut store = ObjectStore::new();
        store.define_layout("org.acme.Person", vec!["name".to_string()]);

        let hollow: Value = Object::managed("org.acme.Person", Value::Long(8)).into();
        let (ctx, _) = context(hollow);
        let mut ctx = ctx.with_field_access(Arc::new(store) as Arc<dyn FieldAccess>);

        let result = eval(&mut ctx, &Expression::path("name"));
        assert!(matches!(result, Err(EvalError::FieldLoad(_))));
    }
}
