use anyhow::Result;
use memquery::access::{Object, ObjectStore, Value};
use memquery::catalog::{ClassInfo, TypeCatalog};
use memquery::expression::{
    CollectingDiagnostics, EvaluationContext, Evaluator, Expression, Invocation, Operand, Step,
    Warning,
};
use memquery::invoke::{MethodEvaluator, MethodRegistry};
use memquery::query::{InMemoryQuery, OrderingSpec, QueryDocument, RangeSpec};
use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

fn person(name: &str, age: Value) -> Value {
    Object::new("org.acme.Person")
        .with_field("name", name)
        .with_field("age", age)
        .into()
}

fn names(results: &[Value]) -> Vec<String> {
    results.iter().map(Value::to_string).collect()
}

#[test]
fn test_adults_exclude_null_age() -> Result<()> {
    let document = QueryDocument {
        filter: Some(Expression::ge(
            Expression::path("age"),
            Expression::literal(18),
        )),
        result: vec![Expression::path("name")],
        ..QueryDocument::default()
    };

    let candidates = vec![person("Smith", Value::Int(30)), person("Jones", Value::Null)];
    let results = InMemoryQuery::new(document).execute(candidates)?;
    assert_eq!(names(&results), vec!["Smith"]);
    Ok(())
}

#[test]
fn test_greeting_projection() -> Result<()> {
    let document = QueryDocument {
        result: vec![Expression::add_expr(
            Expression::literal("Mr. "),
            Expression::path("name"),
        )],
        ..QueryDocument::default()
    };

    let results = InMemoryQuery::new(document).execute(vec![person("Smith", Value::Int(30))])?;
    assert_eq!(results, vec![Value::string("Mr. Smith")]);
    Ok(())
}

#[test]
fn test_logical_operators_with_unresolved_operands() -> Result<()> {
    let diagnostics = Arc::new(CollectingDiagnostics::new());
    let mut ctx = EvaluationContext::new(Arc::new(TypeCatalog::new()))
        .with_diagnostics(diagnostics.clone());
    ctx.set_candidate(person("Smith", Value::Int(30)));

    let missing = || Expression::path("salary");
    let mut evaluator = Evaluator::new(&mut ctx);

    let and = Expression::and(missing(), Expression::literal(true));
    assert_eq!(
        evaluator.evaluate(&and)?.into_operand(),
        Operand::Value(Value::Boolean(false))
    );

    let or = Expression::or(missing(), Expression::literal(true));
    assert_eq!(
        evaluator.evaluate(&or)?.into_operand(),
        Operand::Value(Value::Boolean(true))
    );

    let or = Expression::or(missing(), missing());
    assert_eq!(evaluator.evaluate(&or)?.into_operand(), Operand::Unresolved);
    assert_eq!(evaluator.stack_depth(), 0);

    assert_eq!(diagnostics.take().len(), 4);
    Ok(())
}

#[test]
fn test_distinct_sum() -> Result<()> {
    let document = QueryDocument {
        result: vec![
            Expression::call("sum", vec![Expression::distinct(Expression::path("age"))]),
            Expression::call("count", vec![Expression::path("age")]),
        ],
        ..QueryDocument::default()
    };

    let candidates = vec![
        person("Smith", Value::Int(20)),
        person("Jones", Value::Int(20)),
        person("Brown", Value::Int(5)),
    ];
    let results = InMemoryQuery::new(document).execute(candidates)?;
    assert_eq!(
        results,
        vec![Value::Array(vec![Value::Long(25), Value::Long(3)])]
    );
    Ok(())
}

#[test]
fn test_contains_entry() -> Result<()> {
    let scores = |math: i32| {
        Value::Map(vec![
            (Value::string("math"), Value::Int(math)),
            (Value::string("art"), Value::Null),
        ])
    };
    let candidates = vec![
        Object::new("org.acme.Pupil")
            .with_field("name", "Ann")
            .with_field("scores", scores(90))
            .into(),
        Object::new("org.acme.Pupil")
            .with_field("name", "Ben")
            .with_field("scores", scores(70))
            .into(),
    ];
    let document = QueryDocument {
        // Long and Int with the same magnitude are equal
        filter: Some(Expression::invoke(
            Expression::path("scores"),
            "containsEntry",
            vec![Expression::literal("math"), Expression::literal(90i64)],
        )),
        result: vec![Expression::path("name")],
        ..QueryDocument::default()
    };

    let results = InMemoryQuery::new(document).execute(candidates)?;
    assert_eq!(names(&results), vec!["Ann"]);
    Ok(())
}

#[test]
fn test_existential_variable() -> Result<()> {
    let owner = |name: &str, pets: &[&str]| -> Value {
        Object::new("org.acme.Person")
            .with_field("name", name)
            .with_field(
                "pets",
                Value::List(pets.iter().map(|p| Value::string(*p)).collect()),
            )
            .into()
    };
    let document = QueryDocument {
        filter: Some(Expression::and(
            Expression::invoke(
                Expression::path("pets"),
                "contains",
                vec![Expression::variable("pet")],
            ),
            Expression::invoke(
                Expression::variable("pet"),
                "endsWith",
                vec![Expression::literal("x")],
            ),
        )),
        variables: vec!["pet".to_string()],
        result: vec![Expression::path("name")],
        ..QueryDocument::default()
    };

    let candidates = vec![
        owner("Smith", &["Tom", "Rex"]),
        owner("Jones", &["Tom"]),
        owner("Brown", &[]),
        owner("Adams", &["Felix"]),
    ];
    let results = InMemoryQuery::new(document).execute(candidates)?;
    assert_eq!(names(&results), vec!["Smith", "Adams"]);
    Ok(())
}

#[test]
fn test_managed_objects_load_fields() -> Result<()> {
    let mut store = ObjectStore::new();
    store.define_layout("org.acme.Person", vec!["name".to_string(), "age".to_string()]);
    store.put("org.acme.Person", &Value::Long(1), vec![Value::string("Smith"), Value::Int(30)])?;
    store.put("org.acme.Person", &Value::Long(2), vec![Value::string("Brown"), Value::Int(12)])?;
    let store = Arc::new(store);

    let document = QueryDocument {
        filter: Some(Expression::ge(
            Expression::path("age"),
            Expression::literal(18),
        )),
        result: vec![
            Expression::path("name"),
            Expression::call("ID", vec![Expression::path("this")]),
        ],
        ..QueryDocument::default()
    };
    let candidates = vec![
        Object::managed("org.acme.Person", Value::Long(1)).into(),
        Object::managed("org.acme.Person", Value::Long(2)).into(),
    ];

    let results = InMemoryQuery::new(document)
        .with_field_access(store.clone())
        .execute(candidates)?;
    assert_eq!(
        results,
        vec![Value::Array(vec![Value::string("Smith"), Value::Long(1)])]
    );
    // age twice, name once
    assert_eq!(store.load_count(), 3);
    Ok(())
}

#[test]
fn test_cast_to_subtype() -> Result<()> {
    let diagnostics = Arc::new(CollectingDiagnostics::new());
    let document = QueryDocument {
        filter: Some(Expression::gt(
            Expression::cast_path(Expression::path("this"), "Manager", &["reports"]),
            Expression::literal(2),
        )),
        result: vec![Expression::path("name")],
        classes: vec![
            ClassInfo::new("org.acme.Person"),
            ClassInfo::new("org.acme.Manager").extends("org.acme.Person"),
        ],
        imports: HashMap::from([("Manager".to_string(), "org.acme.Manager".to_string())]),
        ..QueryDocument::default()
    };
    let candidates = vec![
        person("Smith", Value::Int(30)),
        Object::new("org.acme.Manager")
            .with_field("name", "Adams")
            .with_field("reports", 5)
            .into(),
    ];

    let results = InMemoryQuery::new(document)
        .with_diagnostics(diagnostics.clone())
        .execute(candidates)?;
    assert_eq!(names(&results), vec!["Adams"]);
    assert!(matches!(
        diagnostics.take().as_slice(),
        [Warning::FailedCast { .. }]
    ));
    Ok(())
}

/// `p.initials()` for people
struct Initials;

impl MethodEvaluator for Initials {
    fn evaluate(
        &self,
        _invocation: &Invocation,
        receiver: &Value,
        _evaluator: &mut Evaluator<'_>,
    ) -> Step<Operand> {
        let initial = match receiver {
            Value::Object(object) => object
                .field("name")
                .and_then(Value::as_str)
                .and_then(|name| name.chars().next()),
            _ => None,
        };
        Ok(initial.map_or(Operand::Unresolved, |c| Operand::Value(Value::Char(c))))
    }
}

#[test]
fn test_custom_method_on_user_type() -> Result<()> {
    let mut registry = MethodRegistry::with_builtins();
    registry.register(Some("org.acme.Person"), "initials", Arc::new(Initials));

    let document = QueryDocument {
        ordering: vec![OrderingSpec {
            expr: Expression::path("name"),
            descending: false,
            nulls_first: None,
        }],
        result: vec![Expression::invoke(Expression::path("this"), "initials", vec![])],
        classes: vec![ClassInfo::new("org.acme.Employee").extends("org.acme.Person")],
        ..QueryDocument::default()
    };
    let candidates = vec![
        person("Smith", Value::Int(30)),
        Object::new("org.acme.Employee")
            .with_field("name", "Brown")
            .into(),
    ];

    let results = InMemoryQuery::new(document)
        .with_registry(Arc::new(registry))
        .execute(candidates)?;
    assert_eq!(results, vec![Value::Char('B'), Value::Char('S')]);
    Ok(())
}

#[test]
fn test_query_document_from_file() -> Result<()> {
    let document = QueryDocument {
        alias: "p".to_string(),
        filter: Some(Expression::invoke(
            Expression::path("p.name"),
            "startsWith",
            vec![Expression::parameter("prefix")],
        )),
        ordering: vec![OrderingSpec {
            expr: Expression::path("p.age"),
            descending: true,
            nulls_first: Some(true),
        }],
        range: Some(RangeSpec { from: 0, to: Some(2) }),
        result: vec![Expression::path("p.name")],
        parameters: HashMap::from([("prefix".to_string(), serde_json::json!("J"))]),
        ..QueryDocument::default()
    };

    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(serde_json::to_string_pretty(&document)?.as_bytes())?;
    let text = std::fs::read_to_string(file.path())?;
    let loaded = QueryDocument::from_json(&text)?;
    assert_eq!(loaded, document);

    let candidates: serde_json::Value = serde_json::json!([
        {"$type": "org.acme.Person", "name": "Jones", "age": 41},
        {"$type": "org.acme.Person", "name": "James", "age": null},
        {"$type": "org.acme.Person", "name": "Smith", "age": 30},
        {"$type": "org.acme.Person", "name": "Jake", "age": 19}
    ]);
    let candidates = match candidates {
        serde_json::Value::Array(items) => items.iter().map(Value::from_json).collect(),
        _ => Vec::new(),
    };

    let results = InMemoryQuery::new(loaded).execute(candidates)?;
    let rendered: Vec<String> = results.iter().map(|v| v.to_json().to_string()).collect();
    assert_eq!(rendered, vec!["\"James\"", "\"Jones\""]);
    Ok(())
}

fn plain_json(json: serde_json::Value) -> Vec<Value> {
    match json {
        serde_json::Value::Array(items) => items.iter().map(Value::from_json).collect(),
        _ => Vec::new(),
    }
}

#[test]
fn test_plain_json_candidates() -> Result<()> {
    let diagnostics = Arc::new(CollectingDiagnostics::new());
    let document = QueryDocument {
        filter: Some(Expression::ge(
            Expression::path("age"),
            Expression::literal(18),
        )),
        ordering: vec![OrderingSpec {
            expr: Expression::path("home.city"),
            descending: false,
            nulls_first: None,
        }],
        result: vec![Expression::path("name")],
        ..QueryDocument::default()
    };
    let candidates = plain_json(serde_json::json!([
        {"name": "Smith", "age": 30, "home": {"city": "York"}},
        {"name": "Jones", "age": null, "home": {"city": "Hull"}},
        {"name": "Adams", "age": 45, "home": {"city": "Leeds"}}
    ]));

    let results = InMemoryQuery::new(document)
        .with_diagnostics(diagnostics.clone())
        .execute(candidates)?;
    assert_eq!(names(&results), vec!["Adams", "Smith"]);
    assert!(diagnostics.take().is_empty());
    Ok(())
}

#[test]
fn test_untyped_null_receiver_uses_default() -> Result<()> {
    let diagnostics = Arc::new(CollectingDiagnostics::new());
    let document = QueryDocument {
        filter: Some(Expression::not_expr(Expression::invoke(
            Expression::path("name"),
            "startsWith",
            vec![Expression::literal("S")],
        ))),
        result: vec![Expression::path("age")],
        ..QueryDocument::default()
    };
    let candidates = vec![
        person("Smith", Value::Int(30)),
        Object::new("org.acme.Person")
            .with_field("name", Value::Null)
            .with_field("age", 12)
            .into(),
    ];

    let results = InMemoryQuery::new(document)
        .with_diagnostics(diagnostics.clone())
        .execute(candidates)?;
    assert_eq!(results, vec![Value::Int(12)]);
    assert!(diagnostics.take().is_empty());
    Ok(())
}
