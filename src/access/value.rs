use crate::access::numeric;
use crate::access::object::{Object, ObjectRef};
use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Built-in runtime types a `Value` can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Boolean,
    Character,
    Byte,
    Short,
    Integer,
    Long,
    BigInteger,
    Float,
    Double,
    BigDecimal,
    String,
    Array,
    List,
    Set,
    Map,
    Class,
}

/// Root of every type hierarchy.
pub const OBJECT_TYPE: &str = "Object";

/// Abstract built-in types that only appear as supertypes.
const ABSTRACT_TYPES: &[(&str, &[&str])] = &[
    ("Number", &[OBJECT_TYPE]),
    ("Comparable", &[OBJECT_TYPE]),
    ("CharSequence", &[OBJECT_TYPE]),
    ("Iterable", &[OBJECT_TYPE]),
    ("Collection", &["Iterable"]),
    (OBJECT_TYPE, &[]),
];

impl DataType {
    pub const ALL: [DataType; 16] = [
        DataType::Boolean,
        DataType::Character,
        DataType::Byte,
        DataType::Short,
        DataType::Integer,
        DataType::Long,
        DataType::BigInteger,
        DataType::Float,
        DataType::Double,
        DataType::BigDecimal,
        DataType::String,
        DataType::Array,
        DataType::List,
        DataType::Set,
        DataType::Map,
        DataType::Class,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DataType::Boolean => "Boolean",
            DataType::Character => "Character",
            DataType::Byte => "Byte",
            DataType::Short => "Short",
            DataType::Integer => "Integer",
            DataType::Long => "Long",
            DataType::BigInteger => "BigInteger",
            DataType::Float => "Float",
            DataType::Double => "Double",
            DataType::BigDecimal => "BigDecimal",
            DataType::String => "String",
            DataType::Array => "Array",
            DataType::List => "List",
            DataType::Set => "Set",
            DataType::Map => "Map",
            DataType::Class => "Class",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.name() == name)
    }

    /// Direct supertypes, nearest first.
    pub fn supertypes(&self) -> &'static [&'static str] {
        match self {
            DataType::Byte
            | DataType::Short
            | DataType::Integer
            | DataType::Long
            | DataType::BigInteger
            | DataType::Float
            | DataType::Double
            | DataType::BigDecimal => &["Number", "Comparable"],
            DataType::String => &["CharSequence", "Comparable"],
            DataType::Boolean | DataType::Character => &["Comparable"],
            DataType::List | DataType::Set => &["Collection"],
            DataType::Array | DataType::Map | DataType::Class => &[OBJECT_TYPE],
        }
    }
}

/// Direct supertypes of any built-in type name, concrete or abstract.
pub fn builtin_supertypes(name: &str) -> Option<&'static [&'static str]> {
    if let Some(data_type) = DataType::from_name(name) {
        return Some(data_type.supertypes());
    }
    ABSTRACT_TYPES
        .iter()
        .find(|(abstract_name, _)| *abstract_name == name)
        .map(|(_, supers)| *supers)
}

/// Values the evaluator computes with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Boolean(bool),
    Char(char),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    BigInteger(BigInt),
    Float(f32),
    Double(f64),
    Decimal(BigDecimal),
    String(String),
    Array(Vec<Value>),
    List(Vec<Value>),
    Set(Vec<Value>),
    Map(Vec<(Value, Value)>),
    Object(ObjectRef),
    /// Reference to a type, by its resolved name
    Type(String),
}

impl Value {
    /// Get the built-in data type of this value (None for null and objects)
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Null | Value::Object(_) => None,
            Value::Boolean(_) => Some(DataType::Boolean),
            Value::Char(_) => Some(DataType::Character),
            Value::Byte(_) => Some(DataType::Byte),
            Value::Short(_) => Some(DataType::Short),
            Value::Int(_) => Some(DataType::Integer),
            Value::Long(_) => Some(DataType::Long),
            Value::BigInteger(_) => Some(DataType::BigInteger),
            Value::Float(_) => Some(DataType::Float),
            Value::Double(_) => Some(DataType::Double),
            Value::Decimal(_) => Some(DataType::BigDecimal),
            Value::String(_) => Some(DataType::String),
            Value::Array(_) => Some(DataType::Array),
            Value::List(_) => Some(DataType::List),
            Value::Set(_) => Some(DataType::Set),
            Value::Map(_) => Some(DataType::Map),
            Value::Type(_) => Some(DataType::Class),
        }
    }

    /// Runtime type name, used for dispatch and type tests
    pub fn type_name(&self) -> Option<&str> {
        match self {
            Value::Object(object) => Some(object.type_name()),
            other => other.data_type().map(|t| t.name()),
        }
    }

    /// Type name for diagnostics; null reports as "null"
    pub fn describe_type(&self) -> &str {
        self.type_name().unwrap_or("null")
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Value::Byte(_)
                | Value::Short(_)
                | Value::Int(_)
                | Value::Long(_)
                | Value::BigInteger(_)
                | Value::Float(_)
                | Value::Double(_)
                | Value::Decimal(_)
        )
    }

    pub fn is_integral(&self) -> bool {
        matches!(
            self,
            Value::Byte(_) | Value::Short(_) | Value::Int(_) | Value::Long(_) | Value::BigInteger(_)
        )
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Elements of an array, list or set
    pub fn elements(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) | Value::List(items) | Value::Set(items) => Some(items),
            _ => None,
        }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Value::String(value.into())
    }

    pub fn decimal(text: &str) -> Option<Self> {
        text.parse::<BigDecimal>().ok().map(Value::Decimal)
    }

    /// Read plain JSON input. Integers become `Int` when they fit, `Long`
    /// otherwise; arrays become lists. An object with a `$type` member is
    /// an instance of that type (managed when it also carries `$id`); any
    /// other object is a map with string keys.
    pub fn from_json(json: &serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Boolean(*b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => i32::try_from(i).map_or(Value::Long(i), Value::Int),
                None => n.as_f64().map_or(Value::Null, Value::Double),
            },
            Json::String(s) => Value::String(s.clone()),
            Json::Array(items) => Value::List(items.iter().map(Value::from_json).collect()),
            Json::Object(members) => match members.get("$type").and_then(Json::as_str) {
                Some(type_name) => {
                    let mut object = match members.get("$id") {
                        Some(id) => Object::managed(type_name, Value::from_json(id)),
                        None => Object::new(type_name),
                    };
                    for (name, value) in members {
                        if !name.starts_with('$') {
                            object = object.with_field(name.as_str(), Value::from_json(value));
                        }
                    }
                    object.into()
                }
                None => Value::Map(
                    members
                        .iter()
                        .map(|(k, v)| (Value::string(k.as_str()), Value::from_json(v)))
                        .collect(),
                ),
            },
        }
    }

    /// Plain JSON rendering for result output
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::Null => Json::Null,
            Value::Boolean(b) => Json::Bool(*b),
            Value::Char(c) => Json::String(c.to_string()),
            Value::Byte(n) => Json::from(*n),
            Value::Short(n) => Json::from(*n),
            Value::Int(n) => Json::from(*n),
            Value::Long(n) => Json::from(*n),
            Value::Float(n) => Json::from(*n),
            Value::Double(n) => Json::from(*n),
            Value::BigInteger(_) | Value::Decimal(_) | Value::Type(_) => {
                Json::String(self.to_string())
            }
            Value::String(s) => Json::String(s.clone()),
            Value::Array(items) | Value::List(items) | Value::Set(items) => {
                Json::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(entries) => Json::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_json()))
                    .collect(),
            ),
            Value::Object(object) => {
                let mut fields = serde_json::Map::new();
                fields.insert("$type".to_string(), Json::String(object.type_name().into()));
                for (name, value) in object.fields() {
                    fields.insert(name.clone(), value.to_json());
                }
                Json::Object(fields)
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Char(c) => write!(f, "{}", c),
            Value::Byte(n) => write!(f, "{}", n),
            Value::Short(n) => write!(f, "{}", n),
            Value::Int(n) => write!(f, "{}", n),
            Value::Long(n) => write!(f, "{}", n),
            Value::BigInteger(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::Double(n) => write!(f, "{}", n),
            Value::Decimal(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Array(items) | Value::List(items) | Value::Set(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}={}", k, v)?;
                }
                write!(f, "}}")
            }
            Value::Object(object) => write!(f, "{}", object),
            Value::Type(name) => write!(f, "class {}", name),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Long(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

/// Loose equality used by query operators: numbers compare by magnitude
/// across kinds, a single-character string equals that character, and
/// containers compare element-wise with the same rules.
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (l, r) if l.is_numeric() && r.is_numeric() => {
            numeric::compare(l, r) == Some(Ordering::Equal)
        }
        (Value::Char(c), Value::String(s)) | (Value::String(s), Value::Char(c)) => {
            let mut chars = s.chars();
            chars.next() == Some(*c) && chars.next().is_none()
        }
        (Value::Array(l), Value::Array(r))
        | (Value::List(l), Value::List(r))
        | (Value::Array(l), Value::List(r))
        | (Value::List(l), Value::Array(r)) => {
            l.len() == r.len() && l.iter().zip(r).all(|(a, b)| values_equal(a, b))
        }
        (Value::Set(l), Value::Set(r)) => {
            l.len() == r.len() && l.iter().all(|a| r.iter().any(|b| values_equal(a, b)))
        }
        (Value::Map(l), Value::Map(r)) => {
            l.len() == r.len()
                && l.iter().all(|(k, v)| {
                    r.iter()
                        .any(|(rk, rv)| values_equal(k, rk) && values_equal(v, rv))
                })
        }
        (l, r) => l == r,
    }
}

/// Generic ordering routine; None when the values have no common order
pub fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (l, r) if l.is_numeric() && r.is_numeric() => numeric::compare(l, r),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Char(a), Value::Char(b)) => Some(a.cmp(b)),
        (Value::Char(a), Value::String(b)) => Some(a.to_string().as_str().cmp(b.as_str())),
        (Value::String(a), Value::Char(b)) => Some(a.as_str().cmp(b.to_string().as_str())),
        (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
        _ => None,
    }
}
