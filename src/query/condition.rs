//! Conditions: a path, an operator and a literal
//!
//! Paths expose comparison builders through the [`Compare`] trait:
//!
//! ```rust,ignore
//! let s = Stream::new("vehicles");
//! let fast = s.field("speed").gt(80)?;
//! let idle = s.field("state").equals_any(["parked", "stopped"])?;  // `in`
//! let band = s.field("rpm").between(1000, 3000)?;                  // 1000 < rpm < 3000
//! ```

use crate::query::error::{QueryError, QueryResult};
use crate::query::node::{And, Node};
use crate::query::path::{EventPath, PathRef, Stream, StreamPath};
use crate::query::value::Value;
use chrono::FixedOffset;
use serde_json::{json, Map, Value as Json};

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// Equal to
    Eq,
    /// Not equal to
    Ne,
    /// Less than
    Lt,
    /// Less than or equal to
    Le,
    /// Greater than
    Gt,
    /// Greater than or equal to
    Ge,
    /// Member of a set
    In,
    /// Not a member of a set
    NotIn,
}

impl Operator {
    /// Wire spelling of the operator
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::In => "in",
            Self::NotIn => "not in",
        }
    }

    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "=" | "==" => Some(Self::Eq),
            "!=" | "<>" => Some(Self::Ne),
            "<" => Some(Self::Lt),
            "<=" => Some(Self::Le),
            ">" => Some(Self::Gt),
            ">=" => Some(Self::Ge),
            "in" => Some(Self::In),
            "not in" => Some(Self::NotIn),
            _ => None,
        }
    }

    fn is_membership(&self) -> bool {
        matches!(self, Self::In | Self::NotIn)
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Right-hand side of a condition
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    /// A single literal
    Value(Value),
    /// A set of literals, for membership tests
    Set(Vec<Value>),
}

impl Argument {
    fn values(&self) -> &[Value] {
        match self {
            Self::Value(value) => std::slice::from_ref(value),
            Self::Set(values) => values,
        }
    }

    /// Timezone carried by the first offset datetime in the argument
    fn timezone(&self) -> Option<FixedOffset> {
        self.values().iter().find_map(Value::timezone)
    }

    pub fn to_ast(&self) -> Json {
        match self {
            Self::Value(value) => value.to_ast(),
            Self::Set(values) => json!({
                "type": "set",
                "val": values.iter().map(Value::to_ast).collect::<Vec<_>>(),
            }),
        }
    }
}

impl From<Value> for Argument {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

/// A single comparison against a field of an event
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    path: PathRef,
    op: Operator,
    arg: Argument,
}

impl Condition {
    /// Create a condition, checking that the operator fits the argument
    pub fn new(path: impl Into<PathRef>, op: Operator, arg: impl Into<Argument>) -> QueryResult<Self> {
        let path = path.into();
        let arg = arg.into();

        if let PathRef::Stream(stream_path) = &path {
            if stream_path.segments().is_empty() {
                return Err(QueryError::syntax(format!(
                    "condition on stream `{}` needs a field path",
                    stream_path.stream().name()
                )));
            }
        }

        match (&arg, op.is_membership()) {
            (Argument::Set(_), false) => {
                return Err(QueryError::syntax(format!(
                    "operator `{}` at {} takes a single value, not a set",
                    op, path
                )))
            }
            (Argument::Value(value), true) => {
                return Err(QueryError::syntax(format!(
                    "operator `{}` at {} takes a set, got {}",
                    op, path, value
                )))
            }
            _ => {}
        }

        for value in arg.values() {
            value.ensure_finite()?;
        }

        if let Some(region) = arg.values().iter().find(|v| v.is_region()) {
            if op != Operator::Eq {
                return Err(QueryError::IncompatibleOperator {
                    path: path.to_string(),
                    op: op.to_string(),
                    kind: region.type_tag(),
                });
            }
        }

        Ok(Self { path, op, arg })
    }

    pub fn path(&self) -> &PathRef {
        &self.path
    }

    pub fn op(&self) -> Operator {
        self.op
    }

    pub fn arg(&self) -> &Argument {
        &self.arg
    }

    /// Stream the condition is bound to, if any
    pub fn stream(&self) -> Option<&Stream> {
        self.path.stream()
    }

    pub fn is_bound(&self) -> bool {
        self.stream().is_some()
    }

    /// Serialize to the wire AST
    ///
    /// A stream-bound condition is tagged as a span and carries the stream
    /// reference. An offset on a datetime argument becomes the timezone of
    /// that reference.
    pub fn to_ast(&self) -> Json {
        let mut map = Map::new();
        map.insert("op".to_string(), json!(self.op.as_str()));
        map.insert("arg".to_string(), self.arg.to_ast());
        map.insert("path".to_string(), self.path.to_wire());

        if let Some(stream) = self.stream() {
            map.insert("type".to_string(), json!("span"));
            map.insert("stream".to_string(), stream.to_ref_with(self.arg.timezone()));
        }

        Json::Object(map)
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.arg {
            Argument::Value(value) => write!(f, "{} {} {}", self.path, self.op, value),
            Argument::Set(values) => {
                let items: Vec<String> = values.iter().map(ToString::to_string).collect();
                write!(f, "{} {} [{}]", self.path, self.op, items.join(", "))
            }
        }
    }
}

/// Comparison builders shared by every kind of path
pub trait Compare {
    /// The path a condition built from `self` refers to
    fn path_ref(&self) -> PathRef;

    fn compare(&self, op: Operator, value: impl Into<Value>) -> QueryResult<Condition> {
        Condition::new(self.path_ref(), op, Argument::Value(value.into()))
    }

    fn equals(&self, value: impl Into<Value>) -> QueryResult<Condition> {
        self.compare(Operator::Eq, value)
    }

    fn not_equals(&self, value: impl Into<Value>) -> QueryResult<Condition> {
        self.compare(Operator::Ne, value)
    }

    fn lt(&self, value: impl Into<Value>) -> QueryResult<Condition> {
        self.compare(Operator::Lt, value)
    }

    fn le(&self, value: impl Into<Value>) -> QueryResult<Condition> {
        self.compare(Operator::Le, value)
    }

    fn gt(&self, value: impl Into<Value>) -> QueryResult<Condition> {
        self.compare(Operator::Gt, value)
    }

    fn ge(&self, value: impl Into<Value>) -> QueryResult<Condition> {
        self.compare(Operator::Ge, value)
    }

    /// Membership test (`in`)
    fn is_in<I, V>(&self, values: I) -> QueryResult<Condition>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let set = values.into_iter().map(Into::into).collect();
        Condition::new(self.path_ref(), Operator::In, Argument::Set(set))
    }

    /// Negated membership test (`not in`)
    fn not_in<I, V>(&self, values: I) -> QueryResult<Condition>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let set = values.into_iter().map(Into::into).collect();
        Condition::new(self.path_ref(), Operator::NotIn, Argument::Set(set))
    }

    /// Equality against a list means membership
    fn equals_any<I, V>(&self, values: I) -> QueryResult<Condition>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.is_in(values)
    }

    /// Inequality against a list means negated membership
    fn not_equals_any<I, V>(&self, values: I) -> QueryResult<Condition>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.not_in(values)
    }

    /// Open interval `low < path < high`
    fn between(&self, low: impl Into<Value>, high: impl Into<Value>) -> QueryResult<Node> {
        let lower = self.gt(low)?;
        let upper = self.lt(high)?;
        Ok(Node::And(And::new([lower, upper])))
    }

    /// Closed interval `low <= path <= high`
    fn between_inclusive(
        &self,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> QueryResult<Node> {
        let lower = self.ge(low)?;
        let upper = self.le(high)?;
        Ok(Node::And(And::new([lower, upper])))
    }
}

impl Compare for EventPath {
    fn path_ref(&self) -> PathRef {
        PathRef::Event(self.clone())
    }
}

impl Compare for StreamPath {
    fn path_ref(&self) -> PathRef {
        PathRef::Stream(self.clone())
    }
}
