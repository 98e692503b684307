//! Output projections
//!
//! A projection tells the search service which fields to return for each
//! matched stream and how to compute them:
//!
//! ```rust,ignore
//! let speed = EventPath::parse("speed")?;
//! let projection = Projection::new()
//!     .include_default(false)
//!     .stream(&vehicles, [
//!         ("kmh", ProjExpr::from(speed.clone())),
//!         ("mph", ProjExpr::from(speed) * 0.621371),
//!     ]);
//! ```
//!
//! Wire format:
//!
//! ```text
//! {"explicit": [{"stream": {...}, "projection": {"kmh": {"path": [...]}}}],
//!  "...": false}
//! ```

use crate::query::error::QueryResult;
use crate::query::path::{EventPath, Stream};
use crate::query::value::Value;
use serde_json::{json, Map, Value as Json};
use std::collections::BTreeMap;
use std::ops::{Add, Div, Mul, Sub};

/// Arithmetic operators available in projections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
        }
    }
}

/// An output field expression
#[derive(Debug, Clone, PartialEq)]
pub enum ProjExpr {
    /// Constant value
    Literal(Value),
    /// Field of the matched event
    Path(EventPath),
    /// Binary arithmetic over two expressions
    Arith {
        op: ArithOp,
        lhs: Box<ProjExpr>,
        rhs: Box<ProjExpr>,
    },
    /// Nested output object
    Object(BTreeMap<String, ProjExpr>),
}

impl ProjExpr {
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    pub fn path(path: EventPath) -> Self {
        Self::Path(path)
    }

    /// Nested object of named sub-expressions
    pub fn object<I, K, E>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, E)>,
        K: Into<String>,
        E: Into<ProjExpr>,
    {
        Self::Object(
            fields
                .into_iter()
                .map(|(k, e)| (k.into(), e.into()))
                .collect(),
        )
    }

    fn arith(op: ArithOp, lhs: ProjExpr, rhs: ProjExpr) -> Self {
        Self::Arith {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn to_ast(&self) -> QueryResult<Json> {
        let ast = match self {
            Self::Literal(value) => {
                value.ensure_finite()?;
                value.to_ast()
            }
            Self::Path(path) => json!({"path": path.to_wire()}),
            Self::Arith { op, lhs, rhs } => json!({
                "expr": op.as_str(),
                "args": [lhs.to_ast()?, rhs.to_ast()?],
            }),
            Self::Object(fields) => Json::Object(
                fields
                    .iter()
                    .map(|(name, expr)| Ok((name.clone(), expr.to_ast()?)))
                    .collect::<QueryResult<Map<_, _>>>()?,
            ),
        };
        Ok(ast)
    }
}

impl From<EventPath> for ProjExpr {
    fn from(path: EventPath) -> Self {
        Self::Path(path)
    }
}

impl From<Value> for ProjExpr {
    fn from(value: Value) -> Self {
        Self::Literal(value)
    }
}

impl From<i32> for ProjExpr {
    fn from(value: i32) -> Self {
        Self::Literal(Value::from(value))
    }
}

impl From<i64> for ProjExpr {
    fn from(value: i64) -> Self {
        Self::Literal(Value::Int(value))
    }
}

impl From<f64> for ProjExpr {
    fn from(value: f64) -> Self {
        Self::Literal(Value::Double(value))
    }
}

impl From<&str> for ProjExpr {
    fn from(value: &str) -> Self {
        Self::Literal(Value::from(value))
    }
}

impl<T: Into<ProjExpr>> Add<T> for ProjExpr {
    type Output = ProjExpr;

    fn add(self, rhs: T) -> ProjExpr {
        ProjExpr::arith(ArithOp::Add, self, rhs.into())
    }
}

impl<T: Into<ProjExpr>> Sub<T> for ProjExpr {
    type Output = ProjExpr;

    fn sub(self, rhs: T) -> ProjExpr {
        ProjExpr::arith(ArithOp::Sub, self, rhs.into())
    }
}

impl<T: Into<ProjExpr>> Mul<T> for ProjExpr {
    type Output = ProjExpr;

    fn mul(self, rhs: T) -> ProjExpr {
        ProjExpr::arith(ArithOp::Mul, self, rhs.into())
    }
}

impl<T: Into<ProjExpr>> Div<T> for ProjExpr {
    type Output = ProjExpr;

    fn div(self, rhs: T) -> ProjExpr {
        ProjExpr::arith(ArithOp::Div, self, rhs.into())
    }
}

/// Wire key of the flag for streams without an explicit projection
const DEFAULT_KEY: &str = "...";

/// Per-stream output specification
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Projection {
    default: Option<bool>,
    explicit: Vec<(Stream, BTreeMap<String, ProjExpr>)>,
}

impl Projection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether streams without an explicit projection return their
    /// default fields (`true`) or nothing (`false`)
    pub fn include_default(mut self, include: bool) -> Self {
        self.default = Some(include);
        self
    }

    /// Set the output fields for one stream, replacing any earlier entry
    /// for the same stream
    pub fn stream<I, K, E>(mut self, stream: &Stream, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, E)>,
        K: Into<String>,
        E: Into<ProjExpr>,
    {
        let fields: BTreeMap<String, ProjExpr> = fields
            .into_iter()
            .map(|(k, e)| (k.into(), e.into()))
            .collect();

        match self.explicit.iter_mut().find(|(s, _)| s == stream) {
            Some(entry) => entry.1 = fields,
            None => self.explicit.push((stream.clone(), fields)),
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.default.is_none() && self.explicit.is_empty()
    }

    pub fn to_ast(&self) -> QueryResult<Json> {
        let mut map = Map::new();
        if !self.explicit.is_empty() {
            let explicit = self
                .explicit
                .iter()
                .map(|(stream, fields)| {
                    Ok(json!({
                        "stream": stream.to_ref(),
                        "projection": ProjExpr::Object(fields.clone()).to_ast()?,
                    }))
                })
                .collect::<QueryResult<Vec<Json>>>()?;
            map.insert("explicit".to_string(), Json::Array(explicit));
        }
        if let Some(include) = self.default {
            map.insert(DEFAULT_KEY.to_string(), json!(include));
        }
        Ok(Json::Object(map))
    }
}
