//! Query assembly
//!
//! A [`Query`] wraps one combinator tree with an optional time window and
//! an optional output projection, and serializes to the request document
//! sent to the search service:
//!
//! ```text
//! {
//!   "select": {"between": ["2024-01-01T00:00:00+00:00", "..."], <node AST>},
//!   "projections": {"explicit": [...], "...": false}
//! }
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use spanql::prelude::*;
//!
//! let cars = Stream::new("cars");
//! let query = Query::select(cars.field("speed").gt(120)?.for_at_least(Duration::minutes(1))?)
//!     .after(start)
//!     .before(end)
//!     .build()?;
//!
//! let body = query.to_json_string()?;
//! ```

use crate::query::error::{QueryError, QueryResult};
use crate::query::node::Node;
use crate::query::projection::Projection;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde_json::{json, Map, Value as Json};

/// A bound of the query's time window
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeBound(DateTime<FixedOffset>);

impl TimeBound {
    pub fn as_datetime(&self) -> &DateTime<FixedOffset> {
        &self.0
    }

    /// ISO-8601 with an explicit offset
    pub fn to_iso(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::AutoSi, false)
    }
}

impl From<DateTime<FixedOffset>> for TimeBound {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        Self(dt)
    }
}

impl From<DateTime<Utc>> for TimeBound {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt.into())
    }
}

impl From<NaiveDateTime> for TimeBound {
    fn from(dt: NaiveDateTime) -> Self {
        Self(Utc.from_utc_datetime(&dt).into())
    }
}

impl From<NaiveDate> for TimeBound {
    /// Midnight UTC
    fn from(date: NaiveDate) -> Self {
        Self::from(NaiveDateTime::from(date))
    }
}

/// The `select` statement: what to match, and when
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Select {
    root: Option<Node>,
    after: Option<TimeBound>,
    before: Option<TimeBound>,
}

impl Select {
    /// Select everything, unconstrained by time
    pub fn all() -> Self {
        Self::default()
    }

    /// Select spans matching a combinator tree
    pub fn new(root: impl Into<Node>) -> Self {
        Self {
            root: Some(root.into()),
            ..Self::default()
        }
    }

    /// Only match at or after this instant (inclusive)
    pub fn after(mut self, bound: impl Into<TimeBound>) -> Self {
        self.after = Some(bound.into());
        self
    }

    /// Only match before this instant (exclusive)
    pub fn before(mut self, bound: impl Into<TimeBound>) -> Self {
        self.before = Some(bound.into());
        self
    }

    /// Restrict to `[after, before)`
    pub fn between(self, after: impl Into<TimeBound>, before: impl Into<TimeBound>) -> Self {
        self.after(after).before(before)
    }

    pub fn root(&self) -> Option<&Node> {
        self.root.as_ref()
    }

    pub fn to_ast(&self) -> QueryResult<Json> {
        let mut ast = match &self.root {
            Some(root) => root.to_ast()?,
            None => Json::Object(Map::new()),
        };
        let Some(map) = ast.as_object_mut() else {
            return Err(QueryError::syntax("select root must serialize to an object"));
        };

        match (self.after, self.before) {
            (Some(after), Some(before)) => {
                if after >= before {
                    return Err(QueryError::syntax(format!(
                        "empty time window: after {} is not earlier than before {}",
                        after.to_iso(),
                        before.to_iso()
                    )));
                }
                insert_window_key(map, "between", json!([after.to_iso(), before.to_iso()]))?;
            }
            (Some(after), None) => insert_window_key(map, "after", json!(after.to_iso()))?,
            (None, Some(before)) => insert_window_key(map, "before", json!(before.to_iso()))?,
            (None, None) => {}
        }

        Ok(ast)
    }
}

/// Time window keys share the root node's object and must not replace
/// one of its own keys (an `after` gap in particular)
fn insert_window_key(map: &mut Map<String, Json>, key: &str, value: Json) -> QueryResult<()> {
    if let Some(existing) = map.get(key) {
        return Err(QueryError::syntax(format!(
            "time window `{}` clashes with `{}: {}` on the selected node",
            key, key, existing
        )));
    }
    map.insert(key.to_string(), value);
    Ok(())
}

/// A top-level statement of a query
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// What to match
    Select(Select),
    /// What to return (`returning` clause)
    Returning(Projection),
}

impl From<Select> for Statement {
    fn from(select: Select) -> Self {
        Self::Select(select)
    }
}

impl From<Projection> for Statement {
    fn from(projection: Projection) -> Self {
        Self::Returning(projection)
    }
}

/// A complete query ready for submission
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Pattern and time window
    pub select: Select,
    /// Optional output projection
    pub projection: Option<Projection>,
}

impl Query {
    /// Start building a query that selects spans matching `root`
    pub fn select(root: impl Into<Node>) -> QueryBuilder {
        QueryBuilder::new(Select::new(root))
    }

    /// Start building a query that selects everything
    pub fn all() -> QueryBuilder {
        QueryBuilder::new(Select::all())
    }

    /// Assemble a query from statements
    ///
    /// At most one `select` and one `returning` statement may be present.
    /// Without a `select`, everything is selected.
    pub fn from_statements<I, S>(statements: I) -> QueryResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<Statement>,
    {
        let mut select = None;
        let mut projection = None;

        for statement in statements {
            match statement.into() {
                Statement::Select(s) => {
                    if select.replace(s).is_some() {
                        return Err(QueryError::syntax(
                            "only one `select` statement may be present",
                        ));
                    }
                }
                Statement::Returning(p) => {
                    if projection.replace(p).is_some() {
                        return Err(QueryError::syntax(
                            "only one `returning` statement may be present",
                        ));
                    }
                }
            }
        }

        Ok(Self {
            select: select.unwrap_or_default(),
            projection,
        })
    }

    /// Serialize to the request document
    pub fn to_json(&self) -> QueryResult<Json> {
        let mut doc = Map::new();
        doc.insert("select".to_string(), self.select.to_ast()?);
        if let Some(projection) = &self.projection {
            doc.insert("projections".to_string(), projection.to_ast()?);
        }

        tracing::debug!(
            root = self.select.root().map(Node::kind).unwrap_or("all"),
            projected = self.projection.is_some(),
            "Assembled query document"
        );
        Ok(Json::Object(doc))
    }

    /// Serialize to a compact JSON string
    pub fn to_json_string(&self) -> QueryResult<String> {
        Ok(self.to_json()?.to_string())
    }
}

/// Builder for constructing queries fluently
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    select: Select,
    statements: Vec<Statement>,
}

impl QueryBuilder {
    /// Create a new query builder around a select statement
    pub fn new(select: Select) -> Self {
        Self {
            select,
            statements: Vec::new(),
        }
    }

    /// Only match at or after this instant
    pub fn after(mut self, bound: impl Into<TimeBound>) -> Self {
        self.select = self.select.after(bound);
        self
    }

    /// Only match before this instant
    pub fn before(mut self, bound: impl Into<TimeBound>) -> Self {
        self.select = self.select.before(bound);
        self
    }

    /// Restrict to `[after, before)`
    pub fn between(mut self, after: impl Into<TimeBound>, before: impl Into<TimeBound>) -> Self {
        self.select = self.select.between(after, before);
        self
    }

    /// Add a `returning` clause
    pub fn returning(mut self, projection: Projection) -> Self {
        self.statements.push(Statement::Returning(projection));
        self
    }

    /// Build the query
    pub fn build(self) -> QueryResult<Query> {
        let statements = std::iter::once(Statement::Select(self.select)).chain(self.statements);
        Query::from_statements(statements)
    }
}
