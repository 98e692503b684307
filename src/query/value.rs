//! Literal values and their wire encoding
//!
//! Every leaf value in a query is encoded as a tagged literal:
//!
//! ```text
//! {"type": "int", "val": 42}
//! {"type": "date", "val": "2020-1-5"}
//! {"type": "datetime", "val": "2020-01-05T10:30:00+00:00"}
//! ```

use crate::query::error::{QueryError, QueryResult};
use chrono::{
    DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc,
};
use serde_json::{json, Value as Json};

/// A literal value that can appear on the right-hand side of a condition
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Boolean literal
    Bool(bool),
    /// Integer literal
    Int(i64),
    /// Floating point literal
    Double(f64),
    /// String literal
    String(String),
    /// Calendar date
    Date(NaiveDate),
    /// Point in time. Naive inputs are stored as UTC.
    DateTime(DateTime<FixedOffset>),
    /// Geometric region (only valid with equality)
    Region(Region),
}

impl Value {
    /// Wire tag for this value
    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Double(_) => "double",
            Self::String(_) => "string",
            Self::Date(_) => "date",
            Self::DateTime(_) => "datetime",
            Self::Region(region) => region.type_tag(),
        }
    }

    /// Check whether this is a region value
    pub fn is_region(&self) -> bool {
        matches!(self, Self::Region(_))
    }

    /// Reject literals with no JSON encoding (NaN and infinite numbers)
    pub fn ensure_finite(&self) -> QueryResult<()> {
        match self {
            Self::Double(d) if !d.is_finite() => {
                Err(QueryError::UnsupportedLiteral(format!("non-finite double {}", d)))
            }
            Self::Region(region) => region.ensure_finite(),
            _ => Ok(()),
        }
    }

    /// Non-UTC offset carried by a datetime literal, if any
    pub fn timezone(&self) -> Option<FixedOffset> {
        match self {
            Self::DateTime(dt) if dt.offset().local_minus_utc() != 0 => Some(*dt.offset()),
            _ => None,
        }
    }

    /// Encode into a `{type, val}` wire literal
    pub fn to_ast(&self) -> Json {
        match self {
            Self::Bool(b) => json!({"type": "bool", "val": b}),
            Self::Int(i) => json!({"type": "int", "val": i}),
            Self::Double(d) => json!({"type": "double", "val": d}),
            Self::String(s) => json!({"type": "string", "val": s}),
            // Not zero-padded: 2020-1-5
            Self::Date(d) => json!({
                "type": "date",
                "val": format!("{}-{}-{}", d.year(), d.month(), d.day()),
            }),
            Self::DateTime(dt) => json!({
                "type": "datetime",
                "val": dt.to_rfc3339_opts(SecondsFormat::AutoSi, false),
            }),
            Self::Region(region) => region.to_ast(),
        }
    }

    /// Build a value from a dynamically typed JSON scalar
    ///
    /// `null`, arrays and objects have no literal form and are rejected, as
    /// are integers above `i64::MAX`.
    pub fn from_json(value: &Json) -> QueryResult<Self> {
        match value {
            Json::Bool(b) => Ok(Self::Bool(*b)),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Self::Int(i))
                } else if n.is_u64() {
                    Err(QueryError::UnsupportedLiteral(format!(
                        "integer {} is out of range for an int literal",
                        n
                    )))
                } else if let Some(f) = n.as_f64() {
                    Ok(Self::Double(f))
                } else {
                    Err(QueryError::UnsupportedLiteral(format!("number {}", n)))
                }
            }
            Json::String(s) => Ok(Self::String(s.clone())),
            Json::Null => Err(QueryError::UnsupportedLiteral("null".to_string())),
            Json::Array(_) => Err(QueryError::UnsupportedLiteral("array".to_string())),
            Json::Object(_) => Err(QueryError::UnsupportedLiteral("object".to_string())),
        }
    }

    /// Decode a `{type, val}` wire literal
    pub fn from_ast(ast: &Json) -> QueryResult<Self> {
        let tag = ast
            .get("type")
            .and_then(Json::as_str)
            .ok_or_else(|| QueryError::InvalidLiteral(format!("missing type tag in {}", ast)))?;
        let val = ast
            .get("val")
            .ok_or_else(|| QueryError::InvalidLiteral(format!("missing val in {}", ast)))?;
        let invalid = || QueryError::InvalidLiteral(format!("bad `{}` literal: {}", tag, val));

        match tag {
            "bool" => val.as_bool().map(Self::Bool).ok_or_else(invalid),
            "int" => val.as_i64().map(Self::Int).ok_or_else(invalid),
            "double" => val.as_f64().map(Self::Double).ok_or_else(invalid),
            "string" => val
                .as_str()
                .map(|s| Self::String(s.to_string()))
                .ok_or_else(invalid),
            "date" => val
                .as_str()
                .and_then(parse_unpadded_date)
                .map(Self::Date)
                .ok_or_else(invalid),
            "datetime" => val
                .as_str()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(Self::DateTime)
                .ok_or_else(invalid),
            "circle" | "polygon" => Region::from_ast(ast).map(Self::Region),
            other => Err(QueryError::UnsupportedLiteral(other.to_string())),
        }
    }
}

fn parse_unpadded_date(s: &str) -> Option<NaiveDate> {
    let mut parts = s.splitn(3, '-');
    let year = parts.next()?.parse().ok()?;
    let month = parts.next()?.parse().ok()?;
    let day = parts.next()?.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Double(d) => write!(f, "{}", d),
            Self::String(s) => write!(f, "{:?}", s),
            Self::Date(d) => write!(f, "{}", d),
            Self::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
            Self::Region(region) => write!(f, "{}", region.type_tag()),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Double(v as f64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Self::Date(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Self::DateTime(Utc.from_utc_datetime(&v).into())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Self::DateTime(v.into())
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(v: DateTime<FixedOffset>) -> Self {
        Self::DateTime(v)
    }
}

impl From<Region> for Value {
    fn from(v: Region) -> Self {
        Self::Region(v)
    }
}

fn ensure_finite_coords(coords: &[f64]) -> QueryResult<()> {
    match coords.iter().find(|c| !c.is_finite()) {
        Some(c) => Err(QueryError::UnsupportedLiteral(format!(
            "non-finite region coordinate {}",
            c
        ))),
        None => Ok(()),
    }
}

/// A geographic region, given as latitude/longitude pairs
#[derive(Debug, Clone, PartialEq)]
pub enum Region {
    /// Circle around a center point, radius in meters
    Circle { center: (f64, f64), radius: f64 },
    /// Closed polygon (first point need not be repeated)
    Polygon(Vec<(f64, f64)>),
}

impl Region {
    /// Create a circle region
    pub fn circle(lat: f64, lon: f64, radius: f64) -> QueryResult<Self> {
        ensure_finite_coords(&[lat, lon, radius])?;
        if radius <= 0.0 {
            return Err(QueryError::syntax(format!(
                "circle radius must be positive, got {}",
                radius
            )));
        }
        Ok(Self::Circle {
            center: (lat, lon),
            radius,
        })
    }

    /// Create a polygon region from at least three points
    pub fn polygon(points: impl IntoIterator<Item = (f64, f64)>) -> QueryResult<Self> {
        let points: Vec<_> = points.into_iter().collect();
        if points.len() < 3 {
            return Err(QueryError::syntax(format!(
                "polygon needs at least three points, got {}",
                points.len()
            )));
        }
        for (lat, lon) in &points {
            ensure_finite_coords(&[*lat, *lon])?;
        }
        Ok(Self::Polygon(points))
    }

    fn ensure_finite(&self) -> QueryResult<()> {
        match self {
            Self::Circle { center, radius } => ensure_finite_coords(&[center.0, center.1, *radius]),
            Self::Polygon(points) => points
                .iter()
                .try_for_each(|(lat, lon)| ensure_finite_coords(&[*lat, *lon])),
        }
    }

    /// Wire tag for this region
    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::Circle { .. } => "circle",
            Self::Polygon(_) => "polygon",
        }
    }

    /// Encode into a `{type, val}` wire literal
    pub fn to_ast(&self) -> Json {
        match self {
            Self::Circle { center, radius } => json!({
                "type": "circle",
                "val": {"center": [center.0, center.1], "radius": radius},
            }),
            Self::Polygon(points) => json!({
                "type": "polygon",
                "val": points.iter().map(|(lat, lon)| json!([lat, lon])).collect::<Vec<_>>(),
            }),
        }
    }

    fn from_ast(ast: &Json) -> QueryResult<Self> {
        let invalid = || QueryError::InvalidLiteral(format!("bad region literal: {}", ast));
        let point = |p: &Json| -> Option<(f64, f64)> {
            let pair = p.as_array()?;
            Some((pair.first()?.as_f64()?, pair.get(1)?.as_f64()?))
        };

        match ast.get("type").and_then(Json::as_str) {
            Some("circle") => {
                let val = ast.get("val").ok_or_else(invalid)?;
                let center = val.get("center").and_then(point).ok_or_else(invalid)?;
                let radius = val
                    .get("radius")
                    .and_then(Json::as_f64)
                    .ok_or_else(invalid)?;
                Ok(Self::Circle { center, radius })
            }
            Some("polygon") => {
                let points = ast
                    .get("val")
                    .and_then(Json::as_array)
                    .ok_or_else(invalid)?
                    .iter()
                    .map(point)
                    .collect::<Option<Vec<_>>>()
                    .ok_or_else(invalid)?;
                Ok(Self::Polygon(points))
            }
            _ => Err(invalid()),
        }
    }
}
