//! Field references
//!
//! An [`EventPath`] names a field inside "the current event" and is not yet
//! tied to any stream. A [`StreamPath`] is the same path bound to a
//! [`Stream`]. Both are immutable: extending a path returns a new one.
//!
//! Paths can be built fluently or parsed from a literal:
//!
//! ```text
//! EventPath::root().field("engine").field("rpm")
//! EventPath::parse("engine.rpm")
//! EventPath::parse("tags.\"zone.id\"")     // quoted segment keeps its dot
//! ```

use crate::query::condition::Condition;
use crate::query::error::{QueryError, QueryResult};
use chrono::FixedOffset;
use nom::{
    branch::alt,
    bytes::complete::take_while1,
    character::complete::char,
    combinator::{all_consuming, map},
    multi::separated_list1,
    sequence::delimited,
    IResult,
};
use serde_json::{json, Map, Value as Json};

/// Leading segment of every wire path
const EVENT_ROOT: &str = "event";

/// A field path inside the current event
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct EventPath {
    segments: Vec<String>,
}

impl EventPath {
    /// The event itself (no segments)
    pub fn root() -> Self {
        Self::default()
    }

    /// Create a path from explicit segments
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a dotted path literal
    pub fn parse(literal: &str) -> QueryResult<Self> {
        match parse_segments(literal.trim()) {
            Ok((_, segments)) => Ok(Self { segments }),
            Err(e) => Err(QueryError::syntax(format!(
                "invalid path literal '{}': {:?}",
                literal, e
            ))),
        }
    }

    /// Extend the path by one field
    pub fn field(&self, name: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(name.into());
        Self { segments }
    }

    /// Extend the path by one segment that need not be an identifier
    ///
    /// Use this for names containing dots, spaces or reserved words; the
    /// whole string becomes a single segment.
    pub fn index(&self, segment: impl Into<String>) -> Self {
        self.field(segment)
    }

    /// Ordered path segments
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Wire form: `["event", ...segments]`
    pub fn to_wire(&self) -> Json {
        let mut wire = Vec::with_capacity(self.segments.len() + 1);
        wire.push(Json::from(EVENT_ROOT));
        wire.extend(self.segments.iter().map(|s| Json::from(s.as_str())));
        Json::Array(wire)
    }
}

impl std::fmt::Display for EventPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", EVENT_ROOT)?;
        for segment in &self.segments {
            if is_identifier(segment) {
                write!(f, ".{}", segment)?;
            } else {
                write!(f, ".\"{}\"", segment)?;
            }
        }
        Ok(())
    }
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(is_identifier_char)
}

fn parse_quoted_segment(input: &str) -> IResult<&str, String> {
    map(
        delimited(char('"'), take_while1(|c: char| c != '"'), char('"')),
        String::from,
    )(input)
}

fn parse_bare_segment(input: &str) -> IResult<&str, String> {
    map(take_while1(is_identifier_char), String::from)(input)
}

fn parse_segments(input: &str) -> IResult<&str, Vec<String>> {
    all_consuming(separated_list1(
        char('.'),
        alt((parse_quoted_segment, parse_bare_segment)),
    ))(input)
}

/// A named event stream
///
/// Streams are shared by reference between the conditions that use them;
/// a timezone override produces a copy instead of mutating the original.
#[derive(Debug, Clone)]
pub struct Stream {
    name: String,
    metadata: Map<String, Json>,
    filter: Option<Box<Condition>>,
    timezone: Option<FixedOffset>,
}

impl Stream {
    /// Create a reference to the stream with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            metadata: Map::new(),
            filter: None,
            timezone: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn filter(&self) -> Option<&Condition> {
        self.filter.as_deref()
    }

    pub fn timezone(&self) -> Option<FixedOffset> {
        self.timezone
    }

    /// Attach a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Json>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Restrict the stream to events matching a condition
    ///
    /// The condition must use an unbound event path.
    pub fn with_filter(mut self, condition: Condition) -> QueryResult<Self> {
        if let Some(other) = condition.stream() {
            return Err(QueryError::syntax(format!(
                "filter for stream `{}` must use an event path, found path bound to stream `{}`",
                self.name,
                other.name()
            )));
        }
        self.filter = Some(Box::new(condition));
        Ok(self)
    }

    /// Copy of this stream with a default timezone
    pub fn with_timezone(&self, timezone: FixedOffset) -> Self {
        Self {
            timezone: Some(timezone),
            ..self.clone()
        }
    }

    /// Path to a field of this stream's events
    pub fn field(&self, name: impl Into<String>) -> StreamPath {
        self.path(EventPath::root().field(name))
    }

    /// Path to a segment that need not be an identifier
    pub fn index(&self, segment: impl Into<String>) -> StreamPath {
        self.path(EventPath::root().index(segment))
    }

    /// Bind an event path to this stream
    pub fn path(&self, path: EventPath) -> StreamPath {
        StreamPath {
            stream: self.clone(),
            path,
        }
    }

    /// Wire reference using the stream's own timezone
    pub fn to_ref(&self) -> Json {
        self.to_ref_with(None)
    }

    /// Wire reference, with a timezone that takes precedence over the
    /// stream's default
    pub(crate) fn to_ref_with(&self, timezone: Option<FixedOffset>) -> Json {
        let mut map = Map::new();
        map.insert("name".to_string(), json!(self.name));
        if let Some(tz) = timezone.or(self.timezone) {
            map.insert("tz".to_string(), json!(tz.to_string()));
        }
        if !self.metadata.is_empty() {
            map.insert("metadata".to_string(), Json::Object(self.metadata.clone()));
        }
        if let Some(filter) = &self.filter {
            map.insert("filter".to_string(), filter.to_ast());
        }
        Json::Object(map)
    }
}

impl PartialEq for Stream {
    /// Streams are identified by name and filter
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.filter == other.filter
    }
}

/// A field path bound to a stream
#[derive(Debug, Clone, PartialEq)]
pub struct StreamPath {
    stream: Stream,
    path: EventPath,
}

impl StreamPath {
    pub fn field(&self, name: impl Into<String>) -> Self {
        Self {
            stream: self.stream.clone(),
            path: self.path.field(name),
        }
    }

    pub fn index(&self, segment: impl Into<String>) -> Self {
        Self {
            stream: self.stream.clone(),
            path: self.path.index(segment),
        }
    }

    pub fn stream(&self) -> &Stream {
        &self.stream
    }

    pub fn event_path(&self) -> &EventPath {
        &self.path
    }

    pub fn segments(&self) -> &[String] {
        self.path.segments()
    }
}

impl std::fmt::Display for StreamPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.stream.name, self.path)
    }
}

/// Either kind of path, as stored in a condition
#[derive(Debug, Clone, PartialEq)]
pub enum PathRef {
    Event(EventPath),
    Stream(StreamPath),
}

impl PathRef {
    pub fn event_path(&self) -> &EventPath {
        match self {
            Self::Event(path) => path,
            Self::Stream(path) => path.event_path(),
        }
    }

    pub fn stream(&self) -> Option<&Stream> {
        match self {
            Self::Event(_) => None,
            Self::Stream(path) => Some(path.stream()),
        }
    }

    pub fn to_wire(&self) -> Json {
        self.event_path().to_wire()
    }
}

impl std::fmt::Display for PathRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Event(path) => write!(f, "{}", path),
            Self::Stream(path) => write!(f, "{}", path),
        }
    }
}

impl From<EventPath> for PathRef {
    fn from(path: EventPath) -> Self {
        Self::Event(path)
    }
}

impl From<StreamPath> for PathRef {
    fn from(path: StreamPath) -> Self {
        Self::Stream(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_does_not_mutate_receiver() {
        let base = EventPath::root().field("engine");
        let extended = base.field("rpm");

        assert_eq!(base.segments(), ["engine"]);
        assert_eq!(extended.segments(), ["engine", "rpm"]);
    }

    #[test]
    fn test_parse_matches_fluent_form() {
        let parsed = EventPath::parse("engine.rpm").unwrap();
        let fluent = EventPath::root().field("engine").field("rpm");
        assert_eq!(parsed, fluent);
    }

    #[test]
    fn test_parse_quoted_segment() {
        let parsed = EventPath::parse("tags.\"zone.id\".ñame").unwrap();
        assert_eq!(parsed.segments(), ["tags", "zone.id", "ñame"]);
        assert_eq!(parsed, EventPath::root().field("tags").index("zone.id").field("ñame"));
    }

    #[test]
    fn test_parse_rejects_malformed_literals() {
        assert!(EventPath::parse("").is_err());
        assert!(EventPath::parse("a..b").is_err());
        assert!(EventPath::parse("a.\"open").is_err());
        assert!(EventPath::parse("a b").is_err());
        assert!(EventPath::parse("a.\"\"").is_err());
        assert!(EventPath::parse("\"\"").is_err());
    }

    #[test]
    fn test_wire_form_and_display() {
        let path = EventPath::new(["a", "b.c"]);
        assert_eq!(path.to_wire(), json!(["event", "a", "b.c"]));
        assert_eq!(path.to_string(), "event.a.\"b.c\"");
    }

    #[test]
    fn test_stream_path_equality() {
        let s = Stream::new("S");
        assert_eq!(s.field("x"), Stream::new("S").field("x"));
        assert_ne!(s.field("x"), Stream::new("T").field("x"));
        assert_ne!(s.field("x"), s.field("y"));
    }

    #[test]
    fn test_timezone_override_is_copy_on_bind() {
        let s = Stream::new("S");
        let tz = FixedOffset::east_opt(3600).unwrap();
        let local = s.with_timezone(tz);

        assert_eq!(s.timezone(), None);
        assert_eq!(local.timezone(), Some(tz));
        assert_eq!(local.to_ref(), json!({"name": "S", "tz": "+01:00"}));
    }

    #[test]
    fn test_stream_ref_with_metadata() {
        let s = Stream::new("vehicles").with_metadata("fleet", "north");
        assert_eq!(
            s.to_ref(),
            json!({"name": "vehicles", "metadata": {"fleet": "north"}})
        );
    }
}
