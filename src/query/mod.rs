//! Spanql Query Builder
//!
//! Builds temporal event-search queries and serializes them to the JSON AST
//! accepted by the search service:
//!
//! - **Value**: Typed literals and geographic regions
//! - **Path**: Event paths, streams and stream-bound paths
//! - **Condition**: Comparisons of a path against a literal
//! - **Node**: Conjunction, disjunction, parallel, sequence and switch combinators
//! - **Merge**: Span constraints (`within`, `after`, `for`) and their merge rules
//! - **Projection**: Output fields per stream
//! - **AST**: Statements and the final query document
//!
//! # Examples
//!
//! ## Spans
//!
//! ```rust,ignore
//! use spanql::prelude::*;
//!
//! let cars = Stream::new("cars");
//!
//! // Speeding for at least a minute
//! let speeding = cars.field("speed").gt(120)?.for_at_least(Duration::minutes(1))?;
//!
//! let query = Query::select(speeding).build()?;
//! ```
//!
//! ## Sequences
//!
//! ```rust,ignore
//! // Door opens, then the alarm fires within 30 seconds
//! let door = Stream::new("door");
//! let alarm = Stream::new("alarm");
//!
//! let pattern = door.field("open").equals(true)?
//!     .then_within(Duration::seconds(30), alarm.field("on").equals(true)?)?;
//! ```
//!
//! ## Transitions
//!
//! ```rust,ignore
//! let light = Stream::new("light");
//! let state = EventPath::parse("state")?;
//! let blink = light.switch([
//!     vec![state.equals("red")?],
//!     vec![state.equals("green")?],
//! ])?;
//! ```

mod ast;
mod condition;
mod duration;
mod error;
mod merge;
mod node;
mod path;
mod projection;
mod value;

pub use ast::{Query, QueryBuilder, Select, Statement, TimeBound};
pub use condition::{Argument, Compare, Condition, Operator};
pub use duration::{Duration, DurationConstraint};
pub use error::{QueryError, QueryResult};
pub use merge::{merge_durations, SpanConstraints};
pub use node::{all_of, any_of, during, And, Node, Or, Par, ParMode, Serial, Switch, Temporal};
pub use path::{EventPath, PathRef, Stream, StreamPath};
pub use projection::{ArithOp, ProjExpr, Projection};
pub use value::{Region, Value};
