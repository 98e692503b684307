//! # Spanql
//!
//! Embedded query language for temporal event search. Queries are built from
//! ordinary Rust expressions, validated as they are built, and serialized to
//! the JSON AST accepted by the search service.
//!
//! ## Features
//!
//! - **Typed literals**: booleans, numbers, strings, dates, datetimes and regions
//! - **Span patterns**: conditions that hold `for` a duration, `within` or `after` a gap
//! - **Combinators**: `&`, `|`, parallel groupings, sequences and state switches
//! - **Projections**: choose and compute the fields returned per stream
//!
//! ## Modules
//!
//! - [`query`]: Query builder and JSON serialization
//! - [`config`]: TOML configuration and logging setup
//! - [`client`]: HTTP transport to the search service
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use spanql::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = Stream::new("engine");
//!
//!     // RPM above 6000 for at least 5 minutes, then a temperature alarm
//!     let overrev = engine.field("rpm").gt(6000)?.for_at_least(Duration::minutes(5))?;
//!     let alarm = engine.field("temp_alarm").equals(true)?;
//!
//!     let query = Query::select(overrev.then(alarm)).build()?;
//!     println!("{}", query.to_json_string()?);
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod query;

// Re-export top-level types for convenience
pub use query::{Node, Query, QueryBuilder, QueryError, QueryResult};

pub use config::{ClientConfig, Config, ConfigError, LoggingConfig};

pub use client::{ClientError, SearchClient, SearchResponse};

/// Everything needed to write queries
pub mod prelude {
    pub use crate::query::{
        all_of, any_of, during, Compare, Condition, Duration, DurationConstraint, EventPath,
        Node, Operator, ProjExpr, Projection, Query, QueryResult, Region, SpanConstraints,
        Stream, StreamPath, Temporal, Value,
    };
}
