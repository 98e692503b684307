//! Query error types
//!
//! Defines all error conditions that can occur while building or serializing
//! a query. Every error is raised synchronously, so a query that fails to
//! build never reaches the transport layer.

use thiserror::Error;

/// Errors that can occur during query construction and serialization
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// Structural misuse of the query builder
    #[error("Query syntax error: {0}")]
    Syntax(String),

    /// Operator cannot be applied to the given kind of value
    #[error("Operator `{op}` cannot be used with a {kind} value (path {path})")]
    IncompatibleOperator {
        path: String,
        op: String,
        kind: &'static str,
    },

    /// A combinator with no children reached serialization
    #[error("Empty `{0}` combinator: at least one child is required")]
    EmptyCombinator(&'static str),

    /// A switch reached serialization without a stream
    #[error("Switch must be bound to a stream before it can be serialized")]
    UnboundSwitch,

    /// A switch was bound a second time
    #[error("Switch is already bound to stream `{0}`")]
    AlreadyBound(String),

    /// Merging two span constraint sets produced an unsatisfiable interval
    #[error("Conflicting duration constraints: {left} vs {right}")]
    ConflictingDuration { left: String, right: String },

    /// The literal encoder was handed a value it cannot tag
    #[error("Unsupported literal type: {0}")]
    UnsupportedLiteral(String),

    /// A wire literal could not be decoded
    #[error("Invalid literal: {0}")]
    InvalidLiteral(String),
}

impl QueryError {
    /// Whether this error belongs to the query-syntax family
    /// (wrong statement count, unbound switch, incompatible operator,
    /// empty combinator).
    pub fn is_syntax_error(&self) -> bool {
        matches!(
            self,
            Self::Syntax(_)
                | Self::IncompatibleOperator { .. }
                | Self::EmptyCombinator(_)
                | Self::UnboundSwitch
                | Self::AlreadyBound(_)
        )
    }

    pub(crate) fn syntax(message: impl Into<String>) -> Self {
        Self::Syntax(message.into())
    }
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = QueryError::ConflictingDuration {
            left: "for >= 5d".to_string(),
            right: "for <= 3d".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Conflicting duration constraints: for >= 5d vs for <= 3d"
        );

        let err = QueryError::IncompatibleOperator {
            path: "event.area".to_string(),
            op: "!=".to_string(),
            kind: "polygon",
        };
        assert_eq!(
            err.to_string(),
            "Operator `!=` cannot be used with a polygon value (path event.area)"
        );
    }

    #[test]
    fn test_syntax_family() {
        assert!(QueryError::syntax("x").is_syntax_error());
        assert!(QueryError::UnboundSwitch.is_syntax_error());
        assert!(QueryError::EmptyCombinator("or").is_syntax_error());
        assert!(!QueryError::UnsupportedLiteral("null".into()).is_syntax_error());
        assert!(!QueryError::ConflictingDuration {
            left: String::new(),
            right: String::new()
        }
        .is_syntax_error());
    }
}
