//! Span constraint normalization
//!
//! Fluent chaining wraps spans in single-child conjunctions, each carrying
//! its own `within` / `after` / `for` annotations. Merging collapses those
//! nested constraint sets into one canonical set:
//!
//! - `within` takes the shortest bound (a missing bound constrains nothing)
//! - `after` takes the longest bound
//! - `for` intersects the two duration intervals, failing when the result
//!   is empty

use crate::query::duration::{Duration, DurationConstraint};
use crate::query::error::{QueryError, QueryResult};
use serde_json::Value as Json;

/// Gap and length annotations attached to a span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpanConstraints {
    /// Maximum gap from the end of the previous span
    pub within: Option<Duration>,
    /// Minimum gap from the end of the previous span
    pub after: Option<Duration>,
    /// How long the span itself lasts
    pub duration: Option<DurationConstraint>,
}

impl SpanConstraints {
    pub fn within(d: Duration) -> Self {
        Self {
            within: Some(d),
            ..Self::default()
        }
    }

    pub fn after(d: Duration) -> Self {
        Self {
            after: Some(d),
            ..Self::default()
        }
    }

    pub fn lasting(constraint: DurationConstraint) -> Self {
        Self {
            duration: Some(constraint),
            ..Self::default()
        }
    }

    /// Check if no constraint is set
    pub fn is_empty(&self) -> bool {
        self.within.is_none() && self.after.is_none() && self.duration.is_none()
    }

    /// Check if a gap (`within` or `after`) is set
    pub fn has_gap(&self) -> bool {
        self.within.is_some() || self.after.is_some()
    }

    /// Merge two constraint sets into one canonical set
    pub fn merge(&self, other: &Self) -> QueryResult<Self> {
        let merged = Self {
            within: match (self.within, other.within) {
                (Some(a), Some(b)) => Some(a.shortest(b)),
                (a, b) => a.or(b),
            },
            after: match (self.after, other.after) {
                (Some(a), Some(b)) => Some(a.longest(b)),
                (a, b) => a.or(b),
            },
            duration: merge_durations(self.duration, other.duration)?,
        };

        tracing::debug!(left = %self, right = %other, merged = %merged, "Merged span constraints");
        Ok(merged)
    }

    /// Attach the constraints as sibling keys of a node's AST
    pub(crate) fn apply(&self, ast: &mut Json) {
        let Some(map) = ast.as_object_mut() else {
            return;
        };
        if let Some(within) = self.within {
            map.insert("within".to_string(), within.to_ast());
        }
        if let Some(after) = self.after {
            map.insert("after".to_string(), after.to_ast());
        }
        if let Some(duration) = self.duration {
            map.insert("for".to_string(), duration.to_ast());
        }
    }
}

impl std::fmt::Display for SpanConstraints {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts = Vec::new();
        if let Some(within) = self.within {
            parts.push(format!("within {}", within));
        }
        if let Some(after) = self.after {
            parts.push(format!("after {}", after));
        }
        if let Some(duration) = self.duration {
            parts.push(duration.to_string());
        }
        if parts.is_empty() {
            write!(f, "unconstrained")
        } else {
            write!(f, "[{}]", parts.join(", "))
        }
    }
}

fn conflict(left: &DurationConstraint, right: &DurationConstraint) -> QueryError {
    QueryError::ConflictingDuration {
        left: left.to_string(),
        right: right.to_string(),
    }
}

/// Drop unbounded ranges and reject inverted ones
fn normalize(constraint: Option<DurationConstraint>) -> QueryResult<Option<DurationConstraint>> {
    match constraint {
        Some(DurationConstraint::Range {
            at_least: Some(min),
            at_most: Some(max),
        }) if min.cmp_len(&max) == std::cmp::Ordering::Greater => Err(conflict(
            &DurationConstraint::at_least(min),
            &DurationConstraint::at_most(max),
        )),
        Some(c) if c.is_unbounded() => Ok(None),
        other => Ok(other),
    }
}

/// Intersect two duration intervals
///
/// An exact duration survives a merge with a range only if the range admits
/// it; it is never silently dropped.
pub fn merge_durations(
    left: Option<DurationConstraint>,
    right: Option<DurationConstraint>,
) -> QueryResult<Option<DurationConstraint>> {
    use DurationConstraint::{Exactly, Range};

    match (normalize(left)?, normalize(right)?) {
        (None, other) | (other, None) => Ok(other),
        (Some(a @ Exactly(x)), Some(b @ Exactly(y))) => {
            if a.admits(&y) {
                Ok(Some(Exactly(x)))
            } else {
                Err(conflict(&a, &b))
            }
        }
        (Some(exact @ Exactly(x)), Some(range @ Range { .. }))
        | (Some(range @ Range { .. }), Some(exact @ Exactly(x))) => {
            if range.admits(&x) {
                Ok(Some(exact))
            } else {
                Err(conflict(&exact, &range))
            }
        }
        (
            Some(
                a @ Range {
                    at_least: min_a,
                    at_most: max_a,
                },
            ),
            Some(
                b @ Range {
                    at_least: min_b,
                    at_most: max_b,
                },
            ),
        ) => {
            let at_least = match (min_a, min_b) {
                (Some(x), Some(y)) => Some(x.longest(y)),
                (x, y) => x.or(y),
            };
            let at_most = match (max_a, max_b) {
                (Some(x), Some(y)) => Some(x.shortest(y)),
                (x, y) => x.or(y),
            };
            if let (Some(min), Some(max)) = (at_least, at_most) {
                if min.cmp_len(&max) == std::cmp::Ordering::Greater {
                    return Err(conflict(&a, &b));
                }
            }
            Ok(Some(Range { at_least, at_most }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at_least(d: Duration) -> SpanConstraints {
        SpanConstraints::lasting(DurationConstraint::at_least(d))
    }

    fn at_most(d: Duration) -> SpanConstraints {
        SpanConstraints::lasting(DurationConstraint::at_most(d))
    }

    fn exactly(d: Duration) -> SpanConstraints {
        SpanConstraints::lasting(DurationConstraint::Exactly(d))
    }

    #[test]
    fn test_within_takes_minimum_commutatively() {
        let a = SpanConstraints::within(Duration::minutes(5));
        let b = SpanConstraints::within(Duration::seconds(30));

        let ab = a.merge(&b).unwrap();
        let ba = b.merge(&a).unwrap();
        assert_eq!(ab.within, Some(Duration::seconds(30)));
        assert_eq!(ab, ba);
    }

    #[test]
    fn test_missing_within_absorbs() {
        let a = SpanConstraints::within(Duration::minutes(5));
        let merged = a.merge(&SpanConstraints::default()).unwrap();
        assert_eq!(merged.within, Some(Duration::minutes(5)));
    }

    #[test]
    fn test_after_takes_maximum_commutatively() {
        let a = SpanConstraints::after(Duration::hours(1));
        let b = SpanConstraints::after(Duration::minutes(10));

        assert_eq!(a.merge(&b).unwrap().after, Some(Duration::hours(1)));
        assert_eq!(a.merge(&b).unwrap(), b.merge(&a).unwrap());
    }

    #[test]
    fn test_range_merge_intersects() {
        let merged = at_least(Duration::days(1))
            .merge(&at_most(Duration::days(3)))
            .unwrap();
        assert_eq!(
            merged.duration,
            Some(DurationConstraint::between(Duration::days(1), Duration::days(3)))
        );
    }

    #[test]
    fn test_empty_range_intersection_is_rejected() {
        let err = at_least(Duration::days(5))
            .merge(&at_most(Duration::days(3)))
            .unwrap_err();
        assert_eq!(
            err,
            QueryError::ConflictingDuration {
                left: "for >= 5d".to_string(),
                right: "for <= 3d".to_string(),
            }
        );
    }

    #[test]
    fn test_inverted_range_is_rejected_on_its_own() {
        let inverted = SpanConstraints::lasting(DurationConstraint::between(
            Duration::days(5),
            Duration::days(3),
        ));
        let err = SpanConstraints::default().merge(&inverted).unwrap_err();
        assert_eq!(
            err,
            QueryError::ConflictingDuration {
                left: "for >= 5d".to_string(),
                right: "for <= 3d".to_string(),
            }
        );
        assert!(merge_durations(inverted.duration, None).is_err());
    }

    #[test]
    fn test_huge_gaps_merge_without_overflow() {
        let huge = SpanConstraints::within(Duration::years(u64::MAX / 1000));
        let merged = huge.merge(&SpanConstraints::within(Duration::seconds(1))).unwrap();
        assert_eq!(merged.within, Some(Duration::seconds(1)));
    }

    #[test]
    fn test_differing_exact_durations_conflict() {
        let err = exactly(Duration::minutes(1))
            .merge(&exactly(Duration::minutes(2)))
            .unwrap_err();
        assert!(matches!(err, QueryError::ConflictingDuration { .. }));

        // Same length, different spelling
        let merged = exactly(Duration::minutes(1))
            .merge(&exactly(Duration::seconds(60)))
            .unwrap();
        assert_eq!(
            merged.duration,
            Some(DurationConstraint::Exactly(Duration::minutes(1)))
        );
    }

    #[test]
    fn test_exact_inside_range_is_kept() {
        let merged = exactly(Duration::minutes(10))
            .merge(&at_least(Duration::minutes(10)))
            .unwrap();
        assert_eq!(
            merged.duration,
            Some(DurationConstraint::Exactly(Duration::minutes(10)))
        );

        let merged = at_most(Duration::hours(1))
            .merge(&exactly(Duration::minutes(10)))
            .unwrap();
        assert_eq!(
            merged.duration,
            Some(DurationConstraint::Exactly(Duration::minutes(10)))
        );
    }

    #[test]
    fn test_exact_outside_range_conflicts() {
        let err = exactly(Duration::minutes(10))
            .merge(&at_most(Duration::minutes(5)))
            .unwrap_err();
        assert!(matches!(err, QueryError::ConflictingDuration { .. }));
    }

    #[test]
    fn test_unbounded_range_is_dropped() {
        let unbounded = SpanConstraints::lasting(DurationConstraint::Range {
            at_least: None,
            at_most: None,
        });
        let merged = unbounded.merge(&SpanConstraints::default()).unwrap();
        assert!(merged.is_empty());
    }

    #[test]
    fn test_apply_adds_sibling_keys() {
        let constraints = SpanConstraints {
            within: Some(Duration::seconds(5)),
            after: None,
            duration: Some(DurationConstraint::at_least(Duration::minutes(1))),
        };
        let mut ast = serde_json::json!({"op": "==", "path": ["event", "x"]});
        constraints.apply(&mut ast);
        assert_eq!(
            ast,
            serde_json::json!({
                "op": "==",
                "path": ["event", "x"],
                "within": {"seconds": 5},
                "for": {"at_least": {"minutes": 1}},
            })
        );
    }
}
