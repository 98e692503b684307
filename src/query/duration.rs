//! Durations and span-length constraints
//!
//! Durations are calendar-style: a bag of components rather than a single
//! number of seconds, because the search service interprets months and
//! years on the calendar.
//!
//! Wire format: `{seconds?, minutes?, hours?, days?, weeks?, months?, years?}`
//! with zero components omitted; an all-zero duration is `{"seconds": 0}`.

use serde_json::{json, Map, Value as Json};
use std::cmp::Ordering;

const SECONDS_PER_MINUTE: u64 = 60;
const SECONDS_PER_HOUR: u64 = 60 * SECONDS_PER_MINUTE;
const SECONDS_PER_DAY: u64 = 24 * SECONDS_PER_HOUR;
const SECONDS_PER_WEEK: u64 = 7 * SECONDS_PER_DAY;
const SECONDS_PER_MONTH: u64 = 30 * SECONDS_PER_DAY;
const SECONDS_PER_YEAR: u64 = 365 * SECONDS_PER_DAY;

/// A calendar duration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Duration {
    pub seconds: u64,
    pub minutes: u64,
    pub hours: u64,
    pub days: u64,
    pub weeks: u64,
    pub months: u64,
    pub years: u64,
}

impl Duration {
    /// Zero-length duration (adjacency)
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn seconds(n: u64) -> Self {
        Self {
            seconds: n,
            ..Self::default()
        }
    }

    pub fn minutes(n: u64) -> Self {
        Self {
            minutes: n,
            ..Self::default()
        }
    }

    pub fn hours(n: u64) -> Self {
        Self {
            hours: n,
            ..Self::default()
        }
    }

    pub fn days(n: u64) -> Self {
        Self {
            days: n,
            ..Self::default()
        }
    }

    pub fn weeks(n: u64) -> Self {
        Self {
            weeks: n,
            ..Self::default()
        }
    }

    pub fn months(n: u64) -> Self {
        Self {
            months: n,
            ..Self::default()
        }
    }

    pub fn years(n: u64) -> Self {
        Self {
            years: n,
            ..Self::default()
        }
    }

    /// Check if every component is zero
    pub fn is_zero(&self) -> bool {
        *self == Self::zero()
    }

    /// Approximate length in seconds (month = 30 days, year = 365 days)
    ///
    /// Only used to order durations against each other. Saturates at
    /// `u64::MAX`.
    pub fn approx_seconds(&self) -> u64 {
        [
            (self.seconds, 1),
            (self.minutes, SECONDS_PER_MINUTE),
            (self.hours, SECONDS_PER_HOUR),
            (self.days, SECONDS_PER_DAY),
            (self.weeks, SECONDS_PER_WEEK),
            (self.months, SECONDS_PER_MONTH),
            (self.years, SECONDS_PER_YEAR),
        ]
        .iter()
        .fold(0u64, |acc, (n, unit)| acc.saturating_add(n.saturating_mul(*unit)))
    }

    /// Compare by approximate length
    pub fn cmp_len(&self, other: &Self) -> Ordering {
        self.approx_seconds().cmp(&other.approx_seconds())
    }

    /// The shorter of two durations (`self` on ties)
    pub fn shortest(self, other: Self) -> Self {
        if other.cmp_len(&self) == Ordering::Less {
            other
        } else {
            self
        }
    }

    /// The longer of two durations (`self` on ties)
    pub fn longest(self, other: Self) -> Self {
        if other.cmp_len(&self) == Ordering::Greater {
            other
        } else {
            self
        }
    }

    fn components(&self) -> [(&'static str, &'static str, u64); 7] {
        [
            ("seconds", "s", self.seconds),
            ("minutes", "m", self.minutes),
            ("hours", "h", self.hours),
            ("days", "d", self.days),
            ("weeks", "w", self.weeks),
            ("months", "mo", self.months),
            ("years", "y", self.years),
        ]
    }

    /// Encode to the wire format
    pub fn to_ast(&self) -> Json {
        if self.is_zero() {
            return json!({"seconds": 0});
        }
        let map: Map<String, Json> = self
            .components()
            .iter()
            .filter(|(_, _, n)| *n > 0)
            .map(|(name, _, n)| (name.to_string(), json!(n)))
            .collect();
        Json::Object(map)
    }
}

impl std::ops::Add for Duration {
    type Output = Duration;

    fn add(self, rhs: Duration) -> Duration {
        Duration {
            seconds: self.seconds.saturating_add(rhs.seconds),
            minutes: self.minutes.saturating_add(rhs.minutes),
            hours: self.hours.saturating_add(rhs.hours),
            days: self.days.saturating_add(rhs.days),
            weeks: self.weeks.saturating_add(rhs.weeks),
            months: self.months.saturating_add(rhs.months),
            years: self.years.saturating_add(rhs.years),
        }
    }
}

impl std::fmt::Display for Duration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_zero() {
            return write!(f, "0s");
        }
        // Largest unit first: 1d12h
        for (_, unit, n) in self.components().iter().rev() {
            if *n > 0 {
                write!(f, "{}{}", n, unit)?;
            }
        }
        Ok(())
    }
}

/// Constraint on how long a span lasts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationConstraint {
    /// The span lasts exactly this long
    Exactly(Duration),
    /// The span lasts between the optional bounds (inclusive)
    Range {
        at_least: Option<Duration>,
        at_most: Option<Duration>,
    },
}

impl DurationConstraint {
    pub fn at_least(d: Duration) -> Self {
        Self::Range {
            at_least: Some(d),
            at_most: None,
        }
    }

    pub fn at_most(d: Duration) -> Self {
        Self::Range {
            at_least: None,
            at_most: Some(d),
        }
    }

    pub fn between(min: Duration, max: Duration) -> Self {
        Self::Range {
            at_least: Some(min),
            at_most: Some(max),
        }
    }

    /// A range with no bounds constrains nothing
    pub fn is_unbounded(&self) -> bool {
        matches!(
            self,
            Self::Range {
                at_least: None,
                at_most: None
            }
        )
    }

    /// Check whether an exact length satisfies this constraint
    pub fn admits(&self, d: &Duration) -> bool {
        match self {
            Self::Exactly(exact) => exact.cmp_len(d) == Ordering::Equal,
            Self::Range { at_least, at_most } => {
                at_least.map_or(true, |min| min.cmp_len(d) != Ordering::Greater)
                    && at_most.map_or(true, |max| max.cmp_len(d) != Ordering::Less)
            }
        }
    }

    /// Encode to the wire format of the `for` key
    pub fn to_ast(&self) -> Json {
        match self {
            Self::Exactly(d) => json!({"exactly": d.to_ast()}),
            Self::Range { at_least, at_most } => {
                let mut map = Map::new();
                if let Some(min) = at_least {
                    map.insert("at_least".to_string(), min.to_ast());
                }
                if let Some(max) = at_most {
                    map.insert("at_most".to_string(), max.to_ast());
                }
                Json::Object(map)
            }
        }
    }
}

impl std::fmt::Display for DurationConstraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exactly(d) => write!(f, "for == {}", d),
            Self::Range { at_least, at_most } => match (at_least, at_most) {
                (Some(min), Some(max)) => write!(f, "for {}..{}", min, max),
                (Some(min), None) => write!(f, "for >= {}", min),
                (None, Some(max)) => write!(f, "for <= {}", max),
                (None, None) => write!(f, "for any"),
            },
        }
    }
}
