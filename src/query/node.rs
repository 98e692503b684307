//! Combinators
//!
//! Conditions compose into a tree of [`Node`]s:
//!
//! - `a & b` conjunction ([`And`]), right-folded into binary `&&` nodes
//! - `a | b` disjunction ([`Or`]), right-folded into binary `||` nodes
//! - [`any_of`], [`all_of`], [`during`] n-ary groupings ([`Par`])
//! - `a >> b` or `a.then(b)` sequences ([`Serial`])
//! - [`Switch`] transitions between event states of one stream
//!
//! Gap and length annotations (`within`, `after`, `for`) come from the
//! [`Temporal`] trait. Each annotation wraps its receiver in a single-child
//! conjunction, and nested wrappers are merged into one canonical
//! constraint set as they are built.

use crate::query::condition::Condition;
use crate::query::duration::{Duration, DurationConstraint};
use crate::query::error::{QueryError, QueryResult};
use crate::query::merge::SpanConstraints;
use crate::query::path::Stream;
use serde_json::{json, Value as Json};
use std::ops::{BitAnd, BitOr, Shr};

/// A node of the query tree
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Condition(Condition),
    And(And),
    Or(Or),
    Par(Par),
    Serial(Serial),
    Switch(Switch),
}

impl Node {
    /// Short name of the node kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Condition(_) => "condition",
            Self::And(_) => "and",
            Self::Or(_) => "or",
            Self::Par(par) => par.mode.as_str(),
            Self::Serial(_) => "serial",
            Self::Switch(_) => "switch",
        }
    }

    /// Serialize to the wire AST
    pub fn to_ast(&self) -> QueryResult<Json> {
        match self {
            Self::Condition(cond) => Ok(cond.to_ast()),
            Self::And(and) => and.to_ast(),
            Self::Or(or) => or.to_ast(),
            Self::Par(par) => par.to_ast(),
            Self::Serial(serial) => serial.to_ast(),
            Self::Switch(switch) => switch.to_ast(),
        }
    }

    /// Unwrap combinators that serialize as their only child
    fn simplify(self) -> Node {
        match self {
            Self::Or(Or { mut children }) | Self::Serial(Serial { steps: mut children })
                if children.len() == 1 =>
            {
                match children.pop() {
                    Some(only) => only.simplify(),
                    None => Self::Or(Or { children }),
                }
            }
            other => other,
        }
    }
}

impl From<Condition> for Node {
    fn from(cond: Condition) -> Self {
        Self::Condition(cond)
    }
}

impl From<And> for Node {
    fn from(and: And) -> Self {
        Self::And(and)
    }
}

impl From<Or> for Node {
    fn from(or: Or) -> Self {
        Self::Or(or)
    }
}

impl From<Par> for Node {
    fn from(par: Par) -> Self {
        Self::Par(par)
    }
}

impl From<Serial> for Node {
    fn from(serial: Serial) -> Self {
        Self::Serial(serial)
    }
}

impl From<Switch> for Node {
    fn from(switch: Switch) -> Self {
        Self::Switch(switch)
    }
}

/// Right-associated binary fold: `[a, b, c]` becomes `a op (b op c)`
fn fold_right(expr: &str, mut asts: Vec<Json>) -> Option<Json> {
    tracing::trace!(expr, operands = asts.len(), "Folding combinator");
    let mut acc = asts.pop()?;
    while let Some(lhs) = asts.pop() {
        acc = json!({"expr": expr, "args": [lhs, acc]});
    }
    Some(acc)
}

/// Conjunction of spans, with optional gap and length constraints
#[derive(Debug, Clone, PartialEq, Default)]
pub struct And {
    children: Vec<Node>,
    constraints: SpanConstraints,
}

impl And {
    /// Create a conjunction
    ///
    /// Unconstrained nested conjunctions are spliced into this one, so
    /// `(a & b) & c` and `a & (b & c)` build the same node.
    pub fn new<I, N>(children: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<Node>,
    {
        let mut flat = Vec::new();
        for child in children {
            let child: Node = child.into();
            match child {
                Node::And(inner) if inner.constraints.is_empty() => flat.extend(inner.children),
                other => flat.push(other),
            }
        }

        if flat.len() == 1 {
            if let Some(Node::And(only)) = flat.pop() {
                return only;
            }
        }
        Self {
            children: flat,
            constraints: SpanConstraints::default(),
        }
    }

    /// Single-child wrapper around a node
    pub fn wrap(node: impl Into<Node>) -> Self {
        Self {
            children: vec![node.into()],
            constraints: SpanConstraints::default(),
        }
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn constraints(&self) -> &SpanConstraints {
        &self.constraints
    }

    /// Add constraints, merging them with any already present
    pub fn constrain(self, extra: SpanConstraints) -> QueryResult<Self> {
        let mut base = self.collapse()?;
        base.constraints = base.constraints.merge(&extra)?;
        Ok(base)
    }

    /// Merge a single-child wrapper into the conjunction it wraps
    fn collapse(mut self) -> QueryResult<Self> {
        if self.children.len() != 1 {
            return Ok(self);
        }
        match self.children.pop().map(Node::simplify) {
            Some(Node::And(inner)) => {
                let constraints = inner.constraints.merge(&self.constraints)?;
                Self {
                    children: inner.children,
                    constraints,
                }
                .collapse()
            }
            Some(other) => {
                self.children.push(other);
                Ok(self)
            }
            None => Ok(self),
        }
    }

    pub fn to_ast(&self) -> QueryResult<Json> {
        let asts = self
            .children
            .iter()
            .map(Node::to_ast)
            .collect::<QueryResult<Vec<_>>>()?;
        let mut ast = fold_right("&&", asts).ok_or(QueryError::EmptyCombinator("and"))?;
        self.constraints.apply(&mut ast);
        Ok(ast)
    }
}

/// Disjunction of spans
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Or {
    children: Vec<Node>,
}

impl Or {
    /// Create a disjunction, splicing in nested disjunctions
    pub fn new<I, N>(children: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<Node>,
    {
        let mut flat = Vec::new();
        for child in children {
            let child: Node = child.into();
            match child {
                Node::Or(inner) => flat.extend(inner.children),
                other => flat.push(other),
            }
        }
        Self { children: flat }
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn to_ast(&self) -> QueryResult<Json> {
        let asts = self
            .children
            .iter()
            .map(Node::to_ast)
            .collect::<QueryResult<Vec<_>>>()?;
        fold_right("||", asts).ok_or(QueryError::EmptyCombinator("or"))
    }
}

/// How a [`Par`] group combines its children
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParMode {
    /// At least one child holds
    Any,
    /// Every child holds at the same time
    All,
    /// Children hold during the first child's span
    During,
}

impl ParMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::All => "all",
            Self::During => "during",
        }
    }
}

impl std::fmt::Display for ParMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// N-ary grouping of spans
#[derive(Debug, Clone, PartialEq)]
pub struct Par {
    mode: ParMode,
    children: Vec<Node>,
}

impl Par {
    pub fn new<I, N>(mode: ParMode, children: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<Node>,
    {
        Self {
            mode,
            children: children.into_iter().map(Into::into).collect(),
        }
    }

    pub fn mode(&self) -> ParMode {
        self.mode
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn to_ast(&self) -> QueryResult<Json> {
        if self.children.is_empty() {
            return Err(QueryError::EmptyCombinator(self.mode.as_str()));
        }
        let conds = self
            .children
            .iter()
            .map(Node::to_ast)
            .collect::<QueryResult<Vec<_>>>()?;
        Ok(json!({"type": self.mode.as_str(), "conds": conds}))
    }
}

/// Group where any child holds
pub fn any_of<I, N>(children: I) -> Node
where
    I: IntoIterator<Item = N>,
    N: Into<Node>,
{
    Node::Par(Par::new(ParMode::Any, children))
}

/// Group where all children hold together
pub fn all_of<I, N>(children: I) -> Node
where
    I: IntoIterator<Item = N>,
    N: Into<Node>,
{
    Node::Par(Par::new(ParMode::All, children))
}

/// Group where the children hold during the first child's span
pub fn during<I, N>(children: I) -> Node
where
    I: IntoIterator<Item = N>,
    N: Into<Node>,
{
    Node::Par(Par::new(ParMode::During, children))
}

/// Ordered sequence of spans
///
/// Every step after the first carries a gap relative to the end of the
/// previous step. Steps without an explicit `within` or `after` default to
/// `within 0s` (the next span starts right where the previous one ended).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Serial {
    steps: Vec<Node>,
}

impl Serial {
    /// Create a sequence, splicing in nested sequences
    pub fn new<I, N>(steps: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<Node>,
    {
        let mut serial = Self::default();
        for step in steps {
            serial.extend(step.into());
        }
        serial
    }

    fn extend(&mut self, step: Node) {
        match step {
            Node::Serial(inner) => self.steps.extend(inner.steps),
            other => self.steps.push(other),
        }
    }

    /// Append a step with the default gap
    pub fn then(mut self, step: impl Into<Node>) -> Self {
        self.extend(step.into());
        self
    }

    /// Append a step with an explicit gap
    ///
    /// When the step is itself a sequence, the gap applies to its first
    /// step.
    pub fn then_with_gap(mut self, gap: SpanConstraints, step: impl Into<Node>) -> QueryResult<Self> {
        match step.into() {
            Node::Serial(inner) => {
                let mut steps = inner.steps.into_iter();
                let first = steps.next().ok_or(QueryError::EmptyCombinator("serial"))?;
                self.steps.push(Node::And(And::wrap(first).constrain(gap)?));
                self.steps.extend(steps);
            }
            other => self.steps.push(Node::And(And::wrap(other).constrain(gap)?)),
        }
        Ok(self)
    }

    pub fn steps(&self) -> &[Node] {
        &self.steps
    }

    pub fn to_ast(&self) -> QueryResult<Json> {
        let mut conds = Vec::with_capacity(self.steps.len());
        for (i, step) in self.steps.iter().enumerate() {
            let mut ast = step.to_ast()?;
            if i > 0 {
                if let Some(map) = ast.as_object_mut() {
                    if !map.contains_key("within") && !map.contains_key("after") {
                        map.insert("within".to_string(), Duration::zero().to_ast());
                    }
                }
            }
            conds.push(ast);
        }

        match conds.len() {
            0 => Err(QueryError::EmptyCombinator("serial")),
            1 => conds.pop().ok_or(QueryError::EmptyCombinator("serial")),
            _ => Ok(json!({"type": "serial", "conds": conds})),
        }
    }
}

/// Transition between event states within one stream
///
/// Each transition group is a conjunction of conditions on unbound event
/// paths. A switch is built unbound and must be bound to exactly one
/// stream before it can be serialized; binding is final.
#[derive(Debug, Clone, PartialEq)]
pub struct Switch {
    stream: Option<Stream>,
    transitions: Vec<Vec<Condition>>,
}

impl Switch {
    /// Create an unbound switch from two or more transition groups
    pub fn new<I, G>(transitions: I) -> QueryResult<Self>
    where
        I: IntoIterator<Item = G>,
        G: IntoIterator<Item = Condition>,
    {
        let transitions: Vec<Vec<Condition>> = transitions
            .into_iter()
            .map(|group| group.into_iter().collect())
            .collect();

        if transitions.len() < 2 {
            return Err(QueryError::syntax(format!(
                "switch must contain at least two events, got {}",
                transitions.len()
            )));
        }

        for (i, group) in transitions.iter().enumerate() {
            if group.is_empty() {
                return Err(QueryError::syntax(format!(
                    "switch event {} has no conditions",
                    i
                )));
            }
            if let Some(cond) = group.iter().find(|c| c.is_bound()) {
                let stream = cond.stream().map(Stream::name).unwrap_or_default();
                return Err(QueryError::syntax(format!(
                    "switch conditions must use event paths, but {} is bound to stream `{}`",
                    cond, stream
                )));
            }
        }

        Ok(Self {
            stream: None,
            transitions,
        })
    }

    /// Bind the switch to the stream whose events it matches
    pub fn bind(mut self, stream: &Stream) -> QueryResult<Self> {
        if let Some(bound) = &self.stream {
            return Err(QueryError::AlreadyBound(bound.name().to_string()));
        }
        self.stream = Some(stream.clone());
        Ok(self)
    }

    pub fn stream(&self) -> Option<&Stream> {
        self.stream.as_ref()
    }

    pub fn is_bound(&self) -> bool {
        self.stream.is_some()
    }

    pub fn transitions(&self) -> &[Vec<Condition>] {
        &self.transitions
    }

    pub fn to_ast(&self) -> QueryResult<Json> {
        let stream = self.stream.as_ref().ok_or(QueryError::UnboundSwitch)?;
        let conds: Vec<Json> = self
            .transitions
            .iter()
            .filter_map(|group| fold_right("&&", group.iter().map(Condition::to_ast).collect()))
            .collect();
        Ok(json!({"type": "switch", "conds": conds, "stream": stream.to_ref()}))
    }
}

impl Stream {
    /// Build a switch already bound to this stream
    pub fn switch<I, G>(&self, transitions: I) -> QueryResult<Switch>
    where
        I: IntoIterator<Item = G>,
        G: IntoIterator<Item = Condition>,
    {
        Switch::new(transitions)?.bind(self)
    }
}

/// Gap, length and sequencing builders shared by every node type
pub trait Temporal: Into<Node> + Sized {
    /// Constrain the span with an arbitrary constraint set
    fn constrained(self, constraints: SpanConstraints) -> QueryResult<Node> {
        Ok(Node::And(And::wrap(self).constrain(constraints)?))
    }

    /// Start at most `gap` after the previous span ends
    fn within(self, gap: Duration) -> QueryResult<Node> {
        self.constrained(SpanConstraints::within(gap))
    }

    /// Start at least `gap` after the previous span ends
    fn after(self, gap: Duration) -> QueryResult<Node> {
        self.constrained(SpanConstraints::after(gap))
    }

    fn for_exactly(self, length: Duration) -> QueryResult<Node> {
        self.constrained(SpanConstraints::lasting(DurationConstraint::Exactly(length)))
    }

    fn for_at_least(self, length: Duration) -> QueryResult<Node> {
        self.constrained(SpanConstraints::lasting(DurationConstraint::at_least(length)))
    }

    fn for_at_most(self, length: Duration) -> QueryResult<Node> {
        self.constrained(SpanConstraints::lasting(DurationConstraint::at_most(length)))
    }

    fn for_between(self, min: Duration, max: Duration) -> QueryResult<Node> {
        self.constrained(SpanConstraints::lasting(DurationConstraint::between(min, max)))
    }

    /// Follow with `next`, starting right where this span ends
    fn then(self, next: impl Into<Node>) -> Node {
        let first: Node = self.into();
        Node::Serial(Serial::new([first]).then(next))
    }

    /// Follow with `next`, starting at most `gap` after this span ends
    fn then_within(self, gap: Duration, next: impl Into<Node>) -> QueryResult<Node> {
        let first: Node = self.into();
        Serial::new([first])
            .then_with_gap(SpanConstraints::within(gap), next)
            .map(Node::Serial)
    }

    /// Follow with `next`, starting at least `gap` after this span ends
    fn then_after(self, gap: Duration, next: impl Into<Node>) -> QueryResult<Node> {
        let first: Node = self.into();
        Serial::new([first])
            .then_with_gap(SpanConstraints::after(gap), next)
            .map(Node::Serial)
    }
}

impl Temporal for Node {}
impl Temporal for Condition {}
impl Temporal for And {}
impl Temporal for Or {}
impl Temporal for Par {}
impl Temporal for Serial {}
impl Temporal for Switch {}

impl<T: Into<Node>> BitAnd<T> for Node {
    type Output = Node;

    fn bitand(self, rhs: T) -> Node {
        Node::And(And::new([self, rhs.into()]))
    }
}

impl<T: Into<Node>> BitAnd<T> for Condition {
    type Output = Node;

    fn bitand(self, rhs: T) -> Node {
        Node::from(self) & rhs
    }
}

impl<T: Into<Node>> BitOr<T> for Node {
    type Output = Node;

    fn bitor(self, rhs: T) -> Node {
        Node::Or(Or::new([self, rhs.into()]))
    }
}

impl<T: Into<Node>> BitOr<T> for Condition {
    type Output = Node;

    fn bitor(self, rhs: T) -> Node {
        Node::from(self) | rhs
    }
}

impl<T: Into<Node>> Shr<T> for Node {
    type Output = Node;

    fn shr(self, rhs: T) -> Node {
        self.then(rhs)
    }
}

impl<T: Into<Node>> Shr<T> for Condition {
    type Output = Node;

    fn shr(self, rhs: T) -> Node {
        self.then(rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::condition::Compare;
    use crate::query::path::EventPath;

    fn cond(field: &str, value: i64) -> Condition {
        Stream::new("S").field(field).equals(value).unwrap()
    }

    fn event_cond(field: &str, value: i64) -> Condition {
        EventPath::root().field(field).equals(value).unwrap()
    }

    #[test]
    fn test_and_is_right_associated() {
        let (a, b, c) = (cond("a", 1), cond("b", 2), cond("c", 3));
        let ast = (a.clone() & b.clone() & c.clone()).to_ast().unwrap();
        assert_eq!(
            ast,
            json!({"expr": "&&", "args": [
                a.to_ast(),
                {"expr": "&&", "args": [b.to_ast(), c.to_ast()]},
            ]})
        );

        // Grouping does not change the tree
        let regrouped = (Node::from(a) & (b & c)).to_ast().unwrap();
        assert_eq!(ast, regrouped);
    }

    #[test]
    fn test_or_folds_and_unwraps_single_child() {
        let (a, b) = (cond("a", 1), cond("b", 2));
        assert_eq!(
            (a.clone() | b.clone()).to_ast().unwrap(),
            json!({"expr": "||", "args": [a.to_ast(), b.to_ast()]})
        );
        assert_eq!(Or::new([a.clone()]).to_ast().unwrap(), a.to_ast());
    }

    #[test]
    fn test_empty_combinators_are_rejected() {
        let none: Vec<Node> = Vec::new();
        assert_eq!(
            Or::new(none.clone()).to_ast().unwrap_err(),
            QueryError::EmptyCombinator("or")
        );
        assert_eq!(
            any_of(none.clone()).to_ast().unwrap_err(),
            QueryError::EmptyCombinator("any")
        );
        assert_eq!(
            And::new(none.clone()).to_ast().unwrap_err(),
            QueryError::EmptyCombinator("and")
        );
        assert!(Serial::new(none).to_ast().unwrap_err().is_syntax_error());
    }

    #[test]
    fn test_single_child_and_carries_constraints_as_siblings() {
        let a = cond("a", 1);
        let node = a.clone().for_at_least(Duration::minutes(5)).unwrap();
        let mut expected = a.to_ast();
        expected["for"] = json!({"at_least": {"minutes": 5}});
        assert_eq!(node.to_ast().unwrap(), expected);
    }

    #[test]
    fn test_multi_child_and_constraints_at_outer_level() {
        let (a, b) = (cond("a", 1), cond("b", 2));
        let node = (a.clone() & b.clone()).within(Duration::seconds(10)).unwrap();
        assert_eq!(
            node.to_ast().unwrap(),
            json!({
                "expr": "&&",
                "args": [a.to_ast(), b.to_ast()],
                "within": {"seconds": 10},
            })
        );
    }

    #[test]
    fn test_nested_wrappers_merge() {
        let node = cond("a", 1)
            .for_at_least(Duration::days(1))
            .and_then(|n| n.for_at_most(Duration::days(3)))
            .and_then(|n| n.within(Duration::hours(2)))
            .and_then(|n| n.within(Duration::hours(1)))
            .unwrap();

        let Node::And(and) = &node else {
            panic!("expected a conjunction, got {}", node.kind());
        };
        assert_eq!(and.children().len(), 1);
        assert_eq!(
            and.constraints(),
            &SpanConstraints {
                within: Some(Duration::hours(1)),
                after: None,
                duration: Some(DurationConstraint::between(Duration::days(1), Duration::days(3))),
            }
        );
    }

    #[test]
    fn test_conflicting_wrappers_are_rejected() {
        let err = cond("a", 1)
            .for_at_least(Duration::days(5))
            .and_then(|n| n.for_at_most(Duration::days(3)))
            .unwrap_err();
        assert!(matches!(err, QueryError::ConflictingDuration { .. }));
    }

    #[test]
    fn test_inverted_length_range_is_rejected() {
        let err = cond("a", 1)
            .for_between(Duration::days(5), Duration::days(3))
            .unwrap_err();
        assert!(matches!(err, QueryError::ConflictingDuration { .. }));

        let ok = cond("a", 1)
            .for_between(Duration::days(3), Duration::days(5))
            .unwrap();
        assert_eq!(
            ok.to_ast().unwrap()["for"],
            json!({"at_least": {"days": 3}, "at_most": {"days": 5}})
        );
    }

    #[test]
    fn test_serial_default_gaps() {
        let (a, b, c) = (cond("a", 1), cond("b", 2), cond("c", 3));
        let ast = a.clone().then(b.clone()).then(c.clone()).to_ast().unwrap();

        let mut b_ast = b.to_ast();
        b_ast["within"] = json!({"seconds": 0});
        let mut c_ast = c.to_ast();
        c_ast["within"] = json!({"seconds": 0});
        assert_eq!(
            ast,
            json!({"type": "serial", "conds": [a.to_ast(), b_ast, c_ast]})
        );
    }

    #[test]
    fn test_serial_is_associative() {
        let (a, b, c) = (cond("a", 1), cond("b", 2), cond("c", 3));
        let left = Serial::new([Node::from(Serial::new([a.clone(), b.clone()])), c.clone().into()]);
        let right = Serial::new([Node::from(a.clone()), Serial::new([b.clone(), c.clone()]).into()]);
        let flat = Serial::new([a, b, c]);

        assert_eq!(left.to_ast().unwrap(), flat.to_ast().unwrap());
        assert_eq!(right.to_ast().unwrap(), flat.to_ast().unwrap());
        assert_eq!(left.steps().len(), 3);
    }

    #[test]
    fn test_shr_builds_serial() {
        let (a, b) = (cond("a", 1), cond("b", 2));
        assert_eq!((a.clone() >> b.clone()), a.then(b));
    }

    #[test]
    fn test_explicit_gap_replaces_default() {
        let (a, b) = (cond("a", 1), cond("b", 2));
        let node = a.clone().then_after(Duration::minutes(2), b.clone()).unwrap();

        let mut b_ast = b.to_ast();
        b_ast["after"] = json!({"minutes": 2});
        assert_eq!(
            node.to_ast().unwrap(),
            json!({"type": "serial", "conds": [a.to_ast(), b_ast]})
        );
    }

    #[test]
    fn test_gap_merges_with_step_constraints() {
        let (a, b) = (cond("a", 1), cond("b", 2));
        let step = b.clone().within(Duration::minutes(10)).unwrap();
        let node = a.then_within(Duration::minutes(1), step).unwrap();

        let Node::Serial(serial) = &node else {
            panic!("expected a serial, got {}", node.kind());
        };
        let Node::And(second) = &serial.steps()[1] else {
            panic!("expected a constrained step");
        };
        assert_eq!(second.constraints().within, Some(Duration::minutes(1)));
        assert_eq!(second.children(), [Node::from(b)]);
    }

    #[test]
    fn test_gap_on_nested_serial_applies_to_first_step() {
        let (a, b, c) = (cond("a", 1), cond("b", 2), cond("c", 3));
        let node = a.then_after(Duration::hours(1), b.clone().then(c)).unwrap();

        let ast = node.to_ast().unwrap();
        assert_eq!(ast["conds"].as_array().map(Vec::len), Some(3));
        assert_eq!(ast["conds"][1]["after"], json!({"hours": 1}));
        assert_eq!(ast["conds"][1].get("within"), None);
        assert_eq!(ast["conds"][2]["within"], json!({"seconds": 0}));
    }

    #[test]
    fn test_par_modes() {
        let (a, b) = (cond("a", 1), cond("b", 2));
        for (node, mode) in [
            (any_of([a.clone(), b.clone()]), "any"),
            (all_of([a.clone(), b.clone()]), "all"),
            (during([a.clone(), b.clone()]), "during"),
        ] {
            assert_eq!(
                node.to_ast().unwrap(),
                json!({"type": mode, "conds": [a.to_ast(), b.to_ast()]})
            );
        }
    }

    #[test]
    fn test_switch_requires_two_events() {
        let err = Switch::new([vec![event_cond("gear", 1)]]).unwrap_err();
        assert!(err.is_syntax_error());
        assert!(err.to_string().contains("must contain at least two events"));
    }

    #[test]
    fn test_switch_rejects_bound_conditions() {
        let err = Switch::new([vec![event_cond("gear", 1)], vec![cond("gear", 2)]]).unwrap_err();
        assert!(err.is_syntax_error());
        assert!(err.to_string().contains("bound to stream `S`"));
    }

    #[test]
    fn test_switch_binding_lifecycle() {
        let switch = Switch::new([
            vec![event_cond("gear", 1), event_cond("clutch", 0)],
            vec![event_cond("gear", 2)],
        ])
        .unwrap();

        assert_eq!(
            Node::from(switch.clone()).to_ast().unwrap_err(),
            QueryError::UnboundSwitch
        );

        let stream = Stream::new("cars");
        let bound = switch.bind(&stream).unwrap();
        assert_eq!(
            bound.to_ast().unwrap(),
            json!({
                "type": "switch",
                "conds": [
                    {"expr": "&&", "args": [
                        event_cond("gear", 1).to_ast(),
                        event_cond("clutch", 0).to_ast(),
                    ]},
                    event_cond("gear", 2).to_ast(),
                ],
                "stream": {"name": "cars"},
            })
        );

        let err = bound.bind(&Stream::new("trucks")).unwrap_err();
        assert_eq!(err, QueryError::AlreadyBound("cars".to_string()));
    }

    #[test]
    fn test_stream_switch_is_bound() {
        let stream = Stream::new("cars");
        let switch = stream
            .switch([[event_cond("gear", 1)], [event_cond("gear", 2)]])
            .unwrap();
        assert_eq!(switch.stream(), Some(&stream));
    }
}
