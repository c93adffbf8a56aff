use std::ops::{Range, RangeFrom, RangeInclusive};
use regex::Regex;
use crate::core::error::Result;
use crate::core::types::Value;

/// How a single field is compared against a record value
#[derive(Debug, Clone)]
pub enum Matcher {
    Eq(Value),                  // canonical string equality
    AnyOf(Vec<Matcher>),        // any alternative matches
    Range(RangeMatcher),
    Pattern(Regex),             // matched against the stringified value
}

/// Value range; `end: None` is open on the right.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeMatcher {
    pub start: Option<Value>,
    pub end: Option<Value>,
    pub exclusive_end: bool,
}

impl Matcher {
    pub fn eq(value: impl Into<Value>) -> Self {
        Matcher::Eq(value.into())
    }

    pub fn any_of<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Matcher>,
    {
        Matcher::AnyOf(values.into_iter().map(Into::into).collect())
    }

    pub fn between(start: impl Into<Value>, end: impl Into<Value>) -> Self {
        Matcher::Range(RangeMatcher {
            start: Some(start.into()),
            end: Some(end.into()),
            exclusive_end: false,
        })
    }

    pub fn at_least(start: impl Into<Value>) -> Self {
        Matcher::Range(RangeMatcher {
            start: Some(start.into()),
            end: None,
            exclusive_end: false,
        })
    }

    pub fn pattern(pattern: &str) -> Result<Self> {
        Ok(Matcher::Pattern(Regex::new(pattern)?))
    }

    pub(crate) fn has_open_range(&self) -> bool {
        match self {
            Matcher::Range(range) => range.end.is_none(),
            Matcher::AnyOf(alternatives) => alternatives.iter().any(Matcher::has_open_range),
            _ => false,
        }
    }
}

macro_rules! matcher_from_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Matcher {
                fn from(v: $ty) -> Self {
                    Matcher::Eq(v.into())
                }
            }
        )*
    };
}

matcher_from_value!(Value, &str, String, bool, i64, i32, u32, f64);

impl<T: Into<Matcher>> From<Vec<T>> for Matcher {
    fn from(values: Vec<T>) -> Self {
        Matcher::any_of(values)
    }
}

impl From<Regex> for Matcher {
    fn from(regex: Regex) -> Self {
        Matcher::Pattern(regex)
    }
}

impl<T: Into<Value>> From<RangeInclusive<T>> for Matcher {
    fn from(range: RangeInclusive<T>) -> Self {
        let (start, end) = range.into_inner();
        Matcher::between(start, end)
    }
}

impl<T: Into<Value>> From<Range<T>> for Matcher {
    fn from(range: Range<T>) -> Self {
        Matcher::Range(RangeMatcher {
            start: Some(range.start.into()),
            end: Some(range.end.into()),
            exclusive_end: true,
        })
    }
}

impl<T: Into<Value>> From<RangeFrom<T>> for Matcher {
    fn from(range: RangeFrom<T>) -> Self {
        Matcher::at_least(range.start)
    }
}

/// Ordered field → matcher pairs, the argument of `where`.
#[derive(Debug, Clone, Default)]
pub struct Constraints {
    pub entries: Vec<(String, Matcher)>,
}

impl Constraints {
    pub fn new() -> Self {
        Constraints { entries: Vec::new() }
    }

    pub fn with(mut self, field: impl Into<String>, matcher: impl Into<Matcher>) -> Self {
        self.entries.push((field.into(), matcher.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl<K, M, const N: usize> From<[(K, M); N]> for Constraints
where
    K: Into<String>,
    M: Into<Matcher>,
{
    fn from(pairs: [(K, M); N]) -> Self {
        Constraints {
            entries: pairs.into_iter().map(|(k, m)| (k.into(), m.into())).collect(),
        }
    }
}

impl<K, M> FromIterator<(K, M)> for Constraints
where
    K: Into<String>,
    M: Into<Matcher>,
{
    fn from_iter<I: IntoIterator<Item = (K, M)>>(iter: I) -> Self {
        Constraints {
            entries: iter.into_iter().map(|(k, m)| (k.into(), m.into())).collect(),
        }
    }
}

/// One `where` (or `where.not`) clause
#[derive(Debug, Clone, Default)]
pub struct Condition {
    pub constraints: Constraints,
    pub inverted: bool,
}

impl Condition {
    pub fn new(constraints: Constraints) -> Self {
        Condition {
            constraints,
            inverted: false,
        }
    }

    pub fn inverted(constraints: Constraints) -> Self {
        Condition {
            constraints,
            inverted: true,
        }
    }

    pub fn invert(&mut self) {
        self.inverted = !self.inverted;
    }
}

/// Conditions accumulated by chained `where` calls; all must hold.
#[derive(Debug, Clone, Default)]
pub struct ConditionSet {
    pub conditions: Vec<Condition>,
}

impl ConditionSet {
    pub fn new() -> Self {
        ConditionSet { conditions: Vec::new() }
    }

    pub fn push(&mut self, condition: Condition) {
        self.conditions.push(condition);
    }

    pub fn invert_all(&mut self) {
        for condition in &mut self.conditions {
            condition.invert();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub(crate) fn has_open_range_on(&self, field: &str) -> bool {
        self.conditions.iter().any(|c| {
            c.constraints
                .entries
                .iter()
                .any(|(name, matcher)| name == field && matcher.has_open_range())
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderTerm {
    pub field: String,
    pub direction: Direction,
}

impl OrderTerm {
    pub fn asc(field: impl Into<String>) -> Self {
        OrderTerm {
            field: field.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        OrderTerm {
            field: field.into(),
            direction: Direction::Desc,
        }
    }
}

/// One argument of `order`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderArg {
    Term(OrderTerm),
    Clause(String),     // "name, population DESC"
}

impl From<OrderTerm> for OrderArg {
    fn from(term: OrderTerm) -> Self {
        OrderArg::Term(term)
    }
}

impl From<&str> for OrderArg {
    fn from(clause: &str) -> Self {
        OrderArg::Clause(clause.to_string())
    }
}

impl From<String> for OrderArg {
    fn from(clause: String) -> Self {
        OrderArg::Clause(clause)
    }
}

impl From<(&str, Direction)> for OrderArg {
    fn from((field, direction): (&str, Direction)) -> Self {
        OrderArg::Term(OrderTerm {
            field: field.to_string(),
            direction,
        })
    }
}
