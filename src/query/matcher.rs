use std::cmp::Ordering;
use crate::core::record::Record;
use crate::core::types::Value;
use crate::query::ast::{Condition, ConditionSet, Matcher, RangeMatcher};

/// Record matcher - evaluates accumulated conditions against records
pub struct RecordMatcher {
    // Right bound for open-ended id ranges, read from the live table
    max_id: Option<Value>,
}

impl RecordMatcher {
    pub fn new() -> Self {
        RecordMatcher { max_id: None }
    }

    pub fn with_max_id(max_id: Option<Value>) -> Self {
        RecordMatcher { max_id }
    }

    /// Every condition in the set must hold
    pub fn matches(&self, record: &Record, conditions: &ConditionSet) -> bool {
        conditions
            .conditions
            .iter()
            .all(|condition| self.matches_condition(record, condition))
    }

    /// A plain condition needs all of its constraints to match. An inverted
    /// condition rejects the record as soon as any constraint matches, so
    /// `where.not(a: 1, b: 2)` drops records with a = 1 or b = 2.
    pub fn matches_condition(&self, record: &Record, condition: &Condition) -> bool {
        let mut constraints = condition.constraints.entries.iter();
        let matched = |(field, matcher): &(String, Matcher)| {
            let value = record.read(field);
            self.matches_value(field, &value, matcher)
        };

        if condition.inverted {
            !constraints.any(matched)
        } else {
            constraints.all(matched)
        }
    }

    fn matches_value(&self, field: &str, value: &Value, matcher: &Matcher) -> bool {
        match matcher {
            Matcher::Eq(expected) => value.canonical() == expected.canonical(),
            Matcher::AnyOf(alternatives) => alternatives
                .iter()
                .any(|alternative| self.matches_value(field, value, alternative)),
            Matcher::Range(range) => self.covers(field, range, value),
            Matcher::Pattern(regex) => regex.is_match(&value.canonical()),
        }
    }

    fn covers(&self, field: &str, range: &RangeMatcher, value: &Value) -> bool {
        if let Some(start) = &range.start {
            match start.compare(value) {
                Some(Ordering::Less) | Some(Ordering::Equal) => {}
                _ => return false,
            }
        }

        let end = match &range.end {
            Some(end) => Some(end),
            None if field == "id" => match &self.max_id {
                Some(max) => Some(max),
                None => return false,
            },
            None => None,
        };

        match end {
            Some(end) => match value.compare(end) {
                Some(Ordering::Less) => true,
                Some(Ordering::Equal) => !range.exclusive_end || range.end.is_none(),
                _ => false,
            },
            None => true,
        }
    }
}

impl Default for RecordMatcher {
    fn default() -> Self {
        Self::new()
    }
}
