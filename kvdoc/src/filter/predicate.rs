use crate::collection::Document;
use crate::common::Value;
use itertools::Itertools;
use regex::Regex;
use std::cmp::Ordering;
use std::fmt::Display;
use std::slice;

/// A compiled condition on a single field value.
#[derive(Clone, Debug)]
pub enum Predicate {
    Equals(Value),
    In(Vec<Value>),
    NotEquals(Value),
    NotIn(Vec<Value>),
    GreaterThan(Value),
    GreaterThanOrEqual(Value),
    LessThan(Value),
    LessThanOrEqual(Value),
    MatchesPattern(Regex),
}

impl Predicate {
    /// Evaluates the predicate against a field value, `None` for a missing field.
    ///
    /// Negative predicates match a missing field; ordering predicates only match
    /// numbers; patterns only match strings.
    pub fn test(&self, value: Option<&Value>) -> bool {
        match self {
            Predicate::Equals(expected) => value == Some(expected),
            Predicate::In(values) => value.is_some_and(|value| values.contains(value)),
            Predicate::NotEquals(expected) => value != Some(expected),
            Predicate::NotIn(values) => !value.is_some_and(|value| values.contains(value)),
            Predicate::GreaterThan(bound) => compare(value, bound, |o| o == Ordering::Greater),
            Predicate::GreaterThanOrEqual(bound) => {
                compare(value, bound, |o| o != Ordering::Less)
            }
            Predicate::LessThan(bound) => compare(value, bound, |o| o == Ordering::Less),
            Predicate::LessThanOrEqual(bound) => {
                compare(value, bound, |o| o != Ordering::Greater)
            }
            Predicate::MatchesPattern(regex) => value
                .and_then(Value::as_str)
                .is_some_and(|text| regex.is_match(text)),
        }
    }

    /// Values an index can answer this predicate with, if it is index-friendly.
    pub fn probe_values(&self) -> Option<&[Value]> {
        match self {
            Predicate::Equals(value) => Some(slice::from_ref(value)),
            Predicate::In(values) => Some(values.as_slice()),
            _ => None,
        }
    }

    pub fn is_indexable(&self) -> bool {
        self.probe_values().is_some()
    }
}

fn compare(value: Option<&Value>, bound: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    value
        .and_then(|value| value.numeric_cmp(bound))
        .is_some_and(accept)
}

/// A predicate bound to the field it tests.
#[derive(Clone, Debug)]
pub struct FieldPredicate {
    field: String,
    predicate: Predicate,
}

impl FieldPredicate {
    pub fn new(field: impl Into<String>, predicate: Predicate) -> Self {
        FieldPredicate {
            field: field.into(),
            predicate,
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    pub fn matches(&self, document: &Document) -> bool {
        self.predicate.test(document.get(&self.field))
    }
}

impl Display for FieldPredicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let field = &self.field;
        match &self.predicate {
            Predicate::Equals(value) => write!(f, "{} == {}", field, value),
            Predicate::In(values) => write!(f, "{} in [{}]", field, values.iter().join(", ")),
            Predicate::NotEquals(value) => write!(f, "{} != {}", field, value),
            Predicate::NotIn(values) => {
                write!(f, "{} not in [{}]", field, values.iter().join(", "))
            }
            Predicate::GreaterThan(value) => write!(f, "{} > {}", field, value),
            Predicate::GreaterThanOrEqual(value) => write!(f, "{} >= {}", field, value),
            Predicate::LessThan(value) => write!(f, "{} < {}", field, value),
            Predicate::LessThanOrEqual(value) => write!(f, "{} <= {}", field, value),
            Predicate::MatchesPattern(regex) => write!(f, "{} =~ /{}/", field, regex.as_str()),
        }
    }
}
