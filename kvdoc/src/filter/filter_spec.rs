use crate::common::Value;
use itertools::Itertools;
use std::fmt::Display;

/// Operand of a filter operator.
#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    Scalar(Value),
    List(Vec<Value>),
}

/// Condition placed on one field.
#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    /// Plain value, shorthand for equality.
    Literal(Value),
    /// Operator object such as `{"$gt": 25, "$lt": 40}`; every operator must hold.
    Operators(Vec<(String, Operand)>),
}

/// A filter as written by the caller, before validation.
///
/// The spec is an ordered list of `(field, condition)` clauses combined with logical
/// AND. An empty spec matches every document. Use [Filter::compile](crate::filter::Filter::compile)
/// to validate it; the collection operations do that for you.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterSpec {
    clauses: Vec<(String, Condition)>,
}

impl FilterSpec {
    pub fn new() -> Self {
        FilterSpec {
            clauses: Vec::new(),
        }
    }

    /// A spec that matches every document.
    pub fn all() -> Self {
        FilterSpec::new()
    }

    /// Appends a clause.
    pub fn clause(mut self, field: impl Into<String>, condition: Condition) -> Self {
        self.clauses.push((field.into(), condition));
        self
    }

    /// Combines two specs; a document must satisfy both.
    pub fn and(mut self, other: FilterSpec) -> Self {
        self.clauses.extend(other.clauses);
        self
    }

    pub fn clauses(&self) -> &[(String, Condition)] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

/// Creates a spec that matches every document.
pub fn all() -> FilterSpec {
    FilterSpec::all()
}

impl Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operand::Scalar(value) => write!(f, "{}", value),
            Operand::List(values) => write!(f, "[{}]", values.iter().join(", ")),
        }
    }
}

impl Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Condition::Literal(value) => write!(f, "{}", value),
            Condition::Operators(operators) => write!(
                f,
                "{{{}}}",
                operators
                    .iter()
                    .map(|(op, operand)| format!("\"{}\": {}", op, operand))
                    .join(", ")
            ),
        }
    }
}

impl Display for FilterSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{{}}}",
            self.clauses
                .iter()
                .map(|(field, condition)| format!("\"{}\": {}", field, condition))
                .join(", ")
        )
    }
}
