use crate::collection::Document;
use crate::common::{
    Value, OPERATOR_PREFIX, OP_EQ, OP_GT, OP_GTE, OP_IN, OP_LT, OP_LTE, OP_NE, OP_NIN,
    OP_OPTIONS, OP_REGEX,
};
use crate::errors::{ErrorKind, KvDocError, KvDocResult};
use crate::filter::{Condition, FieldPredicate, FilterSpec, Operand, Predicate};
use itertools::Itertools;
use regex::RegexBuilder;
use std::fmt::Display;

/// A validated filter, ready to be planned and evaluated.
///
/// Compiling parses every clause of a [FilterSpec] once into typed
/// [FieldPredicate]s. Regular expressions are compiled at this point too, so
/// evaluating a filter against many documents never re-parses anything.
///
/// A document matches when every predicate holds. An empty filter matches
/// every document.
#[derive(Clone, Debug, Default)]
pub struct Filter {
    predicates: Vec<FieldPredicate>,
}

impl Filter {
    /// Validates and compiles a filter spec.
    ///
    /// # Errors
    ///
    /// Returns `ErrorKind::InvalidOperator` when:
    /// * a field name is empty or is itself an operator
    /// * an operator is unknown or an operator object is empty
    /// * `$in`/`$nin` get a scalar, or any other operator gets a list
    /// * `$regex` gets a non string or an invalid pattern
    /// * `$options` appears without `$regex` or holds an unknown flag
    pub fn compile(spec: &FilterSpec) -> KvDocResult<Filter> {
        let mut predicates = Vec::with_capacity(spec.clauses().len());
        for (field, condition) in spec.clauses() {
            validate_field(field)?;
            match condition {
                Condition::Literal(value) => {
                    predicates.push(FieldPredicate::new(field, Predicate::Equals(value.clone())));
                }
                Condition::Operators(operators) => {
                    compile_operators(field, operators, &mut predicates)?;
                }
            }
        }
        Ok(Filter { predicates })
    }

    pub fn predicates(&self) -> &[FieldPredicate] {
        &self.predicates
    }

    /// Returns `true` when the filter matches every document.
    pub fn is_all(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn matches(&self, document: &Document) -> bool {
        self.predicates
            .iter()
            .all(|predicate| predicate.matches(document))
    }
}

impl Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.predicates.is_empty() {
            write!(f, "all")
        } else {
            write!(f, "({})", self.predicates.iter().join(" && "))
        }
    }
}

impl TryFrom<&FilterSpec> for Filter {
    type Error = KvDocError;

    fn try_from(spec: &FilterSpec) -> Result<Self, Self::Error> {
        Filter::compile(spec)
    }
}

fn invalid(message: String) -> KvDocError {
    log::error!("{}", message);
    KvDocError::new(&message, ErrorKind::InvalidOperator)
}

fn validate_field(field: &str) -> KvDocResult<()> {
    if field.is_empty() {
        return Err(invalid("Filter has an empty field name".to_string()));
    }
    if field.starts_with(OPERATOR_PREFIX) {
        return Err(invalid(format!(
            "Operator {} is not supported at the top level of a filter",
            field
        )));
    }
    Ok(())
}

fn compile_operators(
    field: &str,
    operators: &[(String, Operand)],
    predicates: &mut Vec<FieldPredicate>,
) -> KvDocResult<()> {
    if operators.is_empty() {
        return Err(invalid(format!("Empty operator object for field {}", field)));
    }

    // $options only modifies $regex, so it is resolved first
    let mut options = None;
    let mut has_regex = false;
    for (operator, operand) in operators {
        match operator.as_str() {
            OP_OPTIONS => options = Some(string_operand(field, operator, operand)?),
            OP_REGEX => has_regex = true,
            _ => {}
        }
    }
    if options.is_some() && !has_regex {
        return Err(invalid(format!(
            "{} without {} for field {}",
            OP_OPTIONS, OP_REGEX, field
        )));
    }

    for (operator, operand) in operators {
        let predicate = match operator.as_str() {
            OP_EQ => Predicate::Equals(scalar_operand(field, operator, operand)?),
            OP_NE => Predicate::NotEquals(scalar_operand(field, operator, operand)?),
            OP_GT => Predicate::GreaterThan(scalar_operand(field, operator, operand)?),
            OP_GTE => Predicate::GreaterThanOrEqual(scalar_operand(field, operator, operand)?),
            OP_LT => Predicate::LessThan(scalar_operand(field, operator, operand)?),
            OP_LTE => Predicate::LessThanOrEqual(scalar_operand(field, operator, operand)?),
            OP_IN => Predicate::In(list_operand(field, operator, operand)?),
            OP_NIN => Predicate::NotIn(list_operand(field, operator, operand)?),
            OP_REGEX => {
                let pattern = string_operand(field, operator, operand)?;
                Predicate::MatchesPattern(compile_pattern(pattern, options.unwrap_or(""))?)
            }
            OP_OPTIONS => continue,
            _ => {
                return Err(invalid(format!(
                    "Unknown operator {} for field {}",
                    operator, field
                )))
            }
        };
        predicates.push(FieldPredicate::new(field, predicate));
    }
    Ok(())
}

fn scalar_operand(field: &str, operator: &str, operand: &Operand) -> KvDocResult<Value> {
    match operand {
        Operand::Scalar(value) => Ok(value.clone()),
        Operand::List(_) => Err(invalid(format!(
            "Operator {} for field {} expects a single value, found a list",
            operator, field
        ))),
    }
}

fn list_operand(field: &str, operator: &str, operand: &Operand) -> KvDocResult<Vec<Value>> {
    match operand {
        Operand::List(values) => Ok(values.clone()),
        Operand::Scalar(_) => Err(invalid(format!(
            "Operator {} for field {} expects a list, found a single value",
            operator, field
        ))),
    }
}

fn string_operand<'a>(field: &str, operator: &str, operand: &'a Operand) -> KvDocResult<&'a str> {
    match operand {
        Operand::Scalar(Value::String(text)) => Ok(text),
        _ => Err(invalid(format!(
            "Operator {} for field {} expects a string, found {}",
            operator, field, operand
        ))),
    }
}

fn compile_pattern(pattern: &str, options: &str) -> KvDocResult<regex::Regex> {
    let mut builder = RegexBuilder::new(pattern);
    for flag in options.chars() {
        match flag {
            'i' => builder.case_insensitive(true),
            'm' => builder.multi_line(true),
            's' => builder.dot_matches_new_line(true),
            'x' => builder.ignore_whitespace(true),
            _ => {
                return Err(invalid(format!(
                    "Unknown regex option {:?} in {:?}",
                    flag, options
                )))
            }
        };
    }

    builder.build().map_err(|err| {
        log::error!("Invalid regex pattern {:?}: {}", pattern, err);
        KvDocError::from(err)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{doc, filter};

    fn compile_err(spec: FilterSpec) -> KvDocError {
        Filter::compile(&spec).unwrap_err()
    }

    #[test]
    fn test_compile_literals_and_operators() {
        let filter = Filter::compile(&filter! {
            role: "CTO",
            age: { "$gt": 25, "$lte": 40 },
        })
        .unwrap();
        assert_eq!(filter.predicates().len(), 3);
        assert!(matches!(filter.predicates()[0].predicate(), Predicate::Equals(_)));
        assert!(matches!(filter.predicates()[1].predicate(), Predicate::GreaterThan(_)));
        assert!(matches!(filter.predicates()[2].predicate(), Predicate::LessThanOrEqual(_)));
    }

    #[test]
    fn test_all_operators_compile() {
        let filter = Filter::compile(&filter! {
            a: { "$eq": 1 },
            b: { "$ne": 1 },
            c: { "$in": [1, 2] },
            d: { "$nin": [1] },
            e: { "$gte": 1, "$lt": 9 },
            f: { "$regex": "^x", "$options": "imsx" },
        })
        .unwrap();
        assert_eq!(filter.predicates().len(), 7);
    }

    #[test]
    fn test_empty_filter_matches_all() {
        let filter = Filter::compile(&filter! {}).unwrap();
        assert!(filter.is_all());
        assert!(filter.matches(&doc! { any: 1 }));
        assert_eq!(filter.to_string(), "all");
    }

    #[test]
    fn test_unknown_operator() {
        let err = compile_err(filter! { age: { "$foo": 1 } });
        assert_eq!(err.kind(), &ErrorKind::InvalidOperator);
        assert!(err.message().contains("$foo"));
    }

    #[test]
    fn test_top_level_operator_rejected() {
        let spec = FilterSpec::new().clause("$or", Condition::Literal(Value::from(1)));
        assert_eq!(compile_err(spec).kind(), &ErrorKind::InvalidOperator);
    }

    #[test]
    fn test_empty_field_and_empty_object() {
        let spec = FilterSpec::new().clause("", Condition::Literal(Value::from(1)));
        assert_eq!(compile_err(spec).kind(), &ErrorKind::InvalidOperator);
        assert_eq!(
            compile_err(filter! { age: {} }).kind(),
            &ErrorKind::InvalidOperator
        );
    }

    #[test]
    fn test_operand_shapes() {
        assert_eq!(
            compile_err(filter! { role: { "$in": "CTO" } }).kind(),
            &ErrorKind::InvalidOperator
        );
        assert_eq!(
            compile_err(filter! { role: { "$nin": 3 } }).kind(),
            &ErrorKind::InvalidOperator
        );
        assert_eq!(
            compile_err(filter! { age: { "$gt": [1, 2] } }).kind(),
            &ErrorKind::InvalidOperator
        );
    }

    #[test]
    fn test_regex_errors() {
        assert_eq!(
            compile_err(filter! { name: { "$regex": "(unclosed" } }).kind(),
            &ErrorKind::InvalidOperator
        );
        assert_eq!(
            compile_err(filter! { name: { "$regex": 5 } }).kind(),
            &ErrorKind::InvalidOperator
        );
        assert_eq!(
            compile_err(filter! { name: { "$options": "i" } }).kind(),
            &ErrorKind::InvalidOperator
        );
        assert_eq!(
            compile_err(filter! { name: { "$regex": "a", "$options": "q" } }).kind(),
            &ErrorKind::InvalidOperator
        );
    }

    #[test]
    fn test_regex_options_apply() {
        let filter = Filter::compile(&filter! {
            name: { "$options": "i", "$regex": "^ALICE$" },
        })
        .unwrap();
        assert!(filter.matches(&doc! { name: "alice" }));
        assert!(!filter.matches(&doc! { name: "bob" }));
    }

    #[test]
    fn test_matches_requires_every_predicate() {
        let filter = Filter::compile(&filter! { role: "CTO", age: { "$gt": 25 } }).unwrap();
        assert!(filter.matches(&doc! { role: "CTO", age: 30 }));
        assert!(!filter.matches(&doc! { role: "CTO", age: 25 }));
        assert!(!filter.matches(&doc! { role: "CEO", age: 40 }));
    }

    #[test]
    fn test_display() {
        let filter = Filter::compile(&filter! { role: "CTO", age: { "$gt": 25 } }).unwrap();
        assert_eq!(filter.to_string(), "(role == \"CTO\" && age > 25)");
    }
}
