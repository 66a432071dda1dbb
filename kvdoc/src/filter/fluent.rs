use crate::common::{
    Value, OP_GT, OP_GTE, OP_IN, OP_LT, OP_LTE, OP_NE, OP_NIN, OP_OPTIONS, OP_REGEX,
};
use crate::filter::{Condition, FilterSpec, Operand};

/// Creates a fluent filter builder for the specified field name.
///
/// # Examples
///
/// ```rust
/// use kvdoc::filter::field;
///
/// let spec = field("role").eq("CTO").and(field("age").gt(25));
/// assert_eq!(spec.clauses().len(), 2);
/// ```
pub fn field(field_name: &str) -> FluentFilter {
    FluentFilter {
        field_name: field_name.to_string(),
    }
}

/// A fluent builder for a single-field [FilterSpec].
///
/// Each method returns a spec with one clause on the field; specs are combined with
/// [FilterSpec::and].
pub struct FluentFilter {
    field_name: String,
}

impl FluentFilter {
    #[inline]
    pub fn eq<T: Into<Value>>(self, value: T) -> FilterSpec {
        FilterSpec::new().clause(self.field_name, Condition::Literal(value.into()))
    }

    #[inline]
    pub fn ne<T: Into<Value>>(self, value: T) -> FilterSpec {
        self.operator(OP_NE, Operand::Scalar(value.into()))
    }

    /// Numeric comparison; non-numeric field values never match.
    #[inline]
    pub fn gt<T: Into<Value>>(self, value: T) -> FilterSpec {
        self.operator(OP_GT, Operand::Scalar(value.into()))
    }

    #[inline]
    pub fn gte<T: Into<Value>>(self, value: T) -> FilterSpec {
        self.operator(OP_GTE, Operand::Scalar(value.into()))
    }

    #[inline]
    pub fn lt<T: Into<Value>>(self, value: T) -> FilterSpec {
        self.operator(OP_LT, Operand::Scalar(value.into()))
    }

    #[inline]
    pub fn lte<T: Into<Value>>(self, value: T) -> FilterSpec {
        self.operator(OP_LTE, Operand::Scalar(value.into()))
    }

    /// Matches documents whose field equals any of `values`.
    pub fn in_array<T: Into<Value>>(self, values: Vec<T>) -> FilterSpec {
        let values = values.into_iter().map(Into::into).collect();
        self.operator(OP_IN, Operand::List(values))
    }

    /// Matches documents whose field is missing or equals none of `values`.
    pub fn not_in_array<T: Into<Value>>(self, values: Vec<T>) -> FilterSpec {
        let values = values.into_iter().map(Into::into).collect();
        self.operator(OP_NIN, Operand::List(values))
    }

    /// Matches string fields against a regular expression.
    pub fn regex(self, pattern: &str) -> FilterSpec {
        self.operator(OP_REGEX, Operand::Scalar(Value::from(pattern)))
    }

    /// Like [FluentFilter::regex] with Mongo-style option letters (`i`, `m`, `s`, `x`).
    pub fn regex_with_options(self, pattern: &str, options: &str) -> FilterSpec {
        FilterSpec::new().clause(
            self.field_name,
            Condition::Operators(vec![
                (OP_REGEX.to_string(), Operand::Scalar(Value::from(pattern))),
                (OP_OPTIONS.to_string(), Operand::Scalar(Value::from(options))),
            ]),
        )
    }

    fn operator(self, operator: &str, operand: Operand) -> FilterSpec {
        FilterSpec::new().clause(
            self.field_name,
            Condition::Operators(vec![(operator.to_string(), operand)]),
        )
    }
}
