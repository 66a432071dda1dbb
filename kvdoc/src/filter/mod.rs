//! Query filters for selecting documents from collections.
//!
//! A filter is written as a [FilterSpec], an ordered list of `(field, condition)`
//! clauses that must all hold. A condition is either a literal value (equality) or an
//! operator object such as `{"$gt": 25}`. Before anything touches the store the spec is
//! compiled into a [Filter] of typed predicates; malformed filters are rejected at that
//! point with `ErrorKind::InvalidOperator`.
//!
//! # Creating Filters
//!
//! ```rust,ignore
//! use kvdoc::filter;
//! use kvdoc::filter::field;
//!
//! // macro, Mongo-like
//! let spec = filter!{ role: "CTO", age: { "$gt": 25 } };
//!
//! // fluent API
//! let spec = field("role").eq("CTO").and(field("age").gt(25));
//!
//! // everything
//! let spec = filter::all();
//! ```
//!
//! # Supported Operators
//!
//! - **Equality**: `$eq`, `$ne`
//! - **Membership**: `$in`, `$nin`
//! - **Comparison** (numbers only): `$gt`, `$gte`, `$lt`, `$lte`
//! - **Pattern** (strings only): `$regex` with optional `$options` (`i`, `m`, `s`, `x`)

mod filter;
mod filter_spec;
mod fluent;
mod predicate;

pub use filter::*;
pub use filter_spec::*;
pub use fluent::*;
pub use predicate::*;

/// Creates a [FilterSpec] with Mongo-like syntax.
///
/// Each clause is `field: value` for equality or `field: { "$op": operand, ... }` for
/// operators. List operands are written in brackets. Operands inside an operator
/// object are single token trees, so negative numbers or computed values go in
/// parentheses: `{ "$gt": (-5) }`.
///
/// # Examples
///
/// ```rust
/// use kvdoc::filter;
///
/// let everything = filter!{};
/// let ctos = filter!{ role: "CTO" };
/// let seniors = filter!{
///     role: { "$in": ["CTO", "CEO"] },
///     age: { "$gte": 40, "$lt": 65 },
///     name: { "$regex": "^a", "$options": "i" },
/// };
/// assert_eq!(seniors.clauses().len(), 3);
/// ```
#[macro_export]
macro_rules! filter {
    (@clauses $spec:ident) => {};

    (@clauses $spec:ident $field:tt : { $($op:tt : $operand:tt),* $(,)? } $(, $($rest:tt)*)?) => {
        $spec = $spec.clause(
            $crate::collection::normalize(stringify!($field)),
            $crate::filter::Condition::Operators(vec![
                $(($crate::collection::normalize(stringify!($op)), $crate::filter_operand!($operand))),*
            ]),
        );
        $($crate::filter!(@clauses $spec $($rest)*);)?
    };

    (@clauses $spec:ident $field:tt : $value:expr $(, $($rest:tt)*)?) => {
        $spec = $spec.clause(
            $crate::collection::normalize(stringify!($field)),
            $crate::filter::Condition::Literal($crate::common::Value::from($value)),
        );
        $($crate::filter!(@clauses $spec $($rest)*);)?
    };

    () => {
        $crate::filter::FilterSpec::all()
    };

    ($($body:tt)+) => {
        {
            let mut spec = $crate::filter::FilterSpec::new();
            $crate::filter!(@clauses spec $($body)+);
            spec
        }
    };
}

/// Helper macro converting an operator operand for [filter!].
#[macro_export]
macro_rules! filter_operand {
    ([ $($value:expr),* $(,)? ]) => {
        $crate::filter::Operand::List(vec![$($crate::common::Value::from($value)),*])
    };

    ($value:expr) => {
        $crate::filter::Operand::Scalar($crate::common::Value::from($value))
    };
}
