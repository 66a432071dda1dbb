use crate::common::{BOOL_TAG, NUMBER_TAG, STRING_TAG};
use std::cmp::Ordering;
use std::fmt::{Debug, Display, Formatter};

/// Compares an integer with a float without rounding the integer.
///
/// `None` when the float is NaN.
fn cmp_int_float(i: i64, f: f64) -> Option<Ordering> {
    // 2^63, the first float above every i64
    const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;
    if f.is_nan() {
        return None;
    }
    if f >= TWO_POW_63 {
        return Some(Ordering::Less);
    }
    if f < -TWO_POW_63 {
        return Some(Ordering::Greater);
    }

    let whole = f.trunc();
    match i.cmp(&(whole as i64)) {
        Ordering::Equal => whole.partial_cmp(&f),
        ordering => Some(ordering),
    }
}

/// Returns the integer a float represents exactly, if any.
#[inline]
fn integral_float(f: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, hence the strict upper bound
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

/// Represents a [Document](crate::collection::Document) field value.
///
/// Values form a closed scalar union. Nested documents, arrays and null are not
/// representable, which keeps the canonical index form of every value well defined.
///
/// # Variants
/// - String(String): Text value
/// - Integer(i64): Whole number
/// - Float(f64): Floating point number
/// - Bool(bool): Boolean true/false
///
/// # Characteristics
/// - **Numeric equality**: `Integer(30) == Float(30.0)`
/// - **Serializable**: Can be serialized/deserialized with serde
/// - **Canonical**: [Value::canonical] gives the type-tagged text used in index keys
///
/// # Usage
/// ```text
/// let v1: Value = 42.into();
/// let v2 = Value::from("hello");
/// let doc = doc!{ "age": 42, "name": "Alice" };
/// ```
#[derive(Clone, serde::Deserialize, serde::Serialize)]
pub enum Value {
    /// Represents a string value.
    String(String),
    /// Represents a signed 64-bit integer value.
    Integer(i64),
    /// Represents a 64-bit floating point value.
    Float(f64),
    /// Represents a boolean value.
    Bool(bool),
}

impl Value {
    #[inline]
    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    #[inline]
    pub fn is_number(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Float(_))
    }

    #[inline]
    pub fn is_bool(&self) -> bool {
        matches!(self, Value::Bool(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Float(f) => integral_float(*f),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[inline]
    pub fn is_nan(&self) -> bool {
        matches!(self, Value::Float(f) if f.is_nan())
    }

    /// Compares two values numerically.
    ///
    /// Returns `None` when either side is not a number or is NaN, so ordering
    /// operators never match those values. Integers and floats compare exactly.
    pub fn numeric_cmp(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::Integer(a), Value::Float(b)) => cmp_int_float(*a, *b),
            (Value::Float(a), Value::Integer(b)) => cmp_int_float(*b, *a).map(Ordering::reverse),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            _ => None,
        }
    }

    /// Total order used for sorting query results.
    ///
    /// Values of different kinds order as `Bool < Number < String`.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            _ => match self.numeric_cmp(other) {
                Some(ordering) => ordering,
                // NaN sorts after every other number
                None if self.is_number() && other.is_number() => self.is_nan().cmp(&other.is_nan()),
                None => self.type_rank().cmp(&other.type_rank()),
            },
        }
    }

    /// Type-tagged canonical text of this value.
    ///
    /// Numbers that denote the same quantity share one canonical form, so
    /// `Integer(30)` and `Float(30.0)` both canonicalize to `n:30`.
    pub fn canonical(&self) -> String {
        match self {
            Value::String(s) => format!("{}:{}", STRING_TAG, s),
            Value::Integer(i) => format!("{}:{}", NUMBER_TAG, i),
            Value::Float(f) => match integral_float(*f) {
                Some(i) => format!("{}:{}", NUMBER_TAG, i),
                None => format!("{}:{}", NUMBER_TAG, f),
            },
            Value::Bool(b) => format!("{}:{}", BOOL_TAG, b),
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            Value::Bool(_) => 0,
            Value::Integer(_) | Value::Float(_) => 1,
            Value::String(_) => 2,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => {
                if a.is_nan() && b.is_nan() {
                    true
                } else {
                    a == b
                }
            }
            // keeps equality consistent with the canonical form
            (Value::Integer(i), Value::Float(f)) | (Value::Float(f), Value::Integer(i)) => {
                integral_float(*f) == Some(*i)
            }
            _ => false,
        }
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::String(s) => write!(f, "String({:?})", s),
            Value::Integer(i) => write!(f, "Integer({})", i),
            Value::Float(v) => write!(f, "Float({})", v),
            Value::Bool(b) => write!(f, "Bool({})", b),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Value::String(value.clone())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(value as f64)
    }
}

impl From<&Value> for Value {
    fn from(value: &Value) -> Self {
        value.clone()
    }
}

macro_rules! integer_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(value: $t) -> Self {
                    Value::Integer(value as i64)
                }
            }
        )*
    };
}

integer_from!(i8, u8, i16, u16, i32, u32);
