//! Scalar comparison rules used by filter predicates.
//!
//! A small closed set of typed rules instead of runtime type inspection:
//! integers and floats compare numerically (exactly, through decimal
//! promotion), strings compare lexicographically, booleans and nulls
//! support equality only, and everything else is an explicit
//! incomparable-type error.

use std::cmp::Ordering;

use rust_decimal::{Decimal, prelude::FromPrimitive};

use crate::value::Value;

/// Errors raised when two values cannot be compared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompareError {
    /// The two kinds have no comparison rule (or no ordering rule, for
    /// bools and nulls under a relational operator).
    Incomparable {
        left: &'static str,
        right: &'static str,
    },

    /// A float operand was NaN.
    Unordered,
}

impl std::fmt::Display for CompareError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompareError::Incomparable { left, right } => {
                write!(f, "cannot compare {} with {}", left, right)
            }
            CompareError::Unordered => write!(f, "cannot compare NaN"),
        }
    }
}

impl std::error::Error for CompareError {}

/// `left < right`
pub fn less(left: &Value, right: &Value) -> Result<bool, CompareError> {
    Ok(order(left, right)? == Ordering::Less)
}

/// `left > right`
pub fn greater(left: &Value, right: &Value) -> Result<bool, CompareError> {
    Ok(order(left, right)? == Ordering::Greater)
}

/// `left <= right`
pub fn less_equal(left: &Value, right: &Value) -> Result<bool, CompareError> {
    Ok(order(left, right)? != Ordering::Greater)
}

/// `left >= right`
pub fn greater_equal(left: &Value, right: &Value) -> Result<bool, CompareError> {
    Ok(order(left, right)? != Ordering::Less)
}

/// `left == right`. Unlike the relational operators, equality is also
/// defined for booleans and nulls.
pub fn equal(left: &Value, right: &Value) -> Result<bool, CompareError> {
    match (left, right) {
        (Value::Null, Value::Null) => Ok(true),
        (Value::Bool(a), Value::Bool(b)) => Ok(a == b),
        _ => Ok(order(left, right)? == Ordering::Equal),
    }
}

/// `left != right`
pub fn not_equal(left: &Value, right: &Value) -> Result<bool, CompareError> {
    Ok(!equal(left, right)?)
}

fn order(left: &Value, right: &Value) -> Result<Ordering, CompareError> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
        (Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b).ok_or(CompareError::Unordered),
        (Value::Int(a), Value::Float(b)) => mixed_order(*a, *b),
        (Value::Float(a), Value::Int(b)) => Ok(mixed_order(*b, *a)?.reverse()),
        (a, b) => Err(CompareError::Incomparable {
            left: a.kind_name(),
            right: b.kind_name(),
        }),
    }
}

/// Orders an integer against a float without the precision loss of an
/// `as f64` cast; falls back to float comparison when the float has no
/// decimal representation.
fn mixed_order(int: i64, float: f64) -> Result<Ordering, CompareError> {
    if let (Some(a), Some(b)) = (Decimal::from_i64(int), Decimal::from_f64(float)) {
        return Ok(a.cmp(&b));
    }
    (int as f64)
        .partial_cmp(&float)
        .ok_or(CompareError::Unordered)
}

#[test]
fn mixed_numeric_comparison() {
    assert_eq!(less(&Value::Int(2), &Value::Float(2.5)), Ok(true));
    assert_eq!(equal(&Value::Int(2), &Value::Float(2.0)), Ok(true));
    assert_eq!(greater(&Value::Float(3.1), &Value::Int(3)), Ok(true));
}

#[test]
fn strings_order_lexicographically() {
    let a = Value::String("apple".to_string());
    let b = Value::String("banana".to_string());
    assert_eq!(less(&a, &b), Ok(true));
    assert_eq!(not_equal(&a, &b), Ok(true));
}

#[test]
fn incompatible_kinds_error() {
    let err = less(&Value::Bool(true), &Value::Bool(false)).unwrap_err();
    assert_eq!(
        err,
        CompareError::Incomparable {
            left: "bool",
            right: "bool",
        }
    );
    assert!(equal(&Value::String("1".to_string()), &Value::Int(1)).is_err());
}

#[test]
fn nan_is_unordered() {
    let err = less(&Value::Float(f64::NAN), &Value::Float(1.0)).unwrap_err();
    assert_eq!(err, CompareError::Unordered);
}
