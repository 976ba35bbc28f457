// src/value.rs

use std::fmt;

use crate::memory::{Heap, HeapObject, ObjRef};

/// Two numbers closer than this compare equal.
pub const NUMBER_EPSILON: f64 = 1e-10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    Obj(ObjRef),
}

impl Value {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the handle if this value is a heap string.
    pub fn as_string(&self, heap: &Heap) -> Option<ObjRef> {
        match self {
            Value::Obj(obj) => match heap.get(*obj) {
                HeapObject::String(_) => Some(*obj),
            },
            _ => None,
        }
    }

    /// Only `nil` and `false` are falsey.
    pub fn is_falsey(&self) -> bool {
        matches!(self, Value::Nil | Value::Bool(false))
    }

    /// Pairs the value with the heap it may point into, for printing.
    pub fn display<'h>(&self, heap: &'h Heap) -> ValueDisplay<'h> {
        ValueDisplay { value: *self, heap }
    }
}

/// Language-level equality: numbers within epsilon, strings by content.
pub fn values_equal(a: Value, b: Value, heap: &Heap) -> bool {
    match (a, b) {
        (Value::Nil, Value::Nil) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => (x - y).abs() <= NUMBER_EPSILON,
        (Value::Obj(x), Value::Obj(y)) => {
            let (HeapObject::String(x), HeapObject::String(y)) = (heap.get(x), heap.get(y));
            x.len() == y.len() && x.as_str() == y.as_str()
        }
        _ => false,
    }
}

pub struct ValueDisplay<'h> {
    value: Value,
    heap: &'h Heap,
}

impl fmt::Display for ValueDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => f.write_str(&format_number(n)),
            Value::Obj(obj) => match self.heap.get(obj) {
                HeapObject::String(s) => write!(f, "{}", s),
            },
        }
    }
}

/// Significant digits kept when printing a number.
const PRINT_PRECISION: i32 = 6;

/// Renders a number like C's `%g`: six significant digits, exponent form for very small or
/// large magnitudes, trailing zeros dropped.
fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "nan".to_string();
    }
    if n.is_infinite() {
        return if n < 0.0 { "-inf" } else { "inf" }.to_string();
    }

    // The exponent is taken after rounding, so 999999.5 switches to exponent form.
    let sci = format!("{:.*e}", (PRINT_PRECISION - 1) as usize, n);
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return sci;
    };
    let exp: i32 = exp.parse().unwrap_or(0);

    if exp < -4 || exp >= PRINT_PRECISION {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", strip_trailing_zeros(mantissa), sign, exp.abs())
    } else {
        let decimals = (PRINT_PRECISION - 1 - exp) as usize;
        strip_trailing_zeros(&format!("{:.*}", decimals, n)).to_string()
    }
}

fn strip_trailing_zeros(digits: &str) -> &str {
    if digits.contains('.') {
        digits.trim_end_matches('0').trim_end_matches('.')
    } else {
        digits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_equality_is_approximate() {
        let heap = Heap::new();
        assert!(values_equal(Value::Number(1.0), Value::Number(1.0 + 1e-12), &heap));
        assert!(!values_equal(Value::Number(1.0), Value::Number(1.001), &heap));
    }

    #[test]
    fn test_different_tags_never_equal() {
        let heap = Heap::new();
        assert!(!values_equal(Value::Number(1.0), Value::Bool(true), &heap));
        assert!(!values_equal(Value::Nil, Value::Bool(false), &heap));
        assert!(!values_equal(Value::Number(0.0), Value::Nil, &heap));
    }

    #[test]
    fn test_nil_and_bool_equality() {
        let heap = Heap::new();
        assert!(values_equal(Value::Nil, Value::Nil, &heap));
        assert!(values_equal(Value::Bool(true), Value::Bool(true), &heap));
        assert!(!values_equal(Value::Bool(true), Value::Bool(false), &heap));
    }

    #[test]
    fn test_strings_compare_by_content() {
        let mut heap = Heap::new();
        let a = heap.copy_string("abc");
        let b = heap.copy_string("abc");
        let c = heap.copy_string("abd");
        assert_ne!(a, b);
        assert!(values_equal(Value::Obj(a), Value::Obj(b), &heap));
        assert!(!values_equal(Value::Obj(a), Value::Obj(c), &heap));
    }

    #[test]
    fn test_truthiness() {
        let mut heap = Heap::new();
        let empty = heap.copy_string("");
        assert!(Value::Nil.is_falsey());
        assert!(Value::Bool(false).is_falsey());
        assert!(!Value::Bool(true).is_falsey());
        assert!(!Value::Number(0.0).is_falsey());
        assert!(!Value::Obj(empty).is_falsey());
    }

    #[test]
    fn test_display() {
        let mut heap = Heap::new();
        let s = heap.copy_string("hi there");
        assert_eq!(Value::Nil.display(&heap).to_string(), "nil");
        assert_eq!(Value::Bool(false).display(&heap).to_string(), "false");
        assert_eq!(Value::Number(7.0).display(&heap).to_string(), "7");
        assert_eq!(Value::Number(2.5).display(&heap).to_string(), "2.5");
        assert_eq!(Value::Obj(s).display(&heap).to_string(), "hi there");
    }

    #[test]
    fn test_numbers_print_with_six_significant_digits() {
        let cases = [
            (1.0 / 3.0, "0.333333"),
            (1e23, "1e+23"),
            (0.1 + 0.2, "0.3"),
            (f64::NAN, "nan"),
            (f64::INFINITY, "inf"),
            (f64::NEG_INFINITY, "-inf"),
            (0.0, "0"),
            (-0.0, "-0"),
            (100.0, "100"),
            (123456.0, "123456"),
            (1234567.0, "1.23457e+06"),
            (999999.5, "1e+06"),
            (0.0001, "0.0001"),
            (0.00001, "1e-05"),
            (-2.5e-7, "-2.5e-07"),
            (1e100, "1e+100"),
        ];
        for (n, expected) in cases {
            assert_eq!(format_number(n), expected, "formatting {}", n);
        }
    }
}
