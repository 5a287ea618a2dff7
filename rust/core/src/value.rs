// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Field values and identifier conversion
//!
//! Every token of a data line becomes a [`FieldValue`]. Conversion is
//! tolerant: integer literals win over float literals, which win over text.

use crate::lexer::{parse_number, Number};
use std::fmt;

/// Identifier within one namespace (always positive)
pub type EntityId = u64;

/// Decimal digits kept by [`FieldValue::normalized`]
pub const NORMALIZE_DIGITS: i32 = 6;

/// Relative tolerance under which two floats compare equal
pub const FLOAT_REL_TOLERANCE: f64 = 1e-5;

/// Typed value of a single field
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl FieldValue {
    /// Convert a raw token
    pub fn from_token(token: &str) -> Self {
        match parse_number(token) {
            Some(Number::Integer(i)) => FieldValue::Integer(i),
            Some(Number::Float(f)) => FieldValue::Float(f),
            None => FieldValue::Text(token.to_string()),
        }
    }

    /// Get as text
    #[inline]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Interpret as an identifier (see [`parse_identifier`])
    #[inline]
    pub fn as_identifier(&self) -> Option<EntityId> {
        match self {
            FieldValue::Integer(i) => u64::try_from(*i).ok().filter(|id| *id > 0),
            FieldValue::Float(f) => float_identifier(*f),
            FieldValue::Text(_) => None,
        }
    }

    /// Canonical form used for cross-file comparison: floats rounded to
    /// [`NORMALIZE_DIGITS`] decimals, text trimmed.
    pub fn normalized(&self) -> Self {
        match self {
            FieldValue::Integer(i) => FieldValue::Integer(*i),
            FieldValue::Float(f) => FieldValue::Float(round_to(*f, NORMALIZE_DIGITS)),
            FieldValue::Text(s) => FieldValue::Text(s.trim().to_string()),
        }
    }

    /// Equivalence used by the similarity score.
    ///
    /// Values are equal when they compare equal numerically (an integer and a
    /// float with the same value match), or when both are floats within
    /// [`FLOAT_REL_TOLERANCE`] of each other.
    pub fn matches(&self, other: &FieldValue) -> bool {
        match (self, other) {
            (FieldValue::Text(a), FieldValue::Text(b)) => a == b,
            (FieldValue::Integer(a), FieldValue::Integer(b)) => a == b,
            (FieldValue::Integer(i), FieldValue::Float(f))
            | (FieldValue::Float(f), FieldValue::Integer(i)) => *i as f64 == *f,
            (FieldValue::Float(a), FieldValue::Float(b)) => {
                a == b || is_close(*a, *b, FLOAT_REL_TOLERANCE)
            }
            _ => false,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Integer(i) => write!(f, "{}", i),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

/// Parse an identifier token.
///
/// Accepts positive integer literals. The single fallback: a float literal
/// with zero fractional part (`"12.0"`, `"1e3"`) is accepted as the integer it
/// denotes. Anything else is "no identifier".
pub fn parse_identifier(token: &str) -> Option<EntityId> {
    match parse_number(token.trim())? {
        Number::Integer(i) => u64::try_from(i).ok().filter(|id| *id > 0),
        Number::Float(f) => float_identifier(f),
    }
}

/// Parse a real-valued token (integers widen)
pub fn parse_real(token: &str) -> Option<f64> {
    match parse_number(token.trim())? {
        Number::Integer(i) => Some(i as f64),
        Number::Float(f) => Some(f),
    }
}

#[inline]
fn float_identifier(f: f64) -> Option<EntityId> {
    if f.is_finite() && f.fract() == 0.0 && f >= 1.0 && f <= u64::MAX as f64 {
        Some(f as u64)
    } else {
        None
    }
}

/// Round to a number of decimal digits.
///
/// Values too large to carry fractional digits are returned unchanged.
pub fn round_to(value: f64, digits: i32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let scale = 10f64.powi(digits);
    let scaled = value * scale;
    if !scaled.is_finite() || scaled.abs() >= 1e15 {
        return value;
    }
    scaled.round() / scale
}

/// Relative closeness: `|a - b| <= rel_tol * max(|a|, |b|)`
#[inline]
pub fn is_close(a: f64, b: f64, rel_tol: f64) -> bool {
    if a == b {
        return true;
    }
    if !a.is_finite() || !b.is_finite() {
        return false;
    }
    (a - b).abs() <= rel_tol * a.abs().max(b.abs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_from_token_typing() {
        assert_eq!(FieldValue::from_token("12"), FieldValue::Integer(12));
        assert_eq!(FieldValue::from_token("1.5"), FieldValue::Float(1.5));
        assert_eq!(
            FieldValue::from_token("MAT1"),
            FieldValue::Text("MAT1".to_string())
        );
    }

    #[test]
    fn test_parse_identifier() {
        assert_eq!(parse_identifier("17"), Some(17));
        assert_eq!(parse_identifier(" 17 "), Some(17));
        assert_eq!(parse_identifier("17.0"), Some(17));
        assert_eq!(parse_identifier("1e3"), Some(1000));
        assert_eq!(parse_identifier("17.5"), None);
        assert_eq!(parse_identifier("0"), None);
        assert_eq!(parse_identifier("-4"), None);
        assert_eq!(parse_identifier("mm"), None);
        assert_eq!(parse_identifier(""), None);
    }

    #[test]
    fn test_normalized_rounds_and_trims() {
        assert_eq!(
            FieldValue::Float(1.0000001).normalized(),
            FieldValue::Float(1.0)
        );
        assert_eq!(
            FieldValue::Text("  MAT1    ".to_string()).normalized(),
            FieldValue::Text("MAT1".to_string())
        );
    }

    #[test]
    fn test_matches_numeric_equality_across_types() {
        assert!(FieldValue::Integer(2).matches(&FieldValue::Float(2.0)));
        assert!(!FieldValue::Integer(2).matches(&FieldValue::Float(2.5)));
        assert!(!FieldValue::Integer(2).matches(&FieldValue::Text("2".into())));
    }

    #[test]
    fn test_matches_relative_tolerance() {
        assert!(FieldValue::Float(210000.0).matches(&FieldValue::Float(210001.0)));
        assert!(!FieldValue::Float(210000.0).matches(&FieldValue::Float(210010.0)));
        assert!(!FieldValue::Float(0.0).matches(&FieldValue::Float(1e-12)));
    }

    #[test]
    fn test_round_to_large_values_unchanged() {
        assert_eq!(round_to(1e300, 6), 1e300);
        assert_relative_eq!(round_to(2.1234567, 6), 2.123457);
    }
}
